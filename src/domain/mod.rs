//! Domain types and DTOs
//!
//! Catalog entities (works, coefficients, room parameters) and the estimate
//! document with its request/response shapes.

pub mod coefficients;
pub mod estimates;
pub mod room_parameters;
pub mod works;

// Re-export commonly used types
pub use coefficients::*;
pub use estimates::*;
pub use room_parameters::*;
pub use works::*;

use serde::{Deserialize, Deserializer};

/// Deserialize a field that may be absent, `null` or set.
///
/// Use with `#[serde(default)]`: absent stays `None`, `null` becomes
/// `Some(None)` (clear the column).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
