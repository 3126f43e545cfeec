//! Service layer modules.
//!
//! Contains the Redis cache, the cache-first reference data loaders and the
//! catalog CSV codec.

pub mod cache;
pub mod catalog;
pub mod catalog_csv;

pub use cache::RedisCache;
