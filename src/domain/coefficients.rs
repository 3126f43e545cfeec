//! Coefficient domain types
//!
//! Multipliers applied to estimate prices, and the per-estimate settings that
//! decide which blocks each selected coefficient reaches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a coefficient is applied in the first (normal) or second (final) pass
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoefficientKind {
    #[default]
    Normal,
    Final,
}

impl CoefficientKind {
    /// Anything that is not "final" is treated as normal.
    pub fn parse(s: &str) -> Self {
        match s {
            "final" => Self::Final,
            _ => Self::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Final => "final",
        }
    }
}

/// Coefficient entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coefficient {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: CoefficientKind,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a coefficient
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCoefficientRequest {
    pub name: String,
    pub value: f64,
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: CoefficientKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Request DTO for updating a coefficient
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCoefficientRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<CoefficientKind>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Coefficients of one category, as offered for selection in the editor
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoefficientGroup {
    pub category: String,
    pub coefficients: Vec<Coefficient>,
}

/// Which part of an estimate a selected coefficient applies to.
///
/// Serialized as the string `"global"` or as an array of block ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTarget", into = "RawTarget")]
pub enum CoefficientTarget {
    Global,
    Blocks(Vec<String>),
}

impl Default for CoefficientTarget {
    fn default() -> Self {
        Self::Global
    }
}

impl CoefficientTarget {
    pub fn applies_to(&self, block_id: Option<&str>) -> bool {
        match (self, block_id) {
            (Self::Global, _) => true,
            (Self::Blocks(ids), Some(block_id)) => ids.iter().any(|id| id == block_id),
            (Self::Blocks(_), None) => false,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Tag(String),
    Blocks(Vec<String>),
}

impl TryFrom<RawTarget> for CoefficientTarget {
    type Error = String;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        match raw {
            RawTarget::Tag(tag) if tag == "global" => Ok(Self::Global),
            RawTarget::Tag(other) => Err(format!(
                "coefficient target must be \"global\" or a list of block ids, got \"{}\"",
                other
            )),
            RawTarget::Blocks(ids) => Ok(Self::Blocks(ids)),
        }
    }
}

impl From<CoefficientTarget> for RawTarget {
    fn from(target: CoefficientTarget) -> Self {
        match target {
            CoefficientTarget::Global => RawTarget::Tag("global".to_string()),
            CoefficientTarget::Blocks(ids) => RawTarget::Blocks(ids),
        }
    }
}

/// Per-estimate mapping of coefficient id to its target
pub type CoefficientSettings = HashMap<String, CoefficientTarget>;

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_accepts_global_or_block_list() {
        let settings: CoefficientSettings = serde_json::from_value(json!({
            "c1": "global",
            "c2": ["block_1", "block_2"]
        }))
        .unwrap();

        assert_eq!(settings["c1"], CoefficientTarget::Global);
        assert_eq!(
            settings["c2"],
            CoefficientTarget::Blocks(vec!["block_1".into(), "block_2".into()])
        );
    }

    #[test]
    fn target_rejects_unknown_tag() {
        let err = serde_json::from_value::<CoefficientTarget>(json!("everywhere"));
        assert!(err.is_err());
    }

    #[test]
    fn target_serializes_back_to_wire_form() {
        assert_eq!(
            serde_json::to_value(CoefficientTarget::Global).unwrap(),
            json!("global")
        );
        assert_eq!(
            serde_json::to_value(CoefficientTarget::Blocks(vec!["b".into()])).unwrap(),
            json!(["b"])
        );
    }

    #[test]
    fn block_target_needs_a_block() {
        let target = CoefficientTarget::Blocks(vec!["b1".into()]);
        assert!(target.applies_to(Some("b1")));
        assert!(!target.applies_to(Some("b2")));
        assert!(!target.applies_to(None));
        assert!(CoefficientTarget::Global.applies_to(None));
    }

    #[test]
    fn kind_defaults_to_normal() {
        let req: CreateCoefficientRequest = serde_json::from_value(json!({
            "name": "Сложность",
            "value": 1.1,
            "category": "Условия"
        }))
        .unwrap();
        assert_eq!(req.kind, CoefficientKind::Normal);
        assert_eq!(CoefficientKind::parse("whatever"), CoefficientKind::Normal);
        assert_eq!(CoefficientKind::parse("final"), CoefficientKind::Final);
    }

    #[test]
    fn update_can_clear_description() {
        let req: UpdateCoefficientRequest =
            serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(req.description, Some(None));

        let req: UpdateCoefficientRequest = serde_json::from_value(json!({ "value": 1.3 })).unwrap();
        assert_eq!(req.description, None);
    }
}
