//! Work catalog domain types
//!
//! Catalog entries that estimate line items are priced from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Work catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub base_price: f64,
    /// Room parameter whose value drives the quantity of linked line items
    pub parameter_id: Option<Uuid>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkRequest {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub base_price: f64,
    #[serde(default)]
    pub parameter_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Request DTO for updating a catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWorkRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub base_price: Option<f64>,
    /// `null` unlinks the parameter
    #[serde(default, deserialize_with = "super::nullable")]
    pub parameter_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Query filters for listing the catalog
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub active_only: Option<bool>,
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl CreateWorkRequest {
    /// Client-side rules the catalog form enforces: required text fields and a
    /// non-negative price.
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required");
        }
        if self.category.trim().is_empty() {
            problems.push("category is required");
        }
        if self.unit.trim().is_empty() {
            problems.push("unit is required");
        }
        if !self.base_price.is_finite() || self.base_price < 0.0 {
            problems.push("base_price must be a non-negative number");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

impl UpdateWorkRequest {
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let mut problems = Vec::new();
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());

        if blank(&self.name) {
            problems.push("name must not be empty");
        }
        if blank(&self.category) {
            problems.push("category must not be empty");
        }
        if blank(&self.unit) {
            problems.push("unit must not be empty");
        }
        if let Some(price) = self.base_price {
            if !price.is_finite() || price < 0.0 {
                problems.push("base_price must be a non-negative number");
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, price: f64) -> CreateWorkRequest {
        CreateWorkRequest {
            name: name.to_string(),
            category: "Демонтажные работы (Пол)".to_string(),
            unit: "м²".to_string(),
            base_price: price,
            parameter_id: None,
            description: None,
            is_active: true,
        }
    }

    #[test]
    fn create_request_requires_fields_and_price() {
        assert!(request("Снятие стяжки", 350.0).validate().is_ok());

        let problems = request("  ", -1.0).validate().unwrap_err();
        assert_eq!(
            problems,
            vec!["name is required", "base_price must be a non-negative number"]
        );
    }

    #[test]
    fn create_request_defaults_to_active() {
        let req: CreateWorkRequest = serde_json::from_value(serde_json::json!({
            "name": "Грунтовка стен",
            "category": "Черновые работы (Стены)",
            "unit": "м²",
            "base_price": 90
        }))
        .unwrap();
        assert!(req.is_active);
        assert!(req.parameter_id.is_none());
    }

    #[test]
    fn update_request_rejects_blank_unit() {
        let req = UpdateWorkRequest {
            name: None,
            category: None,
            unit: Some(String::new()),
            base_price: Some(f64::NAN),
            parameter_id: None,
            description: None,
            is_active: None,
        };
        assert_eq!(
            req.validate().unwrap_err(),
            vec!["unit must not be empty", "base_price must be a non-negative number"]
        );
    }

    #[test]
    fn update_request_tells_null_from_absent() {
        let req: UpdateWorkRequest = serde_json::from_value(serde_json::json!({
            "parameter_id": null,
            "description": null
        }))
        .unwrap();
        assert_eq!(req.parameter_id, Some(None));
        assert_eq!(req.description, Some(None));

        let req: UpdateWorkRequest =
            serde_json::from_value(serde_json::json!({ "name": "Стяжка пола" })).unwrap();
        assert_eq!(req.parameter_id, None);
        assert_eq!(req.description, None);

        let id = Uuid::new_v4();
        let req: UpdateWorkRequest =
            serde_json::from_value(serde_json::json!({ "parameter_id": id })).unwrap();
        assert_eq!(req.parameter_id, Some(Some(id)));
    }
}
