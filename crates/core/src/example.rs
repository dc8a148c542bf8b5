//! Training records.

use serde::{Deserialize, Serialize};

use crate::error::ExpcatError;
use crate::id::TenantId;

/// One line of an expenses snapshot, exactly as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub user: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
}

/// A labelled description belonging to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub tenant_id: TenantId,
    pub description: String,
    pub category: String,
}

impl TrainingExample {
    pub fn new(
        tenant_id: TenantId,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            description: description.into(),
            category: category.into(),
        }
    }
}

impl TryFrom<ExpenseRecord> for TrainingExample {
    type Error = ExpcatError;

    fn try_from(record: ExpenseRecord) -> Result<Self, Self::Error> {
        if record.category.trim().is_empty() {
            return Err(ExpcatError::invalid_input("expense record without category"));
        }
        Ok(Self {
            tenant_id: TenantId::new(record.user)?,
            description: record.description,
            category: record.category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_line() {
        let rec: ExpenseRecord = serde_json::from_str(
            r#"{"user":"t1","description":"pizza dinner","category":"food","amount":12.5}"#,
        )
        .unwrap();
        let ex = TrainingExample::try_from(rec).unwrap();
        assert_eq!(ex.tenant_id.as_str(), "t1");
        assert_eq!(ex.description, "pizza dinner");
        assert_eq!(ex.category, "food");
    }

    #[test]
    fn missing_description_defaults_to_empty() {
        let rec: ExpenseRecord =
            serde_json::from_str(r#"{"user":"t1","category":"food"}"#).unwrap();
        assert_eq!(rec.description, "");
    }

    #[test]
    fn rejects_blank_category_and_bad_tenant() {
        let rec = ExpenseRecord {
            user: "t1".into(),
            description: "x".into(),
            category: " ".into(),
        };
        assert!(TrainingExample::try_from(rec).is_err());

        let rec = ExpenseRecord {
            user: "".into(),
            description: "x".into(),
            category: "food".into(),
        };
        assert!(TrainingExample::try_from(rec).is_err());
    }
}
