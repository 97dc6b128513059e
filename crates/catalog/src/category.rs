use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity};

/// Product category. Referenced by products, never owned by them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    id: CategoryId,
    name: String,
    created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(id: CategoryId, name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Category names are unique ignoring case.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_required() {
        let c = Category::new(CategoryId::new(), "  Shoes ", Utc::now()).unwrap();
        assert_eq!(c.name(), "Shoes");

        let err = Category::new(CategoryId::new(), "   ", Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::Validation("name is required".to_string()));
    }

    #[test]
    fn name_comparison_ignores_case() {
        let c = Category::new(CategoryId::new(), "Shoes", Utc::now()).unwrap();
        assert!(c.has_name("shoes "));
        assert!(!c.has_name("shirts"));
    }

    #[test]
    fn name_comparison_folds_non_ascii_case() {
        let c = Category::new(CategoryId::new(), "Été", Utc::now()).unwrap();
        assert!(c.has_name("été"));
        assert!(c.has_name("ÉTÉ"));
    }
}
