//! Ordered product validation rules.
//!
//! Each rule names the field it guards. Rules run in declaration order and
//! the first one that does not hold decides the outcome.

use storefront_core::{DomainError, DomainResult};

use crate::product::ProductDraft;

/// Field of a product candidate that a rule guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Name,
    Brand,
    Category,
    Price,
    Description,
    Image,
}

impl ProductField {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductField::Name => "name",
            ProductField::Brand => "brand",
            ProductField::Category => "category",
            ProductField::Price => "price",
            ProductField::Description => "description",
            ProductField::Image => "image",
        }
    }

    /// Client-facing message for a failed rule.
    pub fn requirement(self) -> &'static str {
        match self {
            ProductField::Name => "name is required",
            ProductField::Brand => "brand is required",
            ProductField::Category => "category is required",
            ProductField::Price => "price is required and must be positive",
            ProductField::Description => "description is required",
            ProductField::Image => "image is required",
        }
    }
}

impl core::fmt::Display for ProductField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ProductField> for DomainError {
    fn from(field: ProductField) -> Self {
        DomainError::validation(field.requirement())
    }
}

/// Outcome of running the rule list against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(ProductField),
}

impl Validation {
    pub fn is_valid(self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn into_result(self) -> DomainResult<()> {
        match self {
            Validation::Valid => Ok(()),
            Validation::Invalid(field) => Err(field.into()),
        }
    }
}

struct Rule {
    field: ProductField,
    holds: fn(&ProductDraft) -> bool,
}

const RULES: &[Rule] = &[
    Rule { field: ProductField::Name, holds: has_name },
    Rule { field: ProductField::Brand, holds: has_brand },
    Rule { field: ProductField::Category, holds: has_category },
    Rule { field: ProductField::Price, holds: has_positive_price },
    Rule { field: ProductField::Description, holds: has_description },
    Rule { field: ProductField::Image, holds: has_image },
];

/// Run every rule in order; the first failing field wins.
pub fn validate(draft: &ProductDraft) -> Validation {
    RULES
        .iter()
        .find(|rule| !(rule.holds)(draft))
        .map_or(Validation::Valid, |rule| Validation::Invalid(rule.field))
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn has_name(d: &ProductDraft) -> bool {
    filled(&d.name)
}

fn has_brand(d: &ProductDraft) -> bool {
    filled(&d.brand)
}

fn has_category(d: &ProductDraft) -> bool {
    filled(&d.category)
}

fn has_positive_price(d: &ProductDraft) -> bool {
    d.price.is_some_and(|p| p.is_finite() && p > 0.0)
}

fn has_description(d: &ProductDraft) -> bool {
    filled(&d.description)
}

fn has_image(d: &ProductDraft) -> bool {
    filled(&d.image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ProductDraft {
        ProductDraft {
            name: Some("Air Zoom".to_string()),
            brand: Some("Nike".to_string()),
            category: Some("0190a5a8-3f5e-7c4e-9a51-0f8c0c6f0a11".to_string()),
            price: Some(120.0),
            description: Some("Running shoe".to_string()),
            image: Some("uploads/air-zoom.png".to_string()),
        }
    }

    #[test]
    fn complete_draft_is_valid() {
        assert_eq!(validate(&complete()), Validation::Valid);
    }

    #[test]
    fn each_blank_field_is_named() {
        let cases: [(fn(&mut ProductDraft), ProductField); 6] = [
            (|d| d.name = Some("   ".into()), ProductField::Name),
            (|d| d.brand = None, ProductField::Brand),
            (|d| d.category = Some(String::new()), ProductField::Category),
            (|d| d.price = Some(0.0), ProductField::Price),
            (|d| d.description = Some("\t".into()), ProductField::Description),
            (|d| d.image = None, ProductField::Image),
        ];

        for (blank, field) in cases {
            let mut draft = complete();
            blank(&mut draft);
            assert_eq!(validate(&draft), Validation::Invalid(field));
        }
    }

    #[test]
    fn first_failing_rule_wins() {
        let draft = ProductDraft {
            brand: Some("Nike".into()),
            ..ProductDraft::default()
        };
        assert_eq!(validate(&draft), Validation::Invalid(ProductField::Name));

        let draft = ProductDraft {
            price: Some(-3.0),
            image: None,
            ..complete()
        };
        assert_eq!(validate(&draft), Validation::Invalid(ProductField::Price));
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let draft = ProductDraft {
            price: Some(f64::NAN),
            ..complete()
        };
        assert_eq!(validate(&draft), Validation::Invalid(ProductField::Price));
    }

    #[test]
    fn invalid_maps_to_validation_error() {
        let err = Validation::Invalid(ProductField::Price).into_result().unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation("price is required and must be positive".to_string())
        );
    }
}
