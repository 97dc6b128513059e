use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity, ProductId, UserId};

use crate::validation::{ProductField, validate};

/// Candidate product fields as supplied by a client.
///
/// Used as-is for creation (every field must be present) and as a partial
/// patch for updates (absent fields keep their stored value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl ProductDraft {
    /// Fill every absent field from `product`.
    pub fn merged_over(self, product: &Product) -> ProductDraft {
        ProductDraft {
            name: self.name.or_else(|| Some(product.name.clone())),
            brand: self.brand.or_else(|| Some(product.brand.clone())),
            category: self.category.or_else(|| Some(product.category.to_string())),
            price: self.price.or(Some(product.price)),
            description: self.description.or_else(|| Some(product.description.clone())),
            image: self.image.or_else(|| Some(product.image.clone())),
        }
    }
}

/// Fields of a draft that passed every rule.
struct CheckedFields {
    name: String,
    brand: String,
    category: CategoryId,
    price: f64,
    description: String,
    image: String,
}

impl TryFrom<ProductDraft> for CheckedFields {
    type Error = DomainError;

    fn try_from(draft: ProductDraft) -> DomainResult<Self> {
        validate(&draft).into_result()?;

        let category = required(draft.category, ProductField::Category)?
            .trim()
            .parse::<CategoryId>()?;
        let image = required(draft.image, ProductField::Image)?;

        Ok(Self {
            name: required(draft.name, ProductField::Name)?,
            brand: required(draft.brand, ProductField::Brand)?,
            category,
            price: draft.price.ok_or(ProductField::Price)?,
            description: required(draft.description, ProductField::Description)?,
            image: normalize_image_path(&image),
        })
    }
}

fn required(value: Option<String>, field: ProductField) -> DomainResult<String> {
    value.ok_or_else(|| field.into())
}

/// Stored image paths always use forward slashes.
pub fn normalize_image_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Authenticated identity writing a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewer {
    pub user_id: UserId,
    pub name: String,
}

/// Ratings are whole stars, 1 to 5.
pub fn check_rating(rating: i64) -> DomainResult<u8> {
    u8::try_from(rating)
        .ok()
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| DomainError::validation("rating must be between 1 and 5"))
}

/// A single review embedded in its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Reviewer display name at the time of writing.
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

/// Catalog product document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    brand: String,
    category: CategoryId,
    price: f64,
    description: String,
    image: String,
    reviews: Vec<Review>,
    rating: f64,
    num_reviews: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate a draft and build a new product with no reviews.
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let fields = CheckedFields::try_from(draft)?;
        Ok(Self {
            id,
            name: fields.name,
            brand: fields.brand,
            category: fields.category,
            price: fields.price,
            description: fields.description,
            image: fields.image,
            reviews: Vec::new(),
            rating: 0.0,
            num_reviews: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Mean of all review ratings (0 when unreviewed).
    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn num_reviews(&self) -> u32 {
        self.num_reviews
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn has_review_by(&self, user: UserId) -> bool {
        self.reviews.iter().any(|r| r.user == user)
    }

    /// Merge `patch` over the current fields, re-validate, and apply.
    ///
    /// Nothing changes when validation fails.
    pub fn apply_patch(&mut self, patch: ProductDraft, now: DateTime<Utc>) -> DomainResult<()> {
        let fields = CheckedFields::try_from(patch.merged_over(self))?;
        self.name = fields.name;
        self.brand = fields.brand;
        self.category = fields.category;
        self.price = fields.price;
        self.description = fields.description;
        self.image = fields.image;
        self.updated_at = now;
        Ok(())
    }

    /// Append a review and recompute the derived rating and count.
    pub fn add_review(
        &mut self,
        reviewer: &Reviewer,
        rating: i64,
        comment: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Review> {
        let rating = check_rating(rating)?;

        if self.has_review_by(reviewer.user_id) {
            return Err(DomainError::conflict("product already reviewed"));
        }

        let review = Review {
            name: reviewer.name.clone(),
            rating,
            comment,
            user: reviewer.user_id,
            created_at: now,
        };
        self.reviews.push(review.clone());
        self.recompute_rating();
        self.updated_at = now;
        Ok(review)
    }

    fn recompute_rating(&mut self) {
        self.num_reviews = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(total) / f64::from(self.num_reviews)
        };
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A change a store applies to one product under its per-document lock.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductMutation {
    Patch {
        patch: ProductDraft,
        at: DateTime<Utc>,
    },
    AddReview {
        reviewer: Reviewer,
        rating: i64,
        comment: String,
        at: DateTime<Utc>,
    },
}

impl ProductMutation {
    pub fn apply(self, product: &mut Product) -> DomainResult<()> {
        match self {
            ProductMutation::Patch { patch, at } => product.apply_patch(patch, at),
            ProductMutation::AddReview {
                reviewer,
                rating,
                comment,
                at,
            } => product.add_review(&reviewer, rating, comment, at).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn draft(category: CategoryId) -> ProductDraft {
        ProductDraft {
            name: Some("Air Zoom".to_string()),
            brand: Some("Nike".to_string()),
            category: Some(category.to_string()),
            price: Some(120.0),
            description: Some("Running shoe".to_string()),
            image: Some("uploads\\air-zoom.png".to_string()),
        }
    }

    fn reviewer(name: &str) -> Reviewer {
        Reviewer {
            user_id: UserId::new(),
            name: name.to_string(),
        }
    }

    fn created() -> Product {
        Product::create(ProductId::new(), draft(CategoryId::new()), test_time()).unwrap()
    }

    #[test]
    fn create_keeps_input_fields() {
        let category = CategoryId::new();
        let id = ProductId::new();
        let product = Product::create(id, draft(category), test_time()).unwrap();

        assert_eq!(product.id_typed(), id);
        assert_eq!(product.name(), "Air Zoom");
        assert_eq!(product.brand(), "Nike");
        assert_eq!(product.category(), category);
        assert_eq!(product.price(), 120.0);
        assert_eq!(product.description(), "Running shoe");
        assert_eq!(product.image(), "uploads/air-zoom.png");
        assert_eq!(product.num_reviews(), 0);
        assert_eq!(product.rating(), 0.0);
    }

    #[test]
    fn create_rejects_blank_name() {
        let mut d = draft(CategoryId::new());
        d.name = Some("  ".to_string());

        let err = Product::create(ProductId::new(), d, test_time()).unwrap_err();
        assert_eq!(err, DomainError::Validation("name is required".to_string()));
    }

    #[test]
    fn create_rejects_unparsable_category() {
        let mut d = draft(CategoryId::new());
        d.category = Some("shoes".to_string());

        let err = Product::create(ProductId::new(), d, test_time()).unwrap_err();
        match err {
            DomainError::InvalidId(_) => {}
            other => panic!("Expected InvalidId, got {other:?}"),
        }
    }

    #[test]
    fn patch_changes_only_patched_fields() {
        let mut product = created();
        let before = product.clone();

        let patch = ProductDraft {
            price: Some(99.5),
            ..ProductDraft::default()
        };
        product.apply_patch(patch, test_time()).unwrap();

        assert_eq!(product.price(), 99.5);
        assert_eq!(product.name(), before.name());
        assert_eq!(product.brand(), before.brand());
        assert_eq!(product.category(), before.category());
        assert_eq!(product.description(), before.description());
        assert_eq!(product.image(), before.image());
        assert_eq!(product.created_at(), before.created_at());
    }

    #[test]
    fn invalid_patch_leaves_product_untouched() {
        let mut product = created();
        let before = product.clone();

        let patch = ProductDraft {
            name: Some("Renamed".to_string()),
            price: Some(0.0),
            ..ProductDraft::default()
        };
        let err = product.apply_patch(patch, test_time()).unwrap_err();

        assert_eq!(err, DomainError::from(ProductField::Price));
        assert_eq!(product, before);
    }

    #[test]
    fn first_review_sets_rating_and_count() {
        let mut product = created();
        let review = product
            .add_review(&reviewer("ana"), 4, "solid".to_string(), test_time())
            .unwrap();

        assert_eq!(review.rating, 4);
        assert_eq!(review.name, "ana");
        assert_eq!(product.num_reviews(), 1);
        assert_eq!(product.rating(), 4.0);
    }

    #[test]
    fn rating_is_mean_of_reviews() {
        let mut product = created();
        for (name, rating) in [("a", 5), ("b", 3), ("c", 4)] {
            product
                .add_review(&reviewer(name), rating, String::new(), test_time())
                .unwrap();
        }

        assert_eq!(product.num_reviews(), 3);
        assert_eq!(product.rating(), 4.0);
    }

    #[test]
    fn second_review_by_same_user_conflicts() {
        let mut product = created();
        let who = reviewer("ana");
        product.add_review(&who, 5, "great".to_string(), test_time()).unwrap();

        let err = product
            .add_review(&who, 1, "changed my mind".to_string(), test_time())
            .unwrap_err();
        assert_eq!(err, DomainError::Conflict("product already reviewed".to_string()));
        assert_eq!(product.num_reviews(), 1);
        assert_eq!(product.rating(), 5.0);
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let mut product = created();
        for rating in [0, 6, -1, 300] {
            let err = product
                .add_review(&reviewer("x"), rating, String::new(), test_time())
                .unwrap_err();
            match err {
                DomainError::Validation(_) => {}
                other => panic!("Expected Validation error, got {other:?}"),
            }
        }
        assert!(product.reviews().is_empty());
    }

    #[test]
    fn mutation_apply_dispatches_to_product() {
        let mut product = created();
        let mutation = ProductMutation::AddReview {
            reviewer: reviewer("ana"),
            rating: 2,
            comment: "meh".to_string(),
            at: test_time(),
        };
        mutation.apply(&mut product).unwrap();
        assert_eq!(product.rating(), 2.0);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: rating always equals the arithmetic mean of review ratings.
            #[test]
            fn rating_tracks_mean(ratings in proptest::collection::vec(1i64..=5, 1..40)) {
                let mut product = created();
                for (i, r) in ratings.iter().enumerate() {
                    product
                        .add_review(&reviewer(&format!("user-{i}")), *r, String::new(), Utc::now())
                        .unwrap();
                }

                let expected = ratings.iter().sum::<i64>() as f64 / ratings.len() as f64;
                prop_assert!((product.rating() - expected).abs() < 1e-9);
                prop_assert_eq!(product.num_reviews() as usize, ratings.len());
                prop_assert!(product.rating() >= 1.0 && product.rating() <= 5.0);
            }

            /// Property: any non-positive price is rejected, any positive one accepted.
            #[test]
            fn price_must_be_positive(price in -1000.0f64..1000.0) {
                let mut d = draft(CategoryId::new());
                d.price = Some(price);
                let result = Product::create(ProductId::new(), d, Utc::now());
                prop_assert_eq!(result.is_ok(), price > 0.0);
            }
        }
    }
}
