//! Catalog use cases over a [`DocumentStore`].
//!
//! Handlers call one method per operation. Domain rules live in
//! `storefront-catalog`; this layer sequences store calls, populates
//! references and logs outcomes.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use storefront_catalog::{
    Category, Page, PageRequest, Product, ProductDraft, ProductFilter, ProductMutation,
    ProductSort, Review, Reviewer, SHOWCASE_LIMIT, check_rating,
};
use storefront_core::{CategoryId, DomainError, ProductId, UserId};
use storefront_sales::{QuarterlySales, TOP_SELLERS_LIMIT};

use crate::files::ImageRemover;
use crate::store::{DocumentStore, StoreError, UserSummary};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("store error: {0}")]
    Store(String),
}

impl From<DomainError> for CatalogError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => CatalogError::Validation(msg),
            DomainError::InvalidId(msg) => CatalogError::InvalidId(msg),
            DomainError::NotFound(what) => CatalogError::NotFound(what),
            DomainError::Conflict(msg) => CatalogError::Conflict(msg),
            DomainError::Unauthorized => CatalogError::Unauthorized,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(d) => d.into(),
            other => CatalogError::Store(other.to_string()),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// A product with its references resolved.
///
/// `review_users` runs parallel to `product.reviews()`; an entry is `None`
/// when the reviewer is unknown or users were not populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductView {
    pub product: Product,
    pub category: Option<Category>,
    pub review_users: Vec<Option<UserSummary>>,
}

/// What the client gets back after reviewing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReceipt {
    pub product_id: ProductId,
    pub review: Review,
}

/// One row of the top-sellers report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopSeller {
    pub product_id: ProductId,
    pub name: String,
    pub sales_data: Vec<QuarterlySales>,
    pub total_sales_overall: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Populate {
    CategoryOnly,
    CategoryAndUsers,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    images: Arc<dyn ImageRemover>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>, images: Arc<dyn ImageRemover>) -> Self {
        Self { store, images }
    }

    pub async fn create_product(&self, draft: ProductDraft) -> CatalogResult<Product> {
        let product = Product::create(ProductId::new(), draft, Utc::now())?;
        self.store.insert_product(product.clone()).await?;
        info!(product_id = %product.id_typed(), name = product.name(), "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductDraft) -> CatalogResult<Product> {
        let product = self
            .store
            .modify_product(id, ProductMutation::Patch { patch, at: Utc::now() })
            .await?;
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Delete a product and schedule removal of its image.
    pub async fn delete_product(&self, id: ProductId) -> CatalogResult<Product> {
        let product = self
            .store
            .delete_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product"))?;
        self.images.schedule_removal(product.image());
        info!(product_id = %id, "product deleted");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> CatalogResult<ProductView> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product"))?;
        let mut views = self.populate(vec![product], Populate::CategoryAndUsers).await?;
        views.pop().ok_or_else(|| DomainError::not_found("product").into())
    }

    pub async fn list_products(&self, request: PageRequest) -> CatalogResult<Page<ProductView>> {
        let count = self.store.count_products().await?;
        let products = self
            .store
            .list_products(request.skip(), request.limit())
            .await?;
        let items = self.populate(products, Populate::CategoryAndUsers).await?;
        Ok(Page::new(items, count, request))
    }

    /// Highest rated first, capped at [`SHOWCASE_LIMIT`].
    pub async fn top_products(&self) -> CatalogResult<Vec<ProductView>> {
        self.showcase(ProductSort::TopRated).await
    }

    /// Most recent first, capped at [`SHOWCASE_LIMIT`].
    pub async fn new_products(&self) -> CatalogResult<Vec<ProductView>> {
        self.showcase(ProductSort::Newest).await
    }

    async fn showcase(&self, sort: ProductSort) -> CatalogResult<Vec<ProductView>> {
        let products = self.store.sorted_products(sort, SHOWCASE_LIMIT).await?;
        self.populate(products, Populate::CategoryAndUsers).await
    }

    pub async fn filter_products(&self, filter: &ProductFilter) -> CatalogResult<Vec<ProductView>> {
        debug!(?filter, "filtering products");
        let products = self.store.find_products(filter).await?;
        self.populate(products, Populate::CategoryOnly).await
    }

    pub async fn products_by_category(&self, category: CategoryId) -> CatalogResult<Vec<Product>> {
        Ok(self.store.products_in_category(category).await?)
    }

    pub async fn brands_by_category(&self, categories: &[CategoryId]) -> CatalogResult<Vec<String>> {
        let brands = self.store.distinct_brands(categories).await?;
        if brands.is_empty() {
            return Err(CatalogError::NotFound("brands".to_string()));
        }
        Ok(brands)
    }

    /// Add a review on behalf of `reviewer`.
    ///
    /// The rating is checked before the product is looked up; the lookup,
    /// duplicate check and append run as one atomic store mutation. The
    /// reviewer is recorded first so a committed review always resolves.
    pub async fn add_review(
        &self,
        id: ProductId,
        reviewer: Reviewer,
        rating: i64,
        comment: String,
    ) -> CatalogResult<ReviewReceipt> {
        check_rating(rating)?;

        let user_id = reviewer.user_id;
        self.store
            .upsert_user(UserSummary {
                id: user_id,
                username: reviewer.name.clone(),
            })
            .await?;

        let product = self
            .store
            .modify_product(
                id,
                ProductMutation::AddReview {
                    reviewer,
                    rating,
                    comment,
                    at: Utc::now(),
                },
            )
            .await?;

        let review = product
            .reviews()
            .iter()
            .find(|r| r.user == user_id)
            .cloned()
            .ok_or_else(|| CatalogError::Store("review missing after write".to_string()))?;

        info!(
            product_id = %id,
            user_id = %user_id,
            rating = review.rating,
            num_reviews = product.num_reviews(),
            "review added"
        );
        Ok(ReviewReceipt {
            product_id: id,
            review,
        })
    }

    /// Best-selling products by units over paid orders, with per-quarter
    /// history. Names come from the catalog, falling back to the order line
    /// for products that no longer exist.
    pub async fn top_sellers(&self) -> CatalogResult<Vec<TopSeller>> {
        let ranked = self.store.top_sellers(TOP_SELLERS_LIMIT).await?;

        let mut sellers = Vec::with_capacity(ranked.len());
        for row in ranked {
            let name = match self.store.get_product(row.product_id).await? {
                Some(product) => product.name().to_string(),
                None => row.line_name,
            };
            sellers.push(TopSeller {
                product_id: row.product_id,
                name,
                sales_data: row.sales_data,
                total_sales_overall: row.total_sales_overall,
            });
        }
        Ok(sellers)
    }

    pub async fn create_category(&self, name: &str) -> CatalogResult<Category> {
        let category = Category::new(CategoryId::new(), name, Utc::now())?;
        self.store.insert_category(category.clone()).await?;
        info!(category_id = %category.id_typed(), name = category.name(), "category created");
        Ok(category)
    }

    pub async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    async fn populate(
        &self,
        products: Vec<Product>,
        populate: Populate,
    ) -> CatalogResult<Vec<ProductView>> {
        let category_ids: Vec<CategoryId> = products
            .iter()
            .map(|p| p.category())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let categories: HashMap<CategoryId, Category> = self
            .store
            .get_categories(&category_ids)
            .await?
            .into_iter()
            .map(|c| (c.id_typed(), c))
            .collect();

        let users: HashMap<UserId, UserSummary> = match populate {
            Populate::CategoryOnly => HashMap::new(),
            Populate::CategoryAndUsers => {
                let user_ids: Vec<UserId> = products
                    .iter()
                    .flat_map(|p| p.reviews().iter().map(|r| r.user))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if user_ids.is_empty() {
                    HashMap::new()
                } else {
                    self.store
                        .find_users(&user_ids)
                        .await?
                        .into_iter()
                        .map(|u| (u.id, u))
                        .collect()
                }
            }
        };

        Ok(products
            .into_iter()
            .map(|product| {
                let category = categories.get(&product.category()).cloned();
                let review_users = product
                    .reviews()
                    .iter()
                    .map(|r| users.get(&r.user).cloned())
                    .collect();
                ProductView {
                    product,
                    category,
                    review_users,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::TimeZone;
    use storefront_catalog::ProductField;
    use storefront_core::OrderId;
    use storefront_sales::{Order, OrderLine, ProductSales, Quarter};

    use crate::store::{
        CategoryStore, InMemoryDocumentStore, OrderStore, ProductStore, StoreResult, UserDirectory,
    };

    #[derive(Default)]
    struct RecordingRemover {
        removed: Mutex<Vec<String>>,
    }

    impl ImageRemover for RecordingRemover {
        fn schedule_removal(&self, image: &str) {
            self.removed.lock().unwrap().push(image.to_string());
        }
    }

    struct Fixture {
        service: CatalogService,
        store: Arc<InMemoryDocumentStore>,
        images: Arc<RecordingRemover>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDocumentStore::new());
        let images = Arc::new(RecordingRemover::default());
        let service = CatalogService::new(store.clone(), images.clone());
        Fixture {
            service,
            store,
            images,
        }
    }

    fn draft(category: CategoryId) -> ProductDraft {
        ProductDraft {
            name: Some("Air Max".to_string()),
            brand: Some("Nike".to_string()),
            category: Some(category.to_string()),
            price: Some(120.0),
            description: Some("Running shoe".to_string()),
            image: Some("uploads\\air-max.png".to_string()),
        }
    }

    fn reviewer(name: &str) -> Reviewer {
        Reviewer {
            user_id: UserId::new(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn create_returns_the_stored_product() {
        let f = fixture();
        let shoes = f.service.create_category("Shoes").await.unwrap();

        let product = f.service.create_product(draft(shoes.id_typed())).await.unwrap();
        assert_eq!(product.name(), "Air Max");
        assert_eq!(product.brand(), "Nike");
        assert_eq!(product.category(), shoes.id_typed());
        assert_eq!(product.price(), 120.0);
        assert_eq!(product.description(), "Running shoe");
        assert_eq!(product.image(), "uploads/air-max.png");
        assert_eq!(product.num_reviews(), 0);

        let view = f.service.get_product(product.id_typed()).await.unwrap();
        assert_eq!(view.product, product);
        assert_eq!(view.category, Some(shoes));
    }

    #[tokio::test]
    async fn create_names_the_first_missing_field() {
        let f = fixture();
        let mut d = draft(CategoryId::new());
        d.brand = Some("  ".to_string());
        d.price = Some(0.0);

        let err = f.service.create_product(d).await.unwrap_err();
        assert_eq!(err, CatalogError::from(DomainError::from(ProductField::Brand)));
        assert_eq!(f.store.count_products().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_changes_only_patched_fields() {
        let f = fixture();
        let created = f.service.create_product(draft(CategoryId::new())).await.unwrap();

        let updated = f
            .service
            .update_product(
                created.id_typed(),
                ProductDraft {
                    price: Some(99.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price(), 99.5);
        assert_eq!(updated.name(), created.name());
        assert_eq!(updated.image(), created.image());
        assert_eq!(updated.created_at(), created.created_at());
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_ids_are_not_found() {
        let f = fixture();
        let id = ProductId::new();

        let err = f.service.update_product(id, ProductDraft::default()).await.unwrap_err();
        assert_eq!(err, CatalogError::NotFound("product".to_string()));

        let err = f.service.delete_product(id).await.unwrap_err();
        assert_eq!(err, CatalogError::NotFound("product".to_string()));
        assert!(f.images.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_schedules_image_removal() {
        let f = fixture();
        let created = f.service.create_product(draft(CategoryId::new())).await.unwrap();

        f.service.delete_product(created.id_typed()).await.unwrap();
        assert_eq!(*f.images.removed.lock().unwrap(), vec!["uploads/air-max.png".to_string()]);
        assert!(f.store.get_product(created.id_typed()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reviews_update_rating_and_reject_duplicates() {
        let f = fixture();
        let id = f
            .service
            .create_product(draft(CategoryId::new()))
            .await
            .unwrap()
            .id_typed();

        let jane = reviewer("jane");
        let receipt = f
            .service
            .add_review(id, jane.clone(), 5, "great".to_string())
            .await
            .unwrap();
        assert_eq!(receipt.product_id, id);
        assert_eq!(receipt.review.name, "jane");
        assert_eq!(receipt.review.rating, 5);

        let view = f.service.get_product(id).await.unwrap();
        assert_eq!(view.product.rating(), 5.0);
        assert_eq!(view.product.num_reviews(), 1);
        assert_eq!(
            view.review_users,
            vec![Some(UserSummary {
                id: jane.user_id,
                username: "jane".to_string()
            })]
        );

        let err = f
            .service
            .add_review(id, jane, 1, String::new())
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::Conflict("product already reviewed".to_string()));
    }

    #[tokio::test]
    async fn ratings_five_three_four_average_to_four() {
        let f = fixture();
        let id = f
            .service
            .create_product(draft(CategoryId::new()))
            .await
            .unwrap()
            .id_typed();

        for (i, rating) in [5, 3, 4].into_iter().enumerate() {
            f.service
                .add_review(id, reviewer(&format!("u{i}")), rating, String::new())
                .await
                .unwrap();
        }

        let product = f.store.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.rating(), 4.0);
        assert_eq!(product.num_reviews(), 3);
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected_before_lookup() {
        let f = fixture();
        let err = f
            .service
            .add_review(ProductId::new(), reviewer("jane"), 6, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = f
            .service
            .add_review(ProductId::new(), reviewer("jane"), 3, String::new())
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::NotFound("product".to_string()));
    }

    #[tokio::test]
    async fn listing_pages_through_populated_products() {
        let f = fixture();
        let shoes = f.service.create_category("Shoes").await.unwrap();
        for _ in 0..25 {
            f.service.create_product(draft(shoes.id_typed())).await.unwrap();
        }

        let page = f.service.list_products(PageRequest::new(3, 10)).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.count, 25);
        assert_eq!(page.page, 3);
        assert_eq!(page.pages, 3);
        assert!(page.items.iter().all(|v| v.category.as_ref() == Some(&shoes)));
    }

    #[tokio::test]
    async fn filter_populates_category_but_not_users() {
        let f = fixture();
        let shoes = f.service.create_category("Shoes").await.unwrap();
        let id = f.service.create_product(draft(shoes.id_typed())).await.unwrap().id_typed();
        f.service.add_review(id, reviewer("jane"), 4, String::new()).await.unwrap();

        let mut cheap = draft(shoes.id_typed());
        cheap.brand = Some("Adidas".to_string());
        cheap.price = Some(40.0);
        f.service.create_product(cheap).await.unwrap();

        let filter = ProductFilter::from_query(None, Some("nike"), Some("150")).unwrap();
        let views = f.service.filter_products(&filter).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].category, Some(shoes));
        assert_eq!(views[0].review_users, vec![None]);
    }

    #[tokio::test]
    async fn brands_by_category_is_not_found_when_empty() {
        let f = fixture();
        let category = CategoryId::new();
        let err = f.service.brands_by_category(&[category]).await.unwrap_err();
        assert_eq!(err, CatalogError::NotFound("brands".to_string()));

        f.service.create_product(draft(category)).await.unwrap();
        assert_eq!(
            f.service.brands_by_category(&[category]).await.unwrap(),
            vec!["Nike".to_string()]
        );
    }

    #[tokio::test]
    async fn top_sellers_resolve_names_with_order_line_fallback() {
        let f = fixture();
        let live = f.service.create_product(draft(CategoryId::new())).await.unwrap();
        let gone = ProductId::new();

        let at = |month| Utc.with_ymd_and_hms(2024, month, 15, 0, 0, 0).unwrap();
        let line = |product, name: &str, quantity| OrderLine {
            product,
            name: name.to_string(),
            quantity,
            price: 10.0,
        };
        let orders = [
            (at(1), vec![line(live.id_typed(), "Old name", 6)]),
            (at(2), vec![line(live.id_typed(), "Old name", 4)]),
            (at(5), vec![line(live.id_typed(), "Old name", 5), line(gone, "Retired", 2)]),
        ];
        for (created, lines) in orders {
            let mut order = Order::place(OrderId::new(), UserId::new(), lines, created).unwrap();
            order.mark_paid(created).unwrap();
            f.store.insert_order(order).await.unwrap();
        }

        let sellers = f.service.top_sellers().await.unwrap();
        assert_eq!(sellers.len(), 2);
        assert_eq!(sellers[0].name, "Air Max");
        assert_eq!(sellers[0].total_sales_overall, 15);
        assert_eq!(
            sellers[0].sales_data,
            vec![
                QuarterlySales { quarter: Quarter::Q1, year: 2024, total_sales: 10 },
                QuarterlySales { quarter: Quarter::Q2, year: 2024, total_sales: 5 },
            ]
        );
        assert_eq!(sellers[1].name, "Retired");
    }

    #[tokio::test]
    async fn categories_are_unique_and_sorted() {
        let f = fixture();
        f.service.create_category("Shoes").await.unwrap();
        f.service.create_category("Bags").await.unwrap();

        let err = f.service.create_category(" shoes ").await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));

        let err = f.service.create_category("").await.unwrap_err();
        assert_eq!(err, CatalogError::Validation("name is required".to_string()));

        let names: Vec<String> = f
            .service
            .list_categories()
            .await
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["Bags", "Shoes"]);
    }

    /// Delegates to an in-memory store but cannot record users.
    struct UsersDown(InMemoryDocumentStore);

    #[async_trait::async_trait]
    impl ProductStore for UsersDown {
        async fn insert_product(&self, product: Product) -> StoreResult<()> {
            self.0.insert_product(product).await
        }
        async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
            self.0.get_product(id).await
        }
        async fn modify_product(
            &self,
            id: ProductId,
            mutation: ProductMutation,
        ) -> StoreResult<Product> {
            self.0.modify_product(id, mutation).await
        }
        async fn delete_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
            self.0.delete_product(id).await
        }
        async fn count_products(&self) -> StoreResult<u64> {
            self.0.count_products().await
        }
        async fn list_products(&self, skip: u64, limit: u32) -> StoreResult<Vec<Product>> {
            self.0.list_products(skip, limit).await
        }
        async fn find_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
            self.0.find_products(filter).await
        }
        async fn sorted_products(
            &self,
            sort: ProductSort,
            limit: usize,
        ) -> StoreResult<Vec<Product>> {
            self.0.sorted_products(sort, limit).await
        }
        async fn products_in_category(&self, category: CategoryId) -> StoreResult<Vec<Product>> {
            self.0.products_in_category(category).await
        }
        async fn distinct_brands(&self, categories: &[CategoryId]) -> StoreResult<Vec<String>> {
            self.0.distinct_brands(categories).await
        }
    }

    #[async_trait::async_trait]
    impl CategoryStore for UsersDown {
        async fn insert_category(&self, category: Category) -> StoreResult<()> {
            self.0.insert_category(category).await
        }
        async fn get_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<Category>> {
            self.0.get_categories(ids).await
        }
        async fn list_categories(&self) -> StoreResult<Vec<Category>> {
            self.0.list_categories().await
        }
    }

    #[async_trait::async_trait]
    impl UserDirectory for UsersDown {
        async fn upsert_user(&self, _user: UserSummary) -> StoreResult<()> {
            Err(StoreError::Backend("users table down".to_string()))
        }
        async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<UserSummary>> {
            self.0.find_users(ids).await
        }
    }

    #[async_trait::async_trait]
    impl OrderStore for UsersDown {
        async fn insert_order(&self, order: Order) -> StoreResult<()> {
            self.0.insert_order(order).await
        }
        async fn top_sellers(&self, limit: usize) -> StoreResult<Vec<ProductSales>> {
            self.0.top_sellers(limit).await
        }
    }

    #[tokio::test]
    async fn failed_user_record_leaves_no_review_behind() {
        let store = Arc::new(UsersDown(InMemoryDocumentStore::new()));
        let service = CatalogService::new(store.clone(), Arc::new(RecordingRemover::default()));
        let id = service
            .create_product(draft(CategoryId::new()))
            .await
            .unwrap()
            .id_typed();
        let jane = reviewer("jane");

        let err = service
            .add_review(id, jane.clone(), 5, "great".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store(_)));

        let product = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.num_reviews(), 0);
        assert!(!product.has_review_by(jane.user_id));
    }
}
