use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use storefront_catalog::{Category, Product, ProductFilter, ProductMutation, ProductSort};
use storefront_core::{CategoryId, DomainError, ProductId, UserId, find_by_id};
use storefront_sales::{Order, ProductSales, quarterly_top_sellers};

use super::{
    CategoryStore, OrderStore, ProductStore, StoreError, StoreResult, UserDirectory, UserSummary,
};

#[derive(Debug, Default)]
struct Collections {
    products: Vec<Product>,
    categories: Vec<Category>,
    users: Vec<UserSummary>,
    orders: Vec<Order>,
}

/// In-memory document store for tests/dev.
///
/// Collections are insertion-ordered vectors behind one `RwLock`; a write
/// guard makes every mutation atomic.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProductStore for InMemoryDocumentStore {
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        let mut c = self.write()?;
        if find_by_id(&c.products, &product.id_typed()).is_some() {
            return Err(DomainError::conflict("product already exists").into());
        }
        c.products.push(product);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let c = self.read()?;
        Ok(find_by_id(&c.products, &id).map(|idx| c.products[idx].clone()))
    }

    async fn modify_product(
        &self,
        id: ProductId,
        mutation: ProductMutation,
    ) -> StoreResult<Product> {
        let mut c = self.write()?;
        let idx = find_by_id(&c.products, &id).ok_or_else(|| DomainError::not_found("product"))?;

        let mut next = c.products[idx].clone();
        mutation.apply(&mut next)?;
        c.products[idx] = next.clone();
        Ok(next)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let mut c = self.write()?;
        Ok(find_by_id(&c.products, &id).map(|idx| c.products.remove(idx)))
    }

    async fn count_products(&self) -> StoreResult<u64> {
        Ok(self.read()?.products.len() as u64)
    }

    async fn list_products(&self, skip: u64, limit: u32) -> StoreResult<Vec<Product>> {
        let c = self.read()?;
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        Ok(c.products
            .iter()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let c = self.read()?;
        Ok(c.products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn sorted_products(&self, sort: ProductSort, limit: usize) -> StoreResult<Vec<Product>> {
        let mut products = self.read()?.products.clone();
        products.sort_by(|a, b| sort.compare(a, b));
        products.truncate(limit);
        Ok(products)
    }

    async fn products_in_category(&self, category: CategoryId) -> StoreResult<Vec<Product>> {
        let c = self.read()?;
        Ok(c.products
            .iter()
            .filter(|p| p.category() == category)
            .cloned()
            .collect())
    }

    async fn distinct_brands(&self, categories: &[CategoryId]) -> StoreResult<Vec<String>> {
        let c = self.read()?;
        let brands: BTreeSet<&str> = c
            .products
            .iter()
            .filter(|p| categories.contains(&p.category()))
            .map(|p| p.brand())
            .collect();
        Ok(brands.into_iter().map(str::to_string).collect())
    }
}

#[async_trait]
impl CategoryStore for InMemoryDocumentStore {
    async fn insert_category(&self, category: Category) -> StoreResult<()> {
        let mut c = self.write()?;
        if c.categories.iter().any(|existing| existing.has_name(category.name())) {
            return Err(DomainError::conflict("category already exists").into());
        }
        c.categories.push(category);
        Ok(())
    }

    async fn get_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<Category>> {
        let c = self.read()?;
        Ok(c.categories
            .iter()
            .filter(|cat| ids.contains(&cat.id_typed()))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut categories = self.read()?.categories.clone();
        categories.sort_by(|a, b| {
            a.name()
                .to_lowercase()
                .cmp(&b.name().to_lowercase())
                .then_with(|| a.name().cmp(b.name()))
        });
        Ok(categories)
    }
}

#[async_trait]
impl UserDirectory for InMemoryDocumentStore {
    async fn upsert_user(&self, user: UserSummary) -> StoreResult<()> {
        let mut c = self.write()?;
        match c.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => existing.username = user.username,
            None => c.users.push(user),
        }
        Ok(())
    }

    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<UserSummary>> {
        let c = self.read()?;
        Ok(c.users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderStore for InMemoryDocumentStore {
    async fn insert_order(&self, order: Order) -> StoreResult<()> {
        let mut c = self.write()?;
        if find_by_id(&c.orders, &order.id_typed()).is_some() {
            return Err(DomainError::conflict("order already exists").into());
        }
        c.orders.push(order);
        Ok(())
    }

    async fn top_sellers(&self, limit: usize) -> StoreResult<Vec<ProductSales>> {
        let c = self.read()?;
        Ok(quarterly_top_sellers(&c.orders, limit))
    }
}
