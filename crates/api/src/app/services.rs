use std::sync::Arc;

use anyhow::Context;

use storefront_infra::{
    CatalogService, DocumentStore, FsImageRemover, ImageRemover, InMemoryDocumentStore,
    PostgresDocumentStore,
};

use crate::config::AppConfig;

/// Backends the API can run on, with the catalog service wired over them.
#[derive(Clone)]
pub enum AppServices {
    InMemory {
        catalog: Arc<CatalogService>,
        store: Arc<InMemoryDocumentStore>,
    },
    Persistent {
        catalog: Arc<CatalogService>,
        store: Arc<PostgresDocumentStore>,
    },
}

impl AppServices {
    pub fn catalog(&self) -> &CatalogService {
        match self {
            AppServices::InMemory { catalog, .. } | AppServices::Persistent { catalog, .. } => {
                catalog
            }
        }
    }

    /// Short backend label for logs.
    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory { .. } => "in-memory",
            AppServices::Persistent { .. } => "postgres",
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(images: Arc<dyn ImageRemover>) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        let catalog = Arc::new(CatalogService::new(
            store.clone() as Arc<dyn DocumentStore>,
            images,
        ));
        AppServices::InMemory { catalog, store }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let images: Arc<dyn ImageRemover> = Arc::new(FsImageRemover::new(config.upload_dir.clone()));

    if !config.use_persistent_stores {
        tracing::info!(upload_dir = %config.upload_dir.display(), "using in-memory stores");
        return Ok(AppServices::in_memory(images));
    }

    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
    let store = Arc::new(
        PostgresDocumentStore::connect(url)
            .await
            .context("failed to connect to postgres")?,
    );
    tracing::info!(upload_dir = %config.upload_dir.display(), "using postgres stores");

    let catalog = Arc::new(CatalogService::new(
        store.clone() as Arc<dyn DocumentStore>,
        images,
    ));
    Ok(AppServices::Persistent { catalog, store })
}
