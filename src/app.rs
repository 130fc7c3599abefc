//! Application bootstrap shared by the server binary and the CLI.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use goweli_catalog::{OpenLibraryClient, ScanOptions};
use goweli_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

use crate::modules::{
    self,
    books::{repository::BookRepository, service::Library},
};

/// A connected, migrated application with every module registered
pub struct App {
    settings: Settings,
    pool: SqlitePool,
    catalog: Arc<OpenLibraryClient>,
    registry: ModuleRegistry,
}

impl App {
    /// Connect the database, build the catalog client, register and
    /// initialize modules, then apply their migrations
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        tracing::info!(
            env = ?settings.environment,
            db = %settings.database.url,
            "goweli bootstrap starting"
        );

        let pool = goweli_db::connect(&settings.database)
            .await
            .context("failed to connect to the database")?;
        let catalog = Arc::new(
            OpenLibraryClient::new(&settings.catalog).context("failed to build catalog client")?,
        );

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &pool, catalog.clone());

        let ctx = InitCtx {
            settings: &settings,
            db: &pool,
        };
        registry.init_modules(&ctx).await?;

        let applied = goweli_db::migrate(&pool, &registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;

        tracing::info!(
            modules = registry.module_count(),
            migrations_applied = applied,
            "goweli bootstrap complete"
        );

        Ok(Self {
            settings,
            pool,
            catalog,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Library with cover resolution against the catalog
    pub fn library(&self) -> Library {
        Library::new(
            BookRepository::new(self.pool.clone()),
            self.catalog.clone(),
            ScanOptions::from(&self.settings.catalog),
        )
    }

    /// Start modules, serve HTTP until `shutdown` resolves, then stop modules
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.pool,
        };
        self.registry.start_modules(&ctx).await?;

        let served = goweli_http::start_server(&self.registry, &self.settings, shutdown).await;

        self.registry.stop_modules().await?;
        self.pool.close().await;
        served
    }
}
