pub mod books;
pub mod proxy;

use std::sync::Arc;

use goweli_catalog::OpenLibraryClient;
use goweli_kernel::ModuleRegistry;
use sqlx::SqlitePool;

use books::{repository::BookRepository, service::Library};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, pool: &SqlitePool, client: Arc<OpenLibraryClient>) {
    // The HTTP books API never runs a server-side cover scan
    let library = Library::without_catalog(BookRepository::new(pool.clone()));
    registry.register(books::create_module(library));
    registry.register(proxy::create_module(client));
}
