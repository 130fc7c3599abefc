//! Goweli application library: the books and proxy modules and the
//! bootstrap that wires them to the database and the catalog.

pub mod app;
pub mod modules;

pub use app::App;
