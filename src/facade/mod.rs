pub mod database;
pub mod registry;

pub use database::InMemoryDB;
pub use registry::DatabaseRegistry;
