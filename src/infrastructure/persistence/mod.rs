mod postgres_catalog;

pub use postgres_catalog::PostgresCatalog;
