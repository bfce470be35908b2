//! Infrastructure layer
//!
//! - `database`: SeaORM entities, migrations and repositories
//! - `storage`: in-memory repositories for tests and local runs
//! - `crypto`: bearer token verification

pub mod crypto;
pub mod database;
pub mod storage;

pub use database::repositories::SeaOrmRepositoryProvider;
pub use database::{init_database, DatabaseConfig};
pub use storage::InMemoryStorage;
