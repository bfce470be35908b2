//! # Parking Service
//!
//! Spot allocation and reservation lifecycle engine for parking lots.
//!
//! ## Architecture
//!
//! - **domain**: lots, spots, reservations, billing and repository ports
//! - **application**: allocation, lifecycle and capacity services, event bus
//! - **infrastructure**: SeaORM storage, in-memory storage, bearer tokens
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime bootstrap and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use application::{create_event_bus, EngineConfig, Event, EventBus, ParkingEngine, SharedEventBus};
pub use infrastructure::{init_database, DatabaseConfig, InMemoryStorage, SeaOrmRepositoryProvider};
pub use interfaces::http::create_api_router;
