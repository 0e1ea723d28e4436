//! Persistence layer for the keygate SSO broker.
//!
//! The broker only talks to storage through the traits in [`store`]:
//!
//! - [`ProviderStore`] - SSO provider configuration records
//! - [`AccountStore`] - local account lookup and the provisioning unit of work
//!
//! Two implementations ship with the crate: [`PgStore`] on PostgreSQL via
//! `sqlx`, and [`MemoryStore`] for single-node deployments and tests.

pub mod error;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod postgres;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use migrations::run_migrations;
pub use postgres::PgStore;
pub use store::{AccountStore, AccountTransaction, ProviderStore};
