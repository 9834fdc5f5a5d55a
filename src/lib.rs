//! Taskgate - access control and generic CRUD dispatch for a multi-tenant
//! task service.
//!
//! - **Rights**: resolve what a principal may do by walking
//!   task → list → namespace, direct user grants, team grants and link shares
//! - **Contracts**: [`Crud`] and [`Rights`], implemented once per resource kind
//! - **Handler**: transport-agnostic dispatch that authorizes, then invokes
//! - **Bulk updates**: one payload over many tasks of the same list
//! - **Server**: hyper-based HTTP transport with the resource API mounted
//!
//! # Example
//!
//! ```ignore
//! use taskgate::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> taskgate::Result<()> {
//!     let config = ConfigLoader::new("TASKGATE").load(None, None, None, None, None)?;
//!     let server = taskgate::server::serve(config).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod crud;
pub mod db;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod module;
pub mod pagination;
pub mod patch;
pub mod permission;
pub mod principal;
pub mod response;
pub mod rights;
pub mod router;
pub mod routes;
pub mod server;
pub mod web;

// Re-export main types at crate root
pub use config::{Config, ConfigLoader};
pub use crud::{Crud, Listing, Rights, Session};
pub use db::Handle as DbHandle;
pub use error::{Error, Result};
pub use metrics::{Counters, Metrics};
pub use module::Module;
pub use pagination::Pagination;
pub use patch::Patch;
pub use permission::{Grant, Level, Right, SharingRight, level};
pub use principal::Principal;
pub use router::{Context, Router};
