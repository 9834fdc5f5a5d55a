//! Module trait for pluggable route groups.
//!
//! A module registers its routes on a [`Router`]. The resource API lives in
//! [`crate::routes::Api`]; embedders can add their own modules next to it.

use crate::router::Router;

/// A group of routes registered together.
pub trait Module: Send + Sync {
    /// Module name for identification and logging.
    fn name(&self) -> &'static str;

    /// Register routes with the router.
    fn routes(&self, router: &mut Router);
}
