//! Capability contracts every resource kind implements.
//!
//! [`Crud`] carries the five data operations and [`Rights`] the matching
//! authorization checks. Both take a [`Session`] (the persistence connection
//! for this request plus the injected metrics sink) and the acting
//! [`Principal`]. Kinds that do not offer a verb keep the default method,
//! which fails with [`Error::Unsupported`].
//!
//! The generic dispatcher in [`crate::handler`] is the only caller that pairs
//! the two: it asks `Rights` first and only then runs `Crud`.

use std::future::Future;

use libsql::Connection;
use serde::Serialize;

use crate::metrics::Metrics;
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::{Error, Result};

/// Persistence session handed to contract methods for one request.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub conn: &'a Connection,
    pub metrics: &'a dyn Metrics,
}

impl<'a> Session<'a> {
    pub fn new(conn: &'a Connection, metrics: &'a dyn Metrics) -> Self {
        Self { conn, metrics }
    }
}

/// One page of a read-all result.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Number of items matching the search across all pages.
    pub total: i64,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    pub fn result_count(&self) -> usize {
        self.items.len()
    }
}

/// Data operations of a resource kind.
pub trait Crud: Send + Sync {
    /// Name used in errors and logs.
    const KIND: &'static str;

    /// Element type returned by [`Crud::read_all`].
    type Item: Serialize + Send;

    /// Validate, stamp ownership and timestamps, persist, bootstrap.
    fn create(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<()>> + Send {
        let _ = (s, p);
        async { Err(Error::Unsupported { resource: Self::KIND, action: "create" }) }
    }

    /// Load by identity into `self`, including derived fields.
    fn read_one(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<()>> + Send {
        let _ = (s, p);
        async { Err(Error::Unsupported { resource: Self::KIND, action: "read" }) }
    }

    /// Everything `p` may see, filtered by `search`, one page at a time.
    fn read_all(
        &self,
        s: &Session<'_>,
        p: &Principal,
        search: &str,
        page: Pagination,
    ) -> impl Future<Output = Result<Listing<Self::Item>>> + Send {
        let _ = (s, p, search, page);
        async { Err(Error::Unsupported { resource: Self::KIND, action: "list" }) }
    }

    /// Persist the changes carried by `self` onto the stored entity.
    fn update(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<()>> + Send {
        let _ = (s, p);
        async { Err(Error::Unsupported { resource: Self::KIND, action: "update" }) }
    }

    /// Remove the entity and every row referencing it, atomically.
    fn delete(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<()>> + Send {
        let _ = (s, p);
        async { Err(Error::Unsupported { resource: Self::KIND, action: "delete" }) }
    }
}

/// Authorization checks of a resource kind.
///
/// Checks may load the entity (and fail with `NotFound` when it is missing).
/// They take `&mut self` so a kind can keep what it loaded for the operation
/// that follows.
pub trait Rights: Send + Sync {
    fn can_create(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<bool>> + Send {
        let _ = (s, p);
        async { Ok(false) }
    }

    /// Whether `p` may read, and the maximal right `p` holds.
    fn can_read(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<(bool, Right)>> + Send {
        let _ = (s, p);
        async { Ok((false, Right::None)) }
    }

    fn can_update(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<bool>> + Send {
        let _ = (s, p);
        async { Ok(false) }
    }

    fn can_delete(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<bool>> + Send {
        let _ = (s, p);
        async { Ok(false) }
    }

    /// Whether `p` holds admin rights on this resource.
    fn is_admin(
        &mut self,
        s: &Session<'_>,
        p: &Principal,
    ) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let (_, right) = self.can_read(s, p).await?;
            Ok(right == Right::Admin)
        }
    }
}
