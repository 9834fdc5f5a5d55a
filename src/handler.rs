//! Generic dispatcher.
//!
//! One function per verb, the same for every resource kind. Each asks the
//! kind's [`Rights`] contract whether the principal may act, then runs the
//! matching [`Crud`] operation. Errors from either side pass through
//! unchanged; mapping them to a transport status is [`crate::Error`]'s job.

use serde::Serialize;

use crate::crud::{Crud, Rights, Session};
use crate::pagination::Pagination;
use crate::permission::Right;
use crate::principal::Principal;
use crate::{Error, Result};

/// Result of a paginated read, with the metadata kept apart from the items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: i64,
    pub result_count: usize,
}

/// Authorize and create `obj`.
pub async fn create<T: Crud + Rights>(s: &Session<'_>, p: &Principal, mut obj: T) -> Result<T> {
    if !obj.can_create(s, p).await? {
        return Err(Error::forbidden(T::KIND, "create"));
    }
    obj.create(s, p).await?;
    tracing::debug!(kind = T::KIND, principal = p.id(), "created");
    Ok(obj)
}

/// Authorize and load `obj`. Also returns the principal's maximal right.
pub async fn read_one<T: Crud + Rights>(
    s: &Session<'_>,
    p: &Principal,
    mut obj: T,
) -> Result<(T, Right)> {
    let (allowed, max_right) = obj.can_read(s, p).await?;
    if !allowed {
        return Err(Error::forbidden(T::KIND, "read"));
    }
    obj.read_one(s, p).await?;
    Ok((obj, max_right))
}

/// List what `p` may see. Filtering happens inside the kind's `read_all`.
pub async fn read_all<T: Crud>(
    s: &Session<'_>,
    p: &Principal,
    obj: &T,
    search: &str,
    pagination: Pagination,
) -> Result<Page<T::Item>> {
    let listing = obj.read_all(s, p, search, pagination).await?;
    let result_count = listing.result_count();
    Ok(Page {
        total_pages: pagination.total_pages(listing.total, result_count),
        result_count,
        items: listing.items,
    })
}

/// Authorize and update `obj`.
pub async fn update<T: Crud + Rights>(s: &Session<'_>, p: &Principal, mut obj: T) -> Result<T> {
    if !obj.can_update(s, p).await? {
        return Err(Error::forbidden(T::KIND, "update"));
    }
    obj.update(s, p).await?;
    Ok(obj)
}

/// Authorize and delete `obj`.
pub async fn delete<T: Crud + Rights>(s: &Session<'_>, p: &Principal, mut obj: T) -> Result<()> {
    if !obj.can_delete(s, p).await? {
        return Err(Error::forbidden(T::KIND, "delete"));
    }
    obj.delete(s, p).await?;
    tracing::debug!(kind = T::KIND, principal = p.id(), "deleted");
    Ok(())
}
