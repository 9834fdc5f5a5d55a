//! Permission levels for access control.
//!
//! [`Right`] is the level the resolver derives for a principal on a resource at
//! request time. [`SharingRight`] is the level a share row stores. The [`Level`]
//! trait and [`level`] markers let code demand a minimum level in its signature:
//! a [`Grant<L>`] can only be obtained by passing a rights check.
//!
//! # Example
//!
//! ```ignore
//! use taskgate::permission::{Grant, level::Write};
//!
//! let right = rights::list_right(conn, principal, list_id).await?;
//! let grant: Grant<Write> = Grant::require(right, "list", "update")?;
//! bulk::persist(conn, grant, &tasks).await?; // Compiler enforces Write
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Derived permission level. Ordered: `None < Read < Write < Admin`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Right {
    #[default]
    None,
    Read,
    Write,
    Admin,
}

impl Right {
    /// Whether this level satisfies `required`.
    pub fn covers(self, required: Right) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Right::None => "none",
            Right::Read => "read",
            Right::Write => "write",
            Right::Admin => "admin",
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level stored on a share row (team/user grants and link shares).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingRight {
    #[default]
    Read,
    Write,
    Admin,
}

impl SharingRight {
    /// Integer stored in the `permission` column.
    pub fn code(self) -> i64 {
        match self {
            SharingRight::Read => 0,
            SharingRight::Write => 1,
            SharingRight::Admin => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(SharingRight::Read),
            1 => Ok(SharingRight::Write),
            2 => Ok(SharingRight::Admin),
            other => Err(Error::Internal(format!("Unknown stored right {other}"))),
        }
    }
}

impl From<SharingRight> for Right {
    fn from(right: SharingRight) -> Self {
        match right {
            SharingRight::Read => Right::Read,
            SharingRight::Write => Right::Write,
            SharingRight::Admin => Right::Admin,
        }
    }
}

/// Marker trait for permission levels.
///
/// Implementors define the runtime [`Right`] they stand for.
/// Standard levels: Read < Write < Admin
pub trait Level: Clone + Copy + PartialEq + Eq + fmt::Debug + Send + Sync + 'static {
    /// The minimum runtime right this level demands.
    const RIGHT: Right;
}

/// Standard permission levels (Read < Write < Admin).
pub mod level {
    use super::{Level, Right};

    /// Read-only access level.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Read;

    impl Level for Read {
        const RIGHT: Right = Right::Read;
    }

    /// Content editing access level.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Write;

    impl Level for Write {
        const RIGHT: Right = Right::Write;
    }

    /// Administrative access level.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Admin;

    impl Level for Admin {
        const RIGHT: Right = Right::Admin;
    }
}

/// Proof that a rights check for level `L` succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant<L: Level> {
    held: Right,
    _level: PhantomData<L>,
}

impl<L: Level> Grant<L> {
    /// Check `held` against `L`, failing with `Forbidden` when it falls short.
    pub fn require(held: Right, resource: &'static str, action: &'static str) -> Result<Self> {
        Self::check(held).ok_or(Error::Forbidden { resource, action })
    }

    /// Check `held` against `L`.
    pub fn check(held: Right) -> Option<Self> {
        held.covers(L::RIGHT).then_some(Self {
            held,
            _level: PhantomData,
        })
    }

    /// The right actually held, which may exceed `L`.
    pub fn held(&self) -> Right {
        self.held
    }
}
