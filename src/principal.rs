//! The actor performing an operation.
//!
//! A principal is either an authenticated [`User`] or a [`LinkShare`]: a
//! scoped pseudo-identity that reaches exactly one list through a shared
//! token, capped at read or write.

use serde::{Deserialize, Serialize};

use crate::models::link_share::LinkShare;
use crate::models::user::User;
use crate::permission::Right;
use crate::{Error, Result};

/// Kind tag carried by every principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    LinkShare,
}

/// The authenticated or scoped actor performing an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    User(User),
    LinkShare(LinkShare),
}

impl Principal {
    /// Stable numeric identity (user id or link share id).
    pub fn id(&self) -> i64 {
        match self {
            Principal::User(user) => user.id,
            Principal::LinkShare(share) => share.id,
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::LinkShare(_) => PrincipalKind::LinkShare,
        }
    }

    /// The user behind this principal, if it is one.
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::User(user) => Some(user),
            Principal::LinkShare(_) => None,
        }
    }

    /// The user behind this principal, or `Forbidden` for link shares.
    pub fn require_user(&self, resource: &'static str, action: &'static str) -> Result<&User> {
        self.user().ok_or(Error::Forbidden { resource, action })
    }

    /// Right a link share principal holds on `list_id`, or `None` for users.
    ///
    /// The ceiling never exceeds write, whatever the stored share says.
    pub fn link_share_right(&self, list_id: i64) -> Option<Right> {
        match self {
            Principal::User(_) => None,
            Principal::LinkShare(share) if share.list_id == list_id => {
                Some(Right::from(share.right).min(Right::Write))
            }
            Principal::LinkShare(_) => Some(Right::None),
        }
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Principal::User(user)
    }
}

impl From<LinkShare> for Principal {
    fn from(share: LinkShare) -> Self {
        Principal::LinkShare(share)
    }
}
