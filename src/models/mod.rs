//! Resource kinds.
//!
//! Every kind implements [`crate::crud::Crud`] and [`crate::crud::Rights`].
//! The sharing joins are written once in [`sharing`] and instantiated per
//! container.

pub mod assignee;
pub mod bulk_task;
pub mod label;
pub mod label_task;
pub mod link_share;
pub mod list;
pub mod namespace;
pub mod sharing;
pub mod task;
pub mod team;
pub mod team_member;
pub mod user;

pub use assignee::TaskAssignee;
pub use bulk_task::{BulkTask, TaskPatch, TaskUpdate};
pub use label::Label;
pub use label_task::LabelTask;
pub use link_share::LinkShare;
pub use list::List;
pub use namespace::Namespace;
pub use sharing::{
    ListUser, NamespaceUser, SharedTeam, SharedUser, TeamList, TeamNamespace, TeamShare,
    UserShare,
};
pub use task::Task;
pub use team::{Team, TeamUser};
pub use team_member::TeamMember;
pub use user::User;

use crate::{Error, Result};

/// Longest name or title a resource accepts, in characters.
pub const MAX_NAME_LENGTH: usize = 250;

/// Require `value` to hold between 1 and [`MAX_NAME_LENGTH`] characters.
pub(crate) fn validate_name(field: &str, value: &str) -> Result<()> {
    let length = value.chars().count();
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} cannot be empty")));
    }
    if length > MAX_NAME_LENGTH {
        return Err(Error::Validation(format!(
            "{field} cannot be longer than {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}
