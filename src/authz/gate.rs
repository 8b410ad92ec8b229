use super::principal::Principal;
use super::role::Role;

/// A gated action together with the ownership facts the caller already
/// fetched from the owning store. The gate itself performs no I/O.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    CreatePost,
    EditPost { post_author: &'a str },
    DeletePost { post_author: &'a str },
    CreateComment,
    DeleteComment {
        post_author: &'a str,
        comment_author: &'a str,
    },
    ChangeRole { target: &'a str },
    DeleteUser { target: &'a str },
}

impl Action<'_> {
    /// Stable tag used in audit entries.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::CreatePost => "post.create",
            Action::EditPost { .. } => "post.update",
            Action::DeletePost { .. } => "post.delete",
            Action::CreateComment => "comment.create",
            Action::DeleteComment { .. } => "comment.delete",
            Action::ChangeRole { .. } => "user.role_change",
            Action::DeleteUser { .. } => "user.delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    SelfTarget,
    InsufficientPermissions,
    Forbidden,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::SelfTarget => "forbidden_self_target",
            DenyReason::InsufficientPermissions => "insufficient_permissions",
            DenyReason::Forbidden => "forbidden",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Decide whether `principal` may perform `action`.
///
/// Checks run in a fixed order, first match wins:
/// missing session, then self-targeting (admin actions), then the
/// role/ownership rule for the action itself.
pub fn authorize(principal: Option<&Principal>, action: &Action<'_>) -> Decision {
    let Some(actor) = principal else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    match *action {
        Action::DeletePost { post_author } => {
            if actor.permissions.can_delete || actor.email == post_author {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::Forbidden)
            }
        }
        Action::EditPost { post_author } => {
            if actor.role == Role::Admin || actor.email == post_author {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::Forbidden)
            }
        }
        Action::DeleteComment {
            post_author,
            comment_author,
        } => {
            // The post author moderates every comment under their post.
            if actor.role == Role::Admin
                || actor.email == post_author
                || actor.email == comment_author
            {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::Forbidden)
            }
        }
        Action::CreateComment => {
            if actor.permissions.can_comment {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientPermissions)
            }
        }
        Action::CreatePost => {
            if actor.permissions.can_write {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientPermissions)
            }
        }
        Action::ChangeRole { target } | Action::DeleteUser { target } => {
            // Self-targeting is rejected before the permission check.
            if actor.email == target {
                Decision::Deny(DenyReason::SelfTarget)
            } else if actor.permissions.can_delete {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientPermissions)
            }
        }
    }
}
