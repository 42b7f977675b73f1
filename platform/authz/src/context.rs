//! Who is asking. Supplied by the session layer; never cached here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::model::Role;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Actor {
    pub subject: String,
    /// `None` when the session carries a role name outside the vocabulary.
    pub role: Option<Role>,
    /// The session's role name when it did not parse as a [`Role`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrecognised_role: Option<String>,
}

/// The current actor, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthorizationContext {
    actor: Option<Actor>,
}

impl AuthorizationContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(subject: impl Into<String>, role: impl Into<Option<Role>>) -> Self {
        Self {
            actor: Some(Actor {
                subject: subject.into(),
                role: role.into(),
                unrecognised_role: None,
            }),
        }
    }

    /// Build a context from raw session values. A missing or empty subject is
    /// anonymous; an unrecognised role keeps the actor but with no role.
    pub fn from_session(subject: Option<&str>, role: Option<&str>) -> Self {
        match subject {
            Some(subject) if !subject.is_empty() => {
                let name = role.filter(|name| !name.is_empty());
                let role = name.and_then(|name| name.parse::<Role>().ok());
                Self {
                    actor: Some(Actor {
                        subject: subject.to_string(),
                        role,
                        unrecognised_role: name.filter(|_| role.is_none()).map(str::to_string),
                    }),
                }
            }
            _ => Self::anonymous(),
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.actor.as_ref().and_then(|actor| actor.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.actor.is_some()
    }
}

/// Source of the current [`AuthorizationContext`]. Read on every decision so
/// a role switch or logout is visible on the next call.
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> AuthorizationContext;
}

impl SessionProvider for AuthorizationContext {
    fn current(&self) -> AuthorizationContext {
        self.clone()
    }
}

impl SessionProvider for Option<AuthorizationContext> {
    fn current(&self) -> AuthorizationContext {
        self.clone().unwrap_or_default()
    }
}

impl<P: SessionProvider + ?Sized> SessionProvider for Arc<P> {
    fn current(&self) -> AuthorizationContext {
        (**self).current()
    }
}

/// A live session: the sender side switches roles or logs out.
impl SessionProvider for watch::Receiver<AuthorizationContext> {
    fn current(&self) -> AuthorizationContext {
        self.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_values_map_to_contexts() {
        let ctx = AuthorizationContext::from_session(Some("u-1"), Some("recruiter"));
        assert_eq!(ctx.role(), Some(Role::Recruiter));
        assert!(ctx.is_authenticated());

        let ctx = AuthorizationContext::from_session(Some("u-1"), Some("wizard"));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.role(), None);
        assert_eq!(
            ctx.actor().and_then(|actor| actor.unrecognised_role.as_deref()),
            Some("wizard")
        );

        let ctx = AuthorizationContext::from_session(Some("u-1"), Some(""));
        assert_eq!(ctx, AuthorizationContext::authenticated("u-1", None));

        let ctx = AuthorizationContext::from_session(Some(""), Some("admin"));
        assert!(!ctx.is_authenticated());

        let ctx = AuthorizationContext::from_session(None, Some("admin"));
        assert_eq!(ctx, AuthorizationContext::anonymous());
    }

    #[test]
    fn absent_session_is_anonymous() {
        let provider: Option<AuthorizationContext> = None;
        assert!(!provider.current().is_authenticated());
    }

    #[test]
    fn watch_receiver_reflects_latest_value() {
        let (tx, rx) = watch::channel(AuthorizationContext::authenticated("u-7", Role::Employee));
        assert_eq!(rx.current().role(), Some(Role::Employee));

        tx.send_replace(AuthorizationContext::authenticated("u-7", Role::HrOps));
        assert_eq!(rx.current().role(), Some(Role::HrOps));

        tx.send_replace(AuthorizationContext::anonymous());
        assert!(!rx.current().is_authenticated());
    }
}
