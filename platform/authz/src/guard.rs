//! Navigation and rendering gate.
//!
//! The guard only computes a [`Verdict`]; redirecting, rendering a denial
//! page and offering a way back are left to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::{AuthorizationContext, SessionProvider};
use crate::engine::PolicyEngine;
use crate::model::{Action, Resource, Role};

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// What protected content asks of the actor.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    AllowedRoles { roles: Vec<Role> },
    Route { path: String },
    Permission { resource: Resource, action: Action },
}

impl Requirement {
    pub fn roles(roles: &[Role]) -> Self {
        Requirement::AllowedRoles {
            roles: roles.to_vec(),
        }
    }

    pub fn route(path: impl Into<String>) -> Self {
        Requirement::Route { path: path.into() }
    }

    pub fn permission(resource: Resource, action: Action) -> Self {
        Requirement::Permission { resource, action }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::AllowedRoles { roles } => {
                f.write_str("one of the roles [")?;
                for (idx, role) in roles.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(role.as_str())?;
                }
                f.write_str("]")
            }
            Requirement::Route { path } => write!(f, "access to {path}"),
            Requirement::Permission { resource, action } => {
                write!(f, "permission {resource}.{action}")
            }
        }
    }
}

/// Context for a denial screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub subject: String,
    pub role: Option<Role>,
    pub requirement: Requirement,
}

impl Denial {
    pub fn message(&self) -> String {
        let role = self.role.map_or("no recognised role", Role::as_str);
        format!(
            "Your role ({role}) does not grant {}. Go back or contact an administrator.",
            self.requirement
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// No actor: send them to the login entry point.
    Unauthenticated { redirect_to: String },
    Unauthorized(Denial),
    Authorized,
}

impl Verdict {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Verdict::Authorized)
    }
}

/// Evaluates requirements against the context it is handed; keeps no state
/// between evaluations.
#[derive(Clone, Debug)]
pub struct Guard {
    engine: PolicyEngine,
    login_route: String,
}

impl Guard {
    pub fn new(engine: PolicyEngine) -> Self {
        Self {
            engine,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }

    pub fn with_login_route(mut self, login_route: impl Into<String>) -> Self {
        self.login_route = login_route.into();
        self
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn evaluate(&self, ctx: &AuthorizationContext, requirement: &Requirement) -> Verdict {
        let Some(actor) = ctx.actor() else {
            return Verdict::Unauthenticated {
                redirect_to: self.login_route.clone(),
            };
        };

        let allowed = match requirement {
            Requirement::AllowedRoles { roles } => self.engine.allows_any_of(actor.role, roles),
            Requirement::Route { path } => self.engine.actor_can_access_route(actor, path),
            Requirement::Permission { resource, action } => {
                self.engine.has_permission(actor.role, *resource, *action)
            }
        };

        if allowed {
            Verdict::Authorized
        } else {
            tracing::debug!(
                subject = %actor.subject,
                role = ?actor.role,
                %requirement,
                "guard denied access"
            );
            Verdict::Unauthorized(Denial {
                subject: actor.subject.clone(),
                role: actor.role,
                requirement: requirement.clone(),
            })
        }
    }

    /// Read the session once and evaluate against it.
    pub fn evaluate_session<S>(&self, session: &S, requirement: &Requirement) -> Verdict
    where
        S: SessionProvider + ?Sized,
    {
        self.evaluate(&session.current(), requirement)
    }
}
