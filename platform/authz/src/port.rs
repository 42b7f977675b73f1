use crate::context::{AuthorizationContext, SessionProvider};
use crate::engine::{CapabilitySnapshot, PolicyEngine};
use crate::model::{Action, Resource, Role};

/// Read-only queries bound to a session, for conditional UI and audit panels.
///
/// Holds no decision logic: each call reads the session and asks the engine,
/// so what it reports is exactly what the guard enforces.
#[derive(Clone, Debug)]
pub struct AccessPort<S> {
    engine: PolicyEngine,
    session: S,
}

impl<S: SessionProvider> AccessPort<S> {
    pub fn new(engine: PolicyEngine, session: S) -> Self {
        Self { engine, session }
    }

    pub fn context(&self) -> AuthorizationContext {
        self.session.current()
    }

    pub fn role(&self) -> Option<Role> {
        self.session.current().role()
    }

    pub fn can(&self, resource: Resource, action: Action) -> bool {
        self.engine.has_permission(self.role(), resource, action)
    }

    pub fn can_access(&self, route: &str) -> bool {
        self.session
            .current()
            .actor()
            .is_some_and(|actor| self.engine.actor_can_access_route(actor, route))
    }

    pub fn all_permissions(&self) -> CapabilitySnapshot {
        self.engine.role_permissions(self.role())
    }
}
