//! Decision functions over a [`PolicyCatalog`].
//!
//! Every function here is total: unknown names, a missing role or an empty
//! route resolve to a boolean, never to an error or a panic, so they are safe
//! to call from render paths.
//!
//! Admin override: a caller whose role is [`Role::Admin`] is allowed every
//! resource action and every route without consulting either table. The
//! override is checked before any argument is looked at, so it also hides
//! malformed resource/action names. It lives in [`admin_override`] and
//! nowhere else.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{PolicyCatalog, RoutePolicy};
use crate::context::Actor;
use crate::model::{Action, Resource, Role};

fn admin_override(role: Option<Role>) -> bool {
    role == Some(Role::Admin)
}

/// `resource -> action -> allowed` for one role, materialised from
/// [`PolicyEngine::has_permission`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilitySnapshot {
    entries: BTreeMap<Resource, BTreeMap<Action, bool>>,
}

impl CapabilitySnapshot {
    /// `None` when the pair is not in the grant matrix.
    pub fn get(&self, resource: Resource, action: Action) -> Option<bool> {
        self.entries
            .get(&resource)
            .and_then(|actions| actions.get(&action))
            .copied()
    }

    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.get(resource, action).unwrap_or(false)
    }

    pub fn resource(&self, resource: Resource) -> Option<&BTreeMap<Action, bool>> {
        self.entries.get(&resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, Action, bool)> + '_ {
        self.entries.iter().flat_map(|(resource, actions)| {
            actions
                .iter()
                .map(move |(action, allowed)| (*resource, *action, *allowed))
        })
    }

    pub fn granted(&self) -> impl Iterator<Item = (Resource, Action)> + '_ {
        self.iter()
            .filter(|(_, _, allowed)| *allowed)
            .map(|(resource, action, _)| (resource, action))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cheap to clone; all clones share one catalog.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    catalog: Arc<PolicyCatalog>,
}

impl PolicyEngine {
    pub fn new(catalog: PolicyCatalog) -> Self {
        Self::from_shared(Arc::new(catalog))
    }

    pub fn from_shared(catalog: Arc<PolicyCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }

    /// Admin always; otherwise membership in the grant entry, and `false`
    /// when there is no entry.
    pub fn has_permission(
        &self,
        role: impl Into<Option<Role>>,
        resource: Resource,
        action: Action,
    ) -> bool {
        let role = role.into();
        if admin_override(role) {
            return true;
        }
        let Some(role) = role else {
            return false;
        };
        self.catalog
            .grant(resource, action)
            .is_some_and(|roles| roles.contains(&role))
    }

    /// String form of [`Self::has_permission`] for untyped callers. The role
    /// is examined first, so an admin passes even with nonsense names.
    pub fn has_permission_str(&self, role: &str, resource: &str, action: &str) -> bool {
        let Ok(role) = role.parse::<Role>() else {
            return false;
        };
        if admin_override(Some(role)) {
            return true;
        }
        match (resource.parse::<Resource>(), action.parse::<Action>()) {
            (Ok(resource), Ok(action)) => self.has_permission(role, resource, action),
            _ => false,
        }
    }

    /// Route access. Unlisted routes follow the catalog's route default,
    /// which is open unless configured otherwise.
    pub fn can_access_route(&self, role: impl Into<Option<Role>>, route: &str) -> bool {
        let role = role.into();
        if route.is_empty() || role.is_none() {
            return false;
        }
        if admin_override(role) {
            return true;
        }
        match self.catalog.route(route) {
            Some(RoutePolicy::Roles { roles }) => role.is_some_and(|role| roles.contains(&role)),
            Some(RoutePolicy::Open) => true,
            Some(RoutePolicy::Grant { resource, action }) => {
                self.has_permission(role, *resource, *action)
            }
            None => self.catalog.route_default().allows(),
        }
    }

    /// String form of [`Self::can_access_route`]. A non-empty role outside
    /// the vocabulary is in no role set: denied on listed routes, and subject
    /// to the route default on unlisted ones.
    pub fn can_access_route_str(&self, role: &str, route: &str) -> bool {
        if role.is_empty() || route.is_empty() {
            return false;
        }
        match role.parse::<Role>() {
            Ok(role) => self.can_access_route(role, route),
            Err(_) => match self.catalog.route(route) {
                Some(RoutePolicy::Open) => true,
                Some(_) => false,
                None => self.catalog.route_default().allows(),
            },
        }
    }

    /// Route access for a session actor. An actor whose role name fell
    /// outside the vocabulary gets the answer [`Self::can_access_route_str`]
    /// gives for that name.
    pub fn actor_can_access_route(&self, actor: &Actor, route: &str) -> bool {
        match (actor.role, actor.unrecognised_role.as_deref()) {
            (None, Some(name)) => self.can_access_route_str(name, route),
            (role, _) => self.can_access_route(role, route),
        }
    }

    /// Explicit role-list check with the admin override. An empty list
    /// admits only admin.
    pub fn allows_any_of(&self, role: impl Into<Option<Role>>, allowed: &[Role]) -> bool {
        let role = role.into();
        if admin_override(role) {
            return true;
        }
        role.is_some_and(|role| allowed.contains(&role))
    }

    /// Evaluate every grant matrix pair for `role`.
    pub fn role_permissions(&self, role: impl Into<Option<Role>>) -> CapabilitySnapshot {
        let role = role.into();
        let mut entries: BTreeMap<Resource, BTreeMap<Action, bool>> = BTreeMap::new();
        for (resource, action, _) in self.catalog.grants() {
            entries
                .entry(resource)
                .or_default()
                .insert(action, self.has_permission(role, resource, action));
        }
        CapabilitySnapshot { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RouteDefault;
    use crate::context::AuthorizationContext;

    fn engine() -> PolicyEngine {
        let catalog = PolicyCatalog::builder()
            .grant(Resource::Jobs, Action::Create, &[Role::Recruiter, Role::HiringManager])
            .grant(Resource::Employees, Action::Delete, &[Role::Admin])
            .grant(Resource::Payroll, Action::RunPayroll, &[Role::Payroll])
            .route("/jobs", &[Role::Recruiter])
            .open_route("/dashboard")
            .route_grant("/payroll/run", Resource::Payroll, Action::RunPayroll)
            .build()
            .unwrap();
        PolicyEngine::new(catalog)
    }

    #[test]
    fn grants_are_membership_checks() {
        let engine = engine();
        assert!(engine.has_permission(Role::Recruiter, Resource::Jobs, Action::Create));
        assert!(!engine.has_permission(Role::Employee, Resource::Jobs, Action::Create));
        assert!(!engine.has_permission(Role::Recruiter, Resource::Employees, Action::Delete));
    }

    #[test]
    fn missing_entries_and_roles_are_denied() {
        let engine = engine();
        assert!(!engine.has_permission(Role::Recruiter, Resource::Jobs, Action::Publish));
        assert!(!engine.has_permission(None, Resource::Jobs, Action::Create));
    }

    #[test]
    fn admin_passes_everything() {
        let engine = engine();
        assert!(engine.has_permission(Role::Admin, Resource::Tenants, Action::Configure));
        assert!(engine.has_permission_str("admin", "spaceships", "launch"));
        assert!(engine.has_permission_str("admin", "", ""));
        assert!(engine.can_access_route(Role::Admin, "/anything"));
        assert!(engine.allows_any_of(Role::Admin, &[]));
    }

    #[test]
    fn string_queries_fail_closed() {
        let engine = engine();
        assert!(engine.has_permission_str("recruiter", "jobs", "create"));
        assert!(!engine.has_permission_str("recruiter", "jobs", "launch"));
        assert!(!engine.has_permission_str("recruiter", "spaceships", "create"));
        assert!(!engine.has_permission_str("", "jobs", "create"));
        assert!(!engine.has_permission_str("Recruiter", "jobs", "create"));
    }

    #[test]
    fn routes_follow_their_entry_kind() {
        let engine = engine();
        assert!(engine.can_access_route(Role::Recruiter, "/jobs"));
        assert!(!engine.can_access_route(Role::Employee, "/jobs"));
        assert!(engine.can_access_route(Role::Candidate, "/dashboard"));
        assert!(engine.can_access_route(Role::Payroll, "/payroll/run"));
        assert!(!engine.can_access_route(Role::Finance, "/payroll/run"));
    }

    #[test]
    fn unlisted_routes_follow_the_default() {
        let engine = engine();
        assert!(engine.can_access_route(Role::Employee, "/tenants"));
        assert!(!engine.can_access_route(None, "/tenants"));
        assert!(!engine.can_access_route(Role::Employee, ""));

        let closed = PolicyEngine::new(
            engine.catalog().clone().with_route_default(RouteDefault::Closed),
        );
        assert!(!closed.can_access_route(Role::Employee, "/tenants"));
        assert!(closed.can_access_route(Role::Admin, "/tenants"));
        assert!(closed.can_access_route(Role::Recruiter, "/jobs"));
    }

    #[test]
    fn unknown_role_strings_on_routes() {
        let engine = engine();
        assert!(!engine.can_access_route_str("wizard", "/jobs"));
        assert!(engine.can_access_route_str("wizard", "/dashboard"));
        assert!(engine.can_access_route_str("wizard", "/tenants"));
        assert!(!engine.can_access_route_str("", "/tenants"));
        assert!(!engine.can_access_route_str("recruiter", ""));
    }

    #[test]
    fn session_actors_match_string_route_checks() {
        let engine = engine();
        for (subject, role) in [("u-1", "wizard"), ("u-2", "recruiter"), ("u-3", "")] {
            let ctx = AuthorizationContext::from_session(Some(subject), Some(role));
            let actor = ctx.actor().unwrap();
            for route in ["/jobs", "/dashboard", "/tenants", "/payroll/run", ""] {
                assert_eq!(
                    engine.actor_can_access_route(actor, route),
                    engine.can_access_route_str(role, route),
                    "{role:?} on {route:?}"
                );
            }
        }
    }

    #[test]
    fn explicit_role_lists() {
        let engine = engine();
        assert!(engine.allows_any_of(Role::Finance, &[Role::Finance, Role::Payroll]));
        assert!(!engine.allows_any_of(Role::Employee, &[Role::Finance]));
        assert!(!engine.allows_any_of(Role::Employee, &[]));
        assert!(!engine.allows_any_of(None, &[Role::Employee]));
    }

    #[test]
    fn snapshot_covers_every_matrix_pair() {
        let engine = engine();
        let snapshot = engine.role_permissions(Role::Recruiter);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get(Resource::Jobs, Action::Create), Some(true));
        assert_eq!(snapshot.get(Resource::Employees, Action::Delete), Some(false));
        assert_eq!(snapshot.get(Resource::Jobs, Action::Publish), None);
        assert_eq!(
            snapshot.granted().collect::<Vec<_>>(),
            vec![(Resource::Jobs, Action::Create)]
        );

        let anonymous = engine.role_permissions(None);
        assert_eq!(anonymous.granted().count(), 0);
        assert_eq!(anonymous.len(), 3);
    }

    #[test]
    fn snapshot_serializes_as_nested_map() {
        let snapshot = engine().role_permissions(Role::Payroll);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["payroll"]["runPayroll"], serde_json::json!(true));
        assert_eq!(json["jobs"]["create"], serde_json::json!(false));
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PolicyEngine>();
    }
}
