//! The policy catalog: grant matrix, route table and their defaults.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::PolicyDocument;
use crate::error::PolicyError;
use crate::model::{Action, Resource, Role};

/// Verdict for routes that have no entry in the route table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDefault {
    /// Any authenticated role may navigate to an unlisted route.
    #[default]
    Open,
    /// Only admin may navigate to an unlisted route.
    Closed,
}

impl RouteDefault {
    pub fn allows(self) -> bool {
        matches!(self, RouteDefault::Open)
    }
}

impl std::str::FromStr for RouteDefault {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(RouteDefault::Open),
            "closed" => Ok(RouteDefault::Closed),
            other => Err(format!("expected `open` or `closed`, got `{other}`")),
        }
    }
}

/// How a listed route decides access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutePolicy {
    Roles { roles: BTreeSet<Role> },
    /// Explicitly open to any authenticated role.
    Open,
    /// Derived from the grant matrix entry for the pair.
    Grant { resource: Resource, action: Action },
}

/// Advisory finding from [`PolicyCatalog::audit`]. Never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogWarning {
    UngrantedResource { resource: Resource },
    UnusedAction { action: Action },
    AdminOnlyGrant { resource: Resource, action: Action },
    UnlistedRoute { route: String },
    DeadRouteGrant { route: String, resource: Resource, action: Action },
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogWarning::UngrantedResource { resource } => {
                write!(f, "resource `{resource}` has no grants")
            }
            CatalogWarning::UnusedAction { action } => {
                write!(f, "action `{action}` is never granted on any resource")
            }
            CatalogWarning::AdminOnlyGrant { resource, action } => {
                write!(f, "{resource}.{action} grants nobody besides admin")
            }
            CatalogWarning::UnlistedRoute { route } => write!(
                f,
                "route `{route}` has no policy entry and is open to every authenticated role"
            ),
            CatalogWarning::DeadRouteGrant {
                route,
                resource,
                action,
            } => write!(
                f,
                "route `{route}` derives from {resource}.{action}, which has no grant entry"
            ),
        }
    }
}

/// Immutable authorization tables, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalog {
    grants: BTreeMap<(Resource, Action), BTreeSet<Role>>,
    routes: BTreeMap<String, RoutePolicy>,
    declared_routes: BTreeSet<String>,
    route_default: RouteDefault,
}

impl PolicyCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The policy shipped with the HR suite.
    pub fn builtin() -> Result<Self, PolicyError> {
        crate::builtin::catalog()
    }

    pub fn from_json_str(source: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_json::from_str(source)?;
        document.into_catalog()
    }

    /// Load a JSON policy document from disk.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PolicyError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json_str(&contents)?;

        tracing::info!(
            path = %path.display(),
            grants = catalog.grants.len(),
            routes = catalog.routes.len(),
            route_default = ?catalog.route_default,
            "loaded policy document"
        );
        Ok(catalog)
    }

    pub fn with_route_default(mut self, route_default: RouteDefault) -> Self {
        self.route_default = route_default;
        self
    }

    pub fn grant(&self, resource: Resource, action: Action) -> Option<&BTreeSet<Role>> {
        self.grants.get(&(resource, action))
    }

    /// Every `(resource, action)` pair in the matrix, in catalog order.
    pub fn grants(&self) -> impl Iterator<Item = (Resource, Action, &BTreeSet<Role>)> + '_ {
        self.grants
            .iter()
            .map(|((resource, action), roles)| (*resource, *action, roles))
    }

    pub fn route(&self, path: &str) -> Option<&RoutePolicy> {
        self.routes.get(path)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &RoutePolicy)> + '_ {
        self.routes.iter().map(|(path, policy)| (path.as_str(), policy))
    }

    pub fn route_default(&self) -> RouteDefault {
        self.route_default
    }

    pub fn declared_routes(&self) -> impl Iterator<Item = &str> + '_ {
        self.declared_routes.iter().map(String::as_str)
    }

    /// Report incomplete or suspicious policy. Findings are advisory and do
    /// not change any decision.
    pub fn audit(&self) -> Vec<CatalogWarning> {
        let mut warnings = Vec::new();

        let granted_resources: BTreeSet<Resource> =
            self.grants.keys().map(|(resource, _)| *resource).collect();
        let used_actions: BTreeSet<Action> =
            self.grants.keys().map(|(_, action)| *action).collect();

        for resource in Resource::ALL {
            if !granted_resources.contains(resource) {
                warnings.push(CatalogWarning::UngrantedResource {
                    resource: *resource,
                });
            }
        }
        for action in Action::ALL {
            if !used_actions.contains(action) {
                warnings.push(CatalogWarning::UnusedAction { action: *action });
            }
        }
        for ((resource, action), roles) in &self.grants {
            if roles.iter().all(|role| *role == Role::Admin) {
                warnings.push(CatalogWarning::AdminOnlyGrant {
                    resource: *resource,
                    action: *action,
                });
            }
        }
        if self.route_default.allows() {
            for route in &self.declared_routes {
                if !self.routes.contains_key(route) {
                    warnings.push(CatalogWarning::UnlistedRoute {
                        route: route.clone(),
                    });
                }
            }
        }
        for (route, policy) in &self.routes {
            if let RoutePolicy::Grant { resource, action } = policy {
                if !self.grants.contains_key(&(*resource, *action)) {
                    warnings.push(CatalogWarning::DeadRouteGrant {
                        route: route.clone(),
                        resource: *resource,
                        action: *action,
                    });
                }
            }
        }

        warnings
    }

    /// Log every audit finding. Returns the findings for callers that report
    /// them elsewhere.
    pub fn log_audit(&self) -> Vec<CatalogWarning> {
        let warnings = self.audit();
        for warning in &warnings {
            tracing::warn!(%warning, "policy audit");
        }
        warnings
    }
}

/// Assembles a [`PolicyCatalog`], rejecting malformed tables at `build`.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    grants: Vec<(Resource, Action, Vec<Role>)>,
    routes: Vec<(String, RoutePolicy)>,
    declared_routes: Vec<String>,
    route_default: RouteDefault,
}

impl CatalogBuilder {
    pub fn grant(mut self, resource: Resource, action: Action, roles: &[Role]) -> Self {
        self.grants.push((resource, action, roles.to_vec()));
        self
    }

    pub fn route(mut self, path: impl Into<String>, roles: &[Role]) -> Self {
        self.routes.push((
            path.into(),
            RoutePolicy::Roles {
                roles: roles.iter().copied().collect(),
            },
        ));
        self
    }

    pub fn open_route(mut self, path: impl Into<String>) -> Self {
        self.routes.push((path.into(), RoutePolicy::Open));
        self
    }

    pub fn route_grant(mut self, path: impl Into<String>, resource: Resource, action: Action) -> Self {
        self.routes
            .push((path.into(), RoutePolicy::Grant { resource, action }));
        self
    }

    pub fn declare_route(mut self, path: impl Into<String>) -> Self {
        self.declared_routes.push(path.into());
        self
    }

    pub fn route_default(mut self, route_default: RouteDefault) -> Self {
        self.route_default = route_default;
        self
    }

    pub fn build(self) -> Result<PolicyCatalog, PolicyError> {
        let mut grants = BTreeMap::new();
        for (resource, action, roles) in self.grants {
            match grants.entry((resource, action)) {
                Entry::Occupied(_) => {
                    return Err(PolicyError::DuplicateGrant { resource, action });
                }
                Entry::Vacant(slot) => {
                    slot.insert(roles.into_iter().collect::<BTreeSet<_>>());
                }
            }
        }

        let mut routes = BTreeMap::new();
        for (path, policy) in self.routes {
            validate_route(&path)?;
            match routes.entry(path) {
                Entry::Occupied(slot) => {
                    return Err(PolicyError::DuplicateRoute {
                        route: slot.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(policy);
                }
            }
        }

        let mut declared_routes = BTreeSet::new();
        for path in self.declared_routes {
            validate_route(&path)?;
            declared_routes.insert(path);
        }

        Ok(PolicyCatalog {
            grants,
            routes,
            declared_routes,
            route_default: self.route_default,
        })
    }
}

fn validate_route(path: &str) -> Result<(), PolicyError> {
    if path.is_empty() {
        return Err(PolicyError::InvalidRoute {
            route: path.to_string(),
            reason: "route is empty",
        });
    }
    if !path.starts_with('/') {
        return Err(PolicyError::InvalidRoute {
            route: path.to_string(),
            reason: "route must start with `/`",
        });
    }
    Ok(())
}
