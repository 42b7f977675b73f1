//! JSON form of the catalog, for deployments that replace the builtin policy.
//!
//! Names stay as strings until [`PolicyDocument::into_catalog`] so that an
//! unknown role, resource or action is reported with the entry it came from
//! instead of as a generic parse failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogBuilder, PolicyCatalog, RouteDefault};
use crate::error::PolicyError;
use crate::model::{Action, Resource, Role};

const OPEN_ROUTE: &str = "open";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default)]
    pub route_default: RouteDefault,
    /// resource -> action -> roles
    #[serde(default)]
    pub grants: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub routes: BTreeMap<String, RouteEntry>,
    #[serde(default)]
    pub declared_routes: Vec<String>,
}

/// A route value: a role list, the literal `"open"`, or a grant reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RouteEntry {
    Roles(Vec<String>),
    Keyword(String),
    Grant { resource: String, action: String },
}

impl PolicyDocument {
    pub fn into_catalog(self) -> Result<PolicyCatalog, PolicyError> {
        let mut builder = CatalogBuilder::default().route_default(self.route_default);

        for (resource_name, actions) in &self.grants {
            let resource: Resource =
                resource_name
                    .parse()
                    .map_err(|_| PolicyError::UnknownResource {
                        resource: resource_name.clone(),
                    })?;
            for (action_name, role_names) in actions {
                let action: Action =
                    action_name
                        .parse()
                        .map_err(|_| PolicyError::UnknownAction {
                            resource: resource_name.clone(),
                            action: action_name.clone(),
                        })?;
                let entry = format!("grant {resource}.{action}");
                let roles = parse_roles(role_names, &entry)?;
                builder = builder.grant(resource, action, &roles);
            }
        }

        for (path, entry) in self.routes {
            builder = match entry {
                RouteEntry::Roles(role_names) => {
                    let roles = parse_roles(&role_names, &format!("route {path}"))?;
                    builder.route(path, &roles)
                }
                RouteEntry::Keyword(keyword) if keyword == OPEN_ROUTE => builder.open_route(path),
                RouteEntry::Keyword(_) => {
                    return Err(PolicyError::InvalidRoute {
                        route: path,
                        reason: "a string route value must be \"open\"",
                    });
                }
                RouteEntry::Grant { resource, action } => {
                    let parsed_resource: Resource =
                        resource
                            .parse()
                            .map_err(|_| PolicyError::UnknownResource {
                                resource: resource.clone(),
                            })?;
                    let parsed_action: Action =
                        action.parse().map_err(|_| PolicyError::UnknownAction {
                            resource: resource.clone(),
                            action: action.clone(),
                        })?;
                    builder.route_grant(path, parsed_resource, parsed_action)
                }
            };
        }

        for path in self.declared_routes {
            builder = builder.declare_route(path);
        }

        builder.build()
    }
}

fn parse_roles(names: &[String], entry: &str) -> Result<Vec<Role>, PolicyError> {
    names
        .iter()
        .map(|name| {
            name.parse().map_err(|_| PolicyError::UnknownRole {
                role: name.clone(),
                entry: entry.to_string(),
            })
        })
        .collect()
}
