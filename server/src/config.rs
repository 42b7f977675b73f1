use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use platform_authz::{DEFAULT_LOGIN_ROUTE, PolicyCatalog, RouteDefault};
use tracing::info;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub policy_file: Option<PathBuf>,
    pub route_default: Option<RouteDefault>,
    pub login_route: String,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let policy_file = std::env::var("POLICY_FILE")
            .ok()
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from);

        let route_default = match std::env::var("ROUTE_DEFAULT") {
            Ok(raw) => Some(
                raw.parse::<RouteDefault>()
                    .map_err(|err| anyhow!("invalid ROUTE_DEFAULT: {err}"))?,
            ),
            Err(_) => None,
        };

        let login_route =
            std::env::var("LOGIN_ROUTE").unwrap_or_else(|_| DEFAULT_LOGIN_ROUTE.into());
        if !login_route.starts_with('/') {
            return Err(anyhow!("LOGIN_ROUTE must start with `/`"));
        }

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        Ok(Self {
            policy_file,
            route_default,
            login_route,
            cors_allowed_origins,
        })
    }

    /// The configured catalog: the policy file when set, the builtin policy
    /// otherwise, with the route default override applied last.
    pub fn catalog(&self) -> Result<PolicyCatalog> {
        let catalog = match &self.policy_file {
            Some(path) => PolicyCatalog::load(path)
                .with_context(|| format!("invalid policy file {}", path.display()))?,
            None => {
                let catalog = PolicyCatalog::builtin().context("builtin policy is malformed")?;
                info!(
                    grants = catalog.grants().count(),
                    routes = catalog.routes().count(),
                    "using builtin policy"
                );
                catalog
            }
        };
        Ok(match self.route_default {
            Some(route_default) => catalog.with_route_default(route_default),
            None => catalog,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
