mod config;
mod http;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use platform_authz::{PolicyCatalog, PolicyEngine, Role};
use platform_obs::{ObsConfig, init_tracing};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "policy-server", version, about = "HR suite authorization policy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the inspection API for debug panels and audit tooling.
    Serve(ServeCommand),
    /// Load the configured policy and print audit findings.
    Validate,
    /// Print the capability snapshot of a role as JSON.
    Snapshot {
        #[arg(long)]
        role: String,
    },
    /// Answer a single resource/action question.
    Check {
        #[arg(long)]
        role: String,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        action: String,
    },
    /// Answer a single route question.
    #[command(name = "check-route")]
    CheckRoute {
        #[arg(long)]
        role: String,
        #[arg(long)]
        route: String,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env()?)?;
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let catalog = config.catalog()?;
    catalog.log_audit();
    let engine = PolicyEngine::new(catalog);

    match cli.command {
        Command::Serve(cmd) => run_server(cmd, config, engine).await,
        Command::Validate => {
            let findings = engine.catalog().audit();
            println!("{}", render_validation(engine.catalog()));
            info!(findings = findings.len(), "validation finished");
            Ok(())
        }
        Command::Snapshot { role } => {
            println!("{}", render_snapshot(&engine, &role)?);
            Ok(())
        }
        Command::Check {
            role,
            resource,
            action,
        } => {
            println!("{}", render_answer(engine.has_permission_str(&role, &resource, &action)));
            Ok(())
        }
        Command::CheckRoute { role, route } => {
            println!("{}", render_answer(engine.can_access_route_str(&role, &route)));
            Ok(())
        }
    }
}

async fn run_server(cmd: ServeCommand, config: AppConfig, engine: PolicyEngine) -> Result<()> {
    let state = AppState::new(engine, &config.login_route, config.cors_allowed_origins);
    http::serve(cmd.into(), state).await
}

fn render_validation(catalog: &PolicyCatalog) -> String {
    let mut out = format!(
        "policy ok: {} grants, {} routes, unlisted routes are {:?}",
        catalog.grants().count(),
        catalog.routes().count(),
        catalog.route_default()
    );
    for finding in catalog.audit() {
        out.push_str(&format!("\nwarning: {finding}"));
    }
    out
}

/// Unknown roles print the all-`false` snapshot, as the HTTP surface does.
fn render_snapshot(engine: &PolicyEngine, role: &str) -> Result<String> {
    let parsed = role.parse::<Role>().ok();
    if parsed.is_none() {
        warn!(role, "role is not in the vocabulary; nothing is granted");
    }
    Ok(serde_json::to_string_pretty(&engine.role_permissions(parsed))?)
}

fn render_answer(allowed: bool) -> &'static str {
    if allowed { "allowed" } else { "denied" }
}
