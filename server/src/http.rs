use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{self, HeaderName, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
};
use platform_authz::{
    AuthorizationContext, CapabilitySnapshot, CatalogWarning, Guard, PolicyEngine, Requirement,
    Role, RouteDefault, Verdict,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub engine: PolicyEngine,
    pub guard: Guard,
    pub cors_allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(engine: PolicyEngine, login_route: &str, cors_allowed_origins: Vec<String>) -> Self {
        let guard = Guard::new(engine.clone()).with_login_route(login_route);
        Self {
            engine,
            guard,
            cors_allowed_origins,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "policy server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("policy server terminated unexpectedly")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let header_name = HeaderName::from_static("x-request-id");
    let request_id = MakeRequestUuid;
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/v1/roles", get(roles_handler))
        .route("/v1/roles/{role}/permissions", get(permissions_handler))
        .route("/v1/check", post(check_handler))
        .route("/v1/routes/check", post(route_check_handler))
        .route("/v1/guard", post(guard_handler))
        .route("/v1/audit", get(audit_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    grants: usize,
    routes: usize,
    route_default: RouteDefault,
    version: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.engine.catalog();
    Json(HealthResponse {
        ok: true,
        grants: catalog.grants().count(),
        routes: catalog.routes().count(),
        route_default: catalog.route_default(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn roles_handler() -> Json<&'static [Role]> {
    Json(Role::ALL)
}

/// An unknown role is in no grant entry, so its snapshot is all `false`.
async fn permissions_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Json<CapabilitySnapshot> {
    Json(state.engine.role_permissions(role.parse::<Role>().ok()))
}

#[derive(Deserialize)]
struct CheckRequest {
    #[serde(default)]
    role: Option<String>,
    resource: String,
    action: String,
}

#[derive(Deserialize)]
struct RouteCheckRequest {
    #[serde(default)]
    role: Option<String>,
    route: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct CheckResponse {
    allowed: bool,
}

async fn check_handler(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Json<CheckResponse> {
    let allowed = state
        .engine
        .has_permission_str(req.role.as_deref().unwrap_or_default(), &req.resource, &req.action);
    Json(CheckResponse { allowed })
}

async fn route_check_handler(
    State(state): State<AppState>,
    Json(req): Json<RouteCheckRequest>,
) -> Json<CheckResponse> {
    let allowed = state
        .engine
        .can_access_route_str(req.role.as_deref().unwrap_or_default(), &req.route);
    Json(CheckResponse { allowed })
}

#[derive(Deserialize)]
struct GuardRequest {
    subject: Option<String>,
    role: Option<String>,
    requirement: Requirement,
}

async fn guard_handler(
    State(state): State<AppState>,
    Json(req): Json<GuardRequest>,
) -> Json<Verdict> {
    let ctx = AuthorizationContext::from_session(req.subject.as_deref(), req.role.as_deref());
    Json(state.guard.evaluate(&ctx, &req.requirement))
}

#[derive(Serialize)]
struct AuditResponse {
    route_default: RouteDefault,
    warnings: Vec<AuditEntry>,
}

#[derive(Serialize)]
struct AuditEntry {
    finding: CatalogWarning,
    message: String,
}

async fn audit_handler(State(state): State<AppState>) -> Json<AuditResponse> {
    let catalog = state.engine.catalog();
    let warnings = catalog
        .audit()
        .into_iter()
        .map(|finding| AuditEntry {
            message: finding.to_string(),
            finding,
        })
        .collect();
    Json(AuditResponse {
        route_default: catalog.route_default(),
        warnings,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use platform_authz::PolicyCatalog;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn router() -> Router {
        let engine = PolicyEngine::new(PolicyCatalog::builtin().unwrap());
        build_router(AppState::new(engine, "/login", Vec::new()))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_catalog_shape() {
        let (status, body) = send(get_req("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["route_default"], "open");
    }

    #[tokio::test]
    async fn check_answers_false_for_nonsense() {
        let (status, body) = send(post_json(
            "/v1/check",
            json!({ "role": "recruiter", "resource": "employees", "action": "delete" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], false);

        let (_, body) = send(post_json(
            "/v1/check",
            json!({ "role": "recruiter", "resource": "rockets", "action": "launch" }),
        ))
        .await;
        assert_eq!(body["allowed"], false);

        let (_, body) = send(post_json(
            "/v1/check",
            json!({ "role": "admin", "resource": "rockets", "action": "launch" }),
        ))
        .await;
        assert_eq!(body["allowed"], true);
    }

    #[tokio::test]
    async fn route_check_reproduces_open_default() {
        let (_, body) = send(post_json(
            "/v1/routes/check",
            json!({ "role": "hiring_manager", "route": "/tenants" }),
        ))
        .await;
        assert_eq!(body["allowed"], true);

        let (_, body) = send(post_json(
            "/v1/routes/check",
            json!({ "role": "", "route": "/tenants" }),
        ))
        .await;
        assert_eq!(body["allowed"], false);
    }

    #[tokio::test]
    async fn missing_or_null_role_is_denied() {
        for body in [
            json!({ "role": null, "route": "/tenants" }),
            json!({ "route": "/dashboard" }),
        ] {
            let (status, body) = send(post_json("/v1/routes/check", body)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["allowed"], false);
        }

        let (status, body) = send(post_json(
            "/v1/check",
            json!({ "role": null, "resource": "jobs", "action": "view" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], false);
    }

    #[tokio::test]
    async fn guard_and_route_check_agree_on_unknown_roles() {
        for route in ["/tenants", "/dashboard", "/payroll"] {
            let (_, checked) = send(post_json(
                "/v1/routes/check",
                json!({ "role": "wizard", "route": route }),
            ))
            .await;
            let (_, guarded) = send(post_json(
                "/v1/guard",
                json!({
                    "subject": "u-1",
                    "role": "wizard",
                    "requirement": { "kind": "route", "path": route },
                }),
            ))
            .await;
            assert_eq!(
                checked["allowed"] == true,
                guarded["verdict"] == "authorized",
                "{route}"
            );
        }
    }

    #[tokio::test]
    async fn permissions_snapshot_and_unknown_role() {
        let (status, body) = send(get_req("/v1/roles/hiring_manager/permissions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jobs"]["create"], true);
        assert_eq!(body["employees"]["delete"], false);

        let (status, body) = send(get_req("/v1/roles/wizard/permissions")).await;
        assert_eq!(status, StatusCode::OK);
        let flags: Vec<&Value> = body
            .as_object()
            .unwrap()
            .values()
            .flat_map(|actions| actions.as_object().unwrap().values())
            .collect();
        assert!(!flags.is_empty());
        assert!(flags.iter().all(|flag| **flag == Value::Bool(false)));
    }

    #[tokio::test]
    async fn guard_endpoint_returns_verdicts() {
        let requirement = json!({ "kind": "allowed_roles", "roles": ["admin"] });

        let (_, body) = send(post_json("/v1/guard", json!({ "requirement": requirement }))).await;
        assert_eq!(body["verdict"], "unauthenticated");
        assert_eq!(body["redirect_to"], "/login");

        let (_, body) = send(post_json(
            "/v1/guard",
            json!({ "subject": "u-1", "role": "employee", "requirement": requirement }),
        ))
        .await;
        assert_eq!(body["verdict"], "unauthorized");
        assert_eq!(body["role"], "employee");

        let (_, body) = send(post_json(
            "/v1/guard",
            json!({ "subject": "u-2", "role": "admin", "requirement": requirement }),
        ))
        .await;
        assert_eq!(body["verdict"], "authorized");
    }

    #[tokio::test]
    async fn audit_lists_unlisted_routes() {
        let (status, body) = send(get_req("/v1/audit")).await;
        assert_eq!(status, StatusCode::OK);
        let routes: Vec<&str> = body["warnings"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|entry| entry["finding"]["kind"] == "unlisted_route")
            .filter_map(|entry| entry["finding"]["route"].as_str())
            .collect();
        assert_eq!(routes, vec!["/audit-log", "/tenants"]);
    }

    #[tokio::test]
    async fn roles_are_listed() {
        let (_, body) = send(get_req("/v1/roles")).await;
        let roles = body.as_array().unwrap();
        assert_eq!(roles.len(), Role::ALL.len());
        assert!(roles.contains(&json!("super_admin")));
    }
}
