//! Application state, router and OpenAPI document.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use utoipa::OpenApi;
use vibe_core::config::OrchestratorConfig;
use vibe_core::error::ConfigError;
use vibe_core::tools::registry::{NpmRegistry, PackageResolver};

use crate::api;
use crate::api::orchestrate::OrchestrateBody;
use crate::api::packages::{FilesBody, ResolveDependenciesResponse, ValidationReport};
use crate::api::HealthResponse;
use crate::error::ErrorBody;

/// Application state
pub struct AppState {
    /// Built once at startup and shared by every request
    pub config: Arc<OrchestratorConfig>,
    pub resolver: Arc<dyn PackageResolver>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: OrchestratorConfig) -> Result<Self, ConfigError> {
        let resolver = Arc::new(NpmRegistry::new(&config.registry)?);
        Ok(Self {
            config: Arc::new(config),
            resolver,
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vibe API",
        version = "1.0.0",
        description = "Multi-agent code generation with npm dependency resolution"
    ),
    paths(
        api::orchestrate::orchestrate,
        api::packages::resolve_dependencies,
        api::packages::npm_validator,
        api::health
    ),
    components(schemas(
        OrchestrateBody,
        FilesBody,
        ResolveDependenciesResponse,
        ValidationReport,
        HealthResponse,
        ErrorBody
    )),
    tags(
        (name = "orchestration", description = "Agent pipeline"),
        (name = "packages", description = "npm dependency resolution"),
        (name = "system", description = "Health and discovery")
    )
)]
pub struct ApiDoc;

pub fn router(state: SharedState) -> Router {
    Router::new().nest("/api", api::routes()).with_state(state)
}

pub async fn serve(state: SharedState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state.clone());
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %listener.local_addr()?,
        llm_configured = state.config.model.require_api_key().is_ok(),
        registry = %state.config.registry.effective_base_url(),
        "Vibe server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
