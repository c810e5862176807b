//! # Package API
//!
//! Two views on the npm packages a file set imports: manifest ranges for the
//! resolvable ones, and a per-package existence report.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vibe_core::tools::extractor::{extract_dependencies, extract_import_names, FileSet};
use vibe_core::tools::registry::{
    resolve_batch, resolve_with_retry, PackageInfo, PackageStatus, RetryPolicy,
};

use crate::app::SharedState;
use crate::error::{ApiError, ErrorBody};

/// A set of project files
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FilesBody {
    /// path -> content
    #[serde(default)]
    pub files: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveDependenciesResponse {
    /// True when every detected package resolved
    pub success: bool,
    /// name -> `^version`
    pub dependencies: BTreeMap<String, String>,
    /// name -> reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<BTreeMap<String, String>>,
    pub logs: Vec<String>,
}

impl ResolveDependenciesResponse {
    fn nothing_to_do(reason: &str) -> Self {
        Self {
            success: true,
            dependencies: BTreeMap::new(),
            failed: None,
            logs: vec![reason.to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    #[schema(value_type = Vec<Object>)]
    pub packages: Vec<PackageInfo>,
    /// name -> `^version`, found packages only
    pub package_json: BTreeMap<String, String>,
    pub timestamp: String,
    pub logs: Vec<String>,
    /// True only if every package was found
    pub success: bool,
}

fn files_of(payload: Result<Json<FilesBody>, JsonRejection>) -> Result<FileSet, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::InputValidation(e.body_text()))?;
    Ok(body.files.unwrap_or_default())
}

/// Resolve the dependencies imported by a file set
#[utoipa::path(
    post,
    path = "/api/resolve-dependencies",
    tag = "packages",
    request_body = FilesBody,
    responses(
        (status = 200, description = "Resolved ranges and failures", body = ResolveDependenciesResponse),
        (status = 400, description = "Malformed body", body = ErrorBody)
    )
)]
pub async fn resolve_dependencies(
    State(state): State<SharedState>,
    payload: Result<Json<FilesBody>, JsonRejection>,
) -> Result<Json<ResolveDependenciesResponse>, ApiError> {
    let files = files_of(payload)?;
    if files.is_empty() {
        return Ok(Json(ResolveDependenciesResponse::nothing_to_do(
            "No files provided, skipping dependency resolution",
        )));
    }

    let extracted = extract_dependencies(&files);
    tracing::info!(files = files.len(), packages = extracted.len(), "Extracted dependencies");
    if extracted.is_empty() {
        return Ok(Json(ResolveDependenciesResponse::nothing_to_do(
            "No npm dependencies detected in generated code",
        )));
    }

    let mut logs: Vec<String> = extracted
        .iter()
        .map(|dep| format!("Found {} (from {})", dep.name, dep.source))
        .collect();
    let names: Vec<String> = extracted.into_iter().map(|dep| dep.name).collect();
    let batch = resolve_batch(
        state.resolver.as_ref(),
        &names,
        state.config.registry.batch_pause(),
        &mut logs,
    )
    .await;

    tracing::info!(
        resolved = batch.resolved.len(),
        failed = batch.failed.len(),
        "Dependency resolution complete"
    );

    Ok(Json(ResolveDependenciesResponse {
        success: batch.failed.is_empty(),
        dependencies: batch.resolved,
        failed: Some(batch.failed),
        logs,
    }))
}

/// Check that every imported package exists on npm
#[utoipa::path(
    post,
    path = "/api/npm-validator",
    tag = "packages",
    request_body = FilesBody,
    responses(
        (status = 200, description = "Per-package report", body = ValidationReport),
        (status = 400, description = "Empty or malformed files", body = ErrorBody)
    )
)]
pub async fn npm_validator(
    State(state): State<SharedState>,
    payload: Result<Json<FilesBody>, JsonRejection>,
) -> Result<Json<ValidationReport>, ApiError> {
    let files = files_of(payload)?;
    if files.is_empty() {
        return Err(ApiError::InputValidation(
            "files must be a non-empty object".to_string(),
        ));
    }

    let mut logs = vec![format!("Files received: {} files", files.len())];
    let names = extract_import_names(files.values().map(String::as_str));
    logs.push(format!(
        "Found {} unique packages: {}",
        names.len(),
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    ));

    let policy = RetryPolicy::from(&state.config.registry);
    let pause = state.config.registry.batch_pause();
    let mut packages = Vec::with_capacity(names.len());
    let mut package_json = BTreeMap::new();

    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }
        let info = resolve_with_retry(state.resolver.as_ref(), name, policy, &mut logs).await;
        if info.status == PackageStatus::Found {
            let range = format!("^{}", info.version);
            logs.push(format!("Added to package.json: {}@{}", name, range));
            package_json.insert(name.clone(), range);
        }
        packages.push(info);
    }

    let missing = packages
        .iter()
        .filter(|p| p.status != PackageStatus::Found)
        .count();
    logs.push(format!(
        "Validation complete: {} found, {} not found/error",
        packages.len() - missing,
        missing
    ));
    tracing::info!(checked = packages.len(), missing, "Package validation complete");

    Ok(Json(ValidationReport {
        success: missing == 0,
        packages,
        package_json,
        timestamp: Utc::now().to_rfc3339(),
        logs,
    }))
}
