//! Axum routes for the fingerprint service.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cache::CacheStats;
use crate::fingerprint::{Fingerprint, OutputKind};
use crate::generator::{FingerprintGenerator, GeneratorConfig};
use crate::mhfp::{MhfpSignature, ShinglingOptions};
use crate::mol::{MolDocument, MolGraph};
use crate::MOLFP_SCHEMA_VERSION;

use super::middleware::{record_fingerprint_metrics, record_mhfp_metrics};
use super::state::{GeneratorRef, ServiceState};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to fingerprint one molecule.
///
/// The generator is taken from `generator_ref` if given, else built from
/// `config`, else the default Morgan generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRequest {
    /// The molecule.
    pub molecule: MolDocument,
    /// Registered generator to use.
    pub generator_ref: Option<GeneratorRef>,
    /// Ad hoc generator configuration.
    pub config: Option<GeneratorConfig>,
    /// Output shape.
    #[serde(default)]
    pub kind: OutputKind,
}

/// Fingerprint of one molecule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintResponse {
    /// The fingerprint.
    pub fingerprint: Fingerprint,
    /// Generator used.
    pub generator_ref: GeneratorRef,
    /// Whether the fingerprint came from the cache.
    pub cached: bool,
}

/// Request to fingerprint many molecules with one generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFingerprintRequest {
    /// The molecules.
    pub molecules: Vec<MolDocument>,
    /// Registered generator to use.
    pub generator_ref: Option<GeneratorRef>,
    /// Ad hoc generator configuration.
    pub config: Option<GeneratorConfig>,
    /// Output shape.
    #[serde(default)]
    pub kind: OutputKind,
}

/// A fingerprint tagged with its input position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFingerprint {
    /// Position in the request.
    pub index: usize,
    /// The fingerprint.
    pub fingerprint: Fingerprint,
}

/// Failure for one molecule of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoleculeError {
    /// Position in the request.
    pub index: usize,
    /// Error message.
    pub error: String,
}

/// Batch response; failed molecules do not fail the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFingerprintResponse {
    /// Successful fingerprints in input order.
    pub fingerprints: Vec<IndexedFingerprint>,
    /// Generator used.
    pub generator_ref: GeneratorRef,
    /// Number of successful molecules.
    pub success_count: usize,
    /// Per-molecule failures.
    pub errors: Vec<MoleculeError>,
}

/// Request for MinHash signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MhfpRequest {
    /// The molecules.
    pub molecules: Vec<MolDocument>,
    /// Shingling options.
    #[serde(default)]
    pub options: ShinglingOptions,
}

/// MinHash signatures, one per valid molecule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MhfpResponse {
    /// Signature length.
    pub n_permutations: usize,
    /// Permutation seed.
    pub seed: u64,
    /// Signatures, aligned with the valid input molecules.
    pub signatures: Vec<MhfpSignature>,
    /// Per-molecule failures.
    pub errors: Vec<MoleculeError>,
}

/// Request to compare two signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MhfpDistanceRequest {
    /// Left signature.
    pub a: MhfpSignature,
    /// Right signature.
    pub b: MhfpSignature,
}

/// Distance between two signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MhfpDistanceResponse {
    /// Fraction of differing components.
    pub distance: f64,
}

/// Request to register a generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterGeneratorRequest {
    /// Generator configuration.
    pub config: GeneratorConfig,
}

/// Response containing a generator reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorRefResponse {
    /// Reference to the registered generator.
    pub generator_ref: GeneratorRef,
}

/// A registered generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorEntry {
    /// Reference.
    pub generator_ref: GeneratorRef,
    /// Configuration.
    pub config: GeneratorConfig,
}

/// List of registered generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorListResponse {
    /// Registered generators, ordered by reference.
    pub generators: Vec<GeneratorEntry>,
    /// Hash over every registered reference.
    pub registry_fingerprint: String,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Output schema version.
    pub schema_version: String,
    /// Number of registered generators.
    pub generator_count: usize,
    /// Registry fingerprint.
    pub registry_fingerprint: String,
    /// Cache statistics, absent when caching is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always "alive".
    pub status: String,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(code = %self.code, error = %self.error, "Request error");
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    let body = ErrorResponse::new(code, error);
    tracing::warn!(code = %body.code, error = %body.error, status = status.as_u16(), "Request error");
    (status, Json(body))
}

// ============================================================================
// Route Handlers
// ============================================================================

fn resolve_generator(
    state: &ServiceState,
    generator_ref: Option<&GeneratorRef>,
    config: Option<GeneratorConfig>,
) -> Result<FingerprintGenerator, ApiError> {
    if let Some(generator_ref) = generator_ref {
        return state
            .registry
            .read()
            .resolve(generator_ref)
            .cloned()
            .ok_or_else(|| {
                api_error(
                    StatusCode::NOT_FOUND,
                    "GENERATOR_NOT_FOUND",
                    format!("Generator not found: {}/{}", generator_ref.algorithm, generator_ref.params_hash),
                )
            });
    }
    FingerprintGenerator::new(config.unwrap_or_default())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_CONFIG", e.to_string()))
}

async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "WORKER_FAILED",
            format!("Worker task failed: {}", e),
        )
    })
}

/// Split documents into valid graphs and per-index errors.
fn build_graphs(documents: Vec<MolDocument>) -> (Vec<(usize, MolGraph)>, Vec<MoleculeError>) {
    let mut graphs = Vec::with_capacity(documents.len());
    let mut errors = Vec::new();
    for (index, doc) in documents.into_iter().enumerate() {
        match MolGraph::try_from(doc) {
            Ok(mol) => graphs.push((index, mol)),
            Err(e) => errors.push(MoleculeError {
                index,
                error: e.to_string(),
            }),
        }
    }
    (graphs, errors)
}

/// Fingerprint one molecule.
async fn fingerprint_handler(
    State(state): State<ServiceState>,
    Json(request): Json<FingerprintRequest>,
) -> Result<Json<FingerprintResponse>, ApiError> {
    let generator = resolve_generator(&state, request.generator_ref.as_ref(), request.config)?;
    let mol = MolGraph::try_from(request.molecule)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_MOLECULE", e.to_string()))?;
    let generator_ref = GeneratorRef::from_generator(&generator);
    let kind = request.kind;

    let start = Instant::now();
    let cache = state.cache.clone();
    let (fingerprint, cached) = run_blocking(move || cache.get_or_generate(&generator, &mol, kind))
        .await?
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, "FINGERPRINT_FAILED", e.to_string()))?;

    record_fingerprint_metrics(
        &generator_ref.algorithm,
        &kind.to_string(),
        1,
        usize::from(cached),
        start.elapsed().as_millis() as u64,
    );

    Ok(Json(FingerprintResponse {
        fingerprint,
        generator_ref,
        cached,
    }))
}

/// Fingerprint many molecules; invalid molecules are reported per index.
async fn batch_fingerprint_handler(
    State(state): State<ServiceState>,
    Json(request): Json<BatchFingerprintRequest>,
) -> Result<Json<BatchFingerprintResponse>, ApiError> {
    let generator = resolve_generator(&state, request.generator_ref.as_ref(), request.config)?;
    let generator_ref = GeneratorRef::from_generator(&generator);
    let kind = request.kind;
    let molecule_count = request.molecules.len();
    let (graphs, mut errors) = build_graphs(request.molecules);

    let start = Instant::now();
    let cache = state.cache.clone();
    let outcomes = run_blocking(move || {
        use rayon::prelude::*;
        graphs
            .into_par_iter()
            .map(|(index, mol)| (index, cache.get_or_generate(&generator, &mol, kind)))
            .collect::<Vec<_>>()
    })
    .await?;

    let mut fingerprints = Vec::with_capacity(outcomes.len());
    let mut cache_hits = 0;
    for (index, outcome) in outcomes {
        match outcome {
            Ok((fingerprint, cached)) => {
                cache_hits += usize::from(cached);
                fingerprints.push(IndexedFingerprint { index, fingerprint });
            }
            Err(e) => errors.push(MoleculeError {
                index,
                error: e.to_string(),
            }),
        }
    }
    errors.sort_by_key(|e| e.index);

    record_fingerprint_metrics(
        &generator_ref.algorithm,
        &kind.to_string(),
        molecule_count,
        cache_hits,
        start.elapsed().as_millis() as u64,
    );

    Ok(Json(BatchFingerprintResponse {
        success_count: fingerprints.len(),
        fingerprints,
        generator_ref,
        errors,
    }))
}

/// MinHash signatures for a list of molecules.
async fn mhfp_handler(
    State(state): State<ServiceState>,
    Json(request): Json<MhfpRequest>,
) -> Result<Json<MhfpResponse>, ApiError> {
    let (graphs, errors) = build_graphs(request.molecules);
    let mols: Vec<MolGraph> = graphs.into_iter().map(|(_, mol)| mol).collect();
    let options = request.options;
    let encoder = state.mhfp.clone();

    let start = Instant::now();
    let count = mols.len();
    let signatures = {
        let encoder = encoder.clone();
        run_blocking(move || encoder.encode_many(&mols, &options)).await?
    };
    record_mhfp_metrics(count, encoder.n_permutations(), start.elapsed().as_millis() as u64);

    Ok(Json(MhfpResponse {
        n_permutations: encoder.n_permutations(),
        seed: encoder.seed(),
        signatures,
        errors,
    }))
}

/// Distance between two signatures.
async fn mhfp_distance_handler(
    Json(request): Json<MhfpDistanceRequest>,
) -> Result<Json<MhfpDistanceResponse>, ApiError> {
    let distance = request
        .a
        .distance(&request.b)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INCOMPARABLE_SIGNATURES", e.to_string()))?;
    Ok(Json(MhfpDistanceResponse { distance }))
}

/// List registered generators.
async fn list_generators_handler(State(state): State<ServiceState>) -> Json<GeneratorListResponse> {
    let registry = state.registry.read();
    Json(GeneratorListResponse {
        generators: registry
            .list()
            .into_iter()
            .map(|(generator_ref, config)| GeneratorEntry { generator_ref, config })
            .collect(),
        registry_fingerprint: registry.fingerprint().to_string(),
    })
}

/// Register a generator configuration.
async fn register_generator_handler(
    State(state): State<ServiceState>,
    Json(request): Json<RegisterGeneratorRequest>,
) -> Result<Json<GeneratorRefResponse>, ApiError> {
    let generator_ref = state
        .registry
        .write()
        .register(request.config)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_CONFIG", e.to_string()))?;
    Ok(Json(GeneratorRefResponse { generator_ref }))
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let (generator_count, registry_fingerprint) = {
        let registry = state.registry.read();
        (registry.len(), registry.fingerprint().to_string())
    };
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: MOLFP_SCHEMA_VERSION.to_string(),
        generator_count,
        registry_fingerprint,
        cache: state.cache.stats(),
    })
}

/// Liveness probe endpoint.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the fingerprint service.
pub fn create_router(state: ServiceState) -> Router {
    Router::new()
        // Fingerprints
        .route("/api/fingerprint", post(fingerprint_handler))
        .route("/api/fingerprint/batch", post(batch_fingerprint_handler))
        // MinHash
        .route("/api/mhfp", post(mhfp_handler))
        .route("/api/mhfp/distance", post(mhfp_distance_handler))
        // Generator registry
        .route("/api/generators", get(list_generators_handler).post(register_generator_handler))
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn propane_doc() -> serde_json::Value {
        serde_json::json!({
            "atoms": [
                {"atomic_number": 6, "implicit_hydrogens": 3},
                {"atomic_number": 6, "implicit_hydrogens": 2},
                {"atomic_number": 6, "implicit_hydrogens": 3}
            ],
            "bonds": [
                {"begin": 0, "end": 1},
                {"begin": 1, "end": 2}
            ]
        })
    }

    async fn post_json(router: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_fingerprint_then_cached() {
        let state = ServiceState::default();
        let body = serde_json::json!({
            "molecule": propane_doc(),
            "config": {"algorithm": {"type": "atom_pair"}},
            "kind": "sparse_count"
        });
        let (status, first) = post_json(create_router(state.clone()), "/api/fingerprint", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["cached"], false);
        assert_eq!(first["generator_ref"]["algorithm"], "atom_pair");
        assert_eq!(first["fingerprint"]["sparse_count"]["counts"].as_object().unwrap().len(), 2);

        let (_, second) = post_json(create_router(state), "/api/fingerprint", body).await;
        assert_eq!(second["cached"], true);
    }

    #[tokio::test]
    async fn test_unknown_generator_ref_is_not_found() {
        let body = serde_json::json!({
            "molecule": propane_doc(),
            "generator_ref": {"algorithm": "morgan", "params_hash": "0000"}
        });
        let (status, error) = post_json(create_router(ServiceState::default()), "/api/fingerprint", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["code"], "GENERATOR_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_batch_reports_per_molecule_errors() {
        let bad = serde_json::json!({"atoms": [{"atomic_number": 6}], "bonds": [{"begin": 0, "end": 4}]});
        let body = serde_json::json!({"molecules": [propane_doc(), bad, propane_doc()]});
        let (status, response) = post_json(create_router(ServiceState::default()), "/api/fingerprint/batch", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["success_count"], 2);
        assert_eq!(response["errors"][0]["index"], 1);
        assert_eq!(response["fingerprints"][1]["index"], 2);
    }

    #[tokio::test]
    async fn test_mhfp_and_distance() {
        let body = serde_json::json!({"molecules": [propane_doc(), propane_doc()]});
        let (status, response) = post_json(create_router(ServiceState::default()), "/api/mhfp", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["n_permutations"], 128);
        let signatures = response["signatures"].as_array().unwrap().clone();
        assert_eq!(signatures.len(), 2);

        let body = serde_json::json!({"a": signatures[0], "b": signatures[1]});
        let (status, response) = post_json(create_router(ServiceState::default()), "/api/mhfp/distance", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["distance"], 0.0);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_config() {
        let body = serde_json::json!({"config": {"algorithm": {"type": "morgan"}, "fp_size": 0}});
        let (status, error) = post_json(create_router(ServiceState::default()), "/api/generators", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], "INVALID_CONFIG");
    }
}
