//! Fingerprint REST Service
//!
//! Exposes the generators and the MinHash encoder over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /api/fingerprint` - Fingerprint one molecule
//! - `POST /api/fingerprint/batch` - Fingerprint many molecules, errors per index
//! - `POST /api/mhfp` - MinHash signatures
//! - `POST /api/mhfp/distance` - Distance between two signatures
//! - `GET /api/generators` - List registered generators
//! - `POST /api/generators` - Register a generator configuration
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_fingerprint_metrics, record_mhfp_metrics};
pub use routes::create_router;
pub use state::{GeneratorRef, GeneratorRegistry, ServiceState};
