//! # Scorigami Web
//!
//! HTTP front of the score-sequence graph engine.
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve seeded synthetic data
//! cargo run -p scorigami-web -- --port 3000
//!
//! # Serve a SQLite aggregate database
//! cargo run -p scorigami-web -- --db scorigami.db
//! ```
//!
//! ## API Endpoints
//!
//! All graph endpoints take `sets`, `sex` (alias `gender`), `year` and
//! `tournament` query parameters. Invalid filters get a 400 with
//! `{"error": ...}`; store failures a 500.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/v1/graph-stream` | NDJSON frame stream |
//! | GET | `/api/v1/graph` | Whole dataset as JSON |
//! | GET | `/api/v1/layout` | Laid-out, encoded render graph (`color=category\|gradient`) |
//! | GET | `/api/v1/node/:id` | One node and its children's ids (404 when absent) |
//! | GET | `/api/v1/health` | Liveness and store name |

pub mod routes;
pub mod state;

pub use state::{AppState, ServerConfig};
