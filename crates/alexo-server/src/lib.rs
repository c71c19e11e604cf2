//! The alexo HTTP server.
//!
//! Two listeners share one process:
//!
//! - the main router: `POST /api/process-voice` runs the
//!   transcribe -> decide -> create/list pipeline, and everything else is
//!   served from the static directory;
//! - the standalone authorization callback listener on the redirect port,
//!   which feeds the shared callback slot.
//!
//! Every pipeline failure surfaces to the caller as
//! `500 {"error": message}`; there are no partial successes.

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::ServerError;
pub use routes::{AppState, build_router};
