// Documentation drift detection worker.
// Exposes the pipeline's modules for integration testing and the binary.

pub mod adapters;
pub mod claims;
pub mod comparison;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod fingerprint;
pub mod http;
pub mod joiner;
pub mod llm;
pub mod notify;
pub mod observability;
pub mod patch;
pub mod pipeline;
pub mod policy;
pub mod queue;
pub mod routing;
pub mod shutdown;
pub mod signals;
pub mod state_machine;
pub mod telemetry;
pub mod writeback;

pub use config::{config, init_config, DriftWorkerConfig};
pub use db::{init_database, shutdown_database};
pub use error::{DriftError, ErrorCode, FailureClass};
pub use shutdown::ShutdownCoordinator;
pub use state_machine::{resolve, Resolution};
pub use telemetry::{init_telemetry, shutdown_telemetry};
