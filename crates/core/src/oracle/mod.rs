//! Boundary to the external classification oracle.
//!
//! The oracle reports typed failures ([`OracleError`]); an
//! [`ErrorClassifier`] folds them into the [`FailureKind`] taxonomy the
//! scheduler uses to decide between retrying and giving up.

mod config;
mod error;
mod http;
mod traits;
mod types;

pub use config::OracleConfig;
pub use error::{DefaultClassifier, ErrorClassifier, FailureKind, OracleError};
pub use http::HttpOracle;
pub use traits::Oracle;
pub use types::{OracleOptions, OracleVerdict};
