//! Configuration core for the EKS end-to-end cluster test harness.
//!
//! The harness provisions an EKS cluster and layers optional add-ons
//! (node groups, observability stacks, sample workloads, scale loaders)
//! on top of it. This crate owns the single strongly-typed configuration
//! object those components share:
//!
//! - loaded from a YAML file, overlaid with `AWS_K8S_TESTER_EKS_*`
//!   environment variables, and written back for audit,
//! - normalized by a dependency-ordered validation pass that populates
//!   derived defaults (namespaces, artifact paths, S3 keys),
//! - guarded by a read-only discipline: derived fields are rejected on
//!   the environment channel and may only be written by the validator or
//!   by downstream provisioning code through [`SharedConfig`].
//!
//! ```no_run
//! use ekstester::{Config, EnvVars};
//!
//! let mut cfg = Config::new_default();
//! cfg.update_from_env(&EnvVars::from_os_env())?;
//! cfg.validate_and_set_defaults()?;
//! # Ok::<(), ekstester::Error>(())
//! ```

pub mod addons;
pub mod config;
pub mod duration;
pub mod error;
pub mod logutil;
pub mod metrics;
pub mod randutil;
pub mod schema;
pub mod timeutil;

mod env;
mod validate;

pub use config::{Config, Parameters, SharedConfig, Status};
pub use duration::HumanDuration;
pub use error::Error;
pub use schema::{EnvSchema, EnvVars, FieldKind, FieldSpec, ENV_PREFIX};
pub use timeutil::TimeFrame;
