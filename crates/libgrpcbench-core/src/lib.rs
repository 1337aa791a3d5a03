//! Core library for grpcbench
//!
//! Builds the validated, read-only [`RunConfig`] for a single gRPC load-test
//! run from a call name, a target host and an ordered list of
//! [`RunOption`]s. The engine that actually issues RPCs consumes the result.
//!
//! ```no_run
//! use libgrpcbench_core::{options, RunConfig};
//!
//! let config = RunConfig::build(
//!     "helloworld.Greeter.SayHello",
//!     "localhost:50051",
//!     &[
//!         options::proto_file("protos/helloworld.proto", vec![]),
//!         options::json_data_from_str(r#"{"name":"bob"}"#),
//!         options::concurrency(10),
//!     ],
//! )?;
//! assert_eq!(config.import_paths(), &["protos", "."]);
//! # Ok::<(), libgrpcbench_core::ConfigError>(())
//! ```

pub mod config;
pub mod defaults;
pub mod error;
pub mod options;
pub mod settings;

pub use config::RunConfig;
pub use defaults::{NameGenerator, ReadableNames, RunDefaults};
pub use error::{ConfigError, Result};
pub use options::RunOption;
pub use settings::{load_settings, parse_duration, RunSettings};
