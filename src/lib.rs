#![doc = include_str!("../README.md")]
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod binary_resolver;
pub mod cache;
pub mod config;
pub mod digest;
pub mod error;
pub mod executor;
pub mod external;
pub mod filter;
pub mod fs_utils;
pub mod invocation;
pub mod model;
pub mod orchestrator;
pub mod platform;
pub mod report;
pub mod resolver;

#[cfg(any(test, feature = "project-util"))]
pub mod test_support;

pub use error::{Error, Result};
pub use executor::Executor;
pub use model::{GenerationRequest, GenerationResult};
pub use orchestrator::Orchestrator;
pub use platform::HostPlatform;
