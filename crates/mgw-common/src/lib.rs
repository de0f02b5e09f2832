//! ---
//! mgw_section: "01-core-functionality"
//! mgw_subsection: "module"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "Shared primitives for the MGW gateway."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
//! Shared primitives for the MGW gateway workspace.
//! This crate exposes configuration loading and the tracing bootstrap
//! consumed by the daemon and the API crates.

pub mod config;
pub mod logging;

pub use config::{ApiConfig, AppConfig, ControllerConfig, LoadedAppConfig, LoggingConfig};
pub use logging::{init_tracing, LogFormat};
