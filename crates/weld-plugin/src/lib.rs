//! The plugin contract that every step kind implements, plus the registry
//! that maps a step's kind to the plugin handling it.
//!
//! This crate deliberately knows nothing about concrete step kinds like
//! `package` or `symlink` — those live in `weld-plugins`. Keeping the
//! contract separate from its implementations lets `weld-validate` depend
//! on the contract alone and receive a registry of trait objects at call
//! time, instead of linking against every concrete plugin.

pub mod context;
pub mod error;
pub mod plugin;
pub mod registry;

pub use context::PluginContext;
pub use error::PluginError;
pub use plugin::Plugin;
pub use registry::Registry;
