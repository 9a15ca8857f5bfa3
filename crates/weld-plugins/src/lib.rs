//! Reference implementations of every step kind: `package`, `repo`,
//! `symlink`, `copy`, `command`, `template`, and `line_in_file`.

pub mod command;
pub mod copy;
pub mod line_in_file;
pub mod package;
pub mod payload;
pub mod render;
pub mod repo;
pub mod symlink;
pub mod template;

use std::sync::Arc;

use weld_plugin::Registry;

pub use command::CommandPlugin;
pub use copy::CopyPlugin;
pub use line_in_file::LineInFilePlugin;
pub use package::PackagePlugin;
pub use repo::RepoPlugin;
pub use symlink::SymlinkPlugin;
pub use template::TemplatePlugin;

/// Build a registry with every reference plugin already registered.
pub fn registry() -> Registry {
    let registry = Registry::new();
    register_all(&registry);
    registry
}

pub fn register_all(registry: &Registry) {
    registry.register(Arc::new(PackagePlugin));
    registry.register(Arc::new(RepoPlugin));
    registry.register(Arc::new(SymlinkPlugin));
    registry.register(Arc::new(CopyPlugin));
    registry.register(Arc::new(CommandPlugin));
    registry.register(Arc::new(TemplatePlugin));
    registry.register(Arc::new(LineInFilePlugin));
}
