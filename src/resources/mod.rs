// Application package collectors: binary artifacts in, name tuples out

mod layout;
mod manifest;
mod native;

pub use layout::collect_layout_classes_and_attributes;
pub use manifest::{get_manifest_class_info, ComponentTag, ComponentTagInfo, ManifestClassInfo};
pub use native::get_native_classes;

use std::path::PathBuf;
use thiserror::Error;

/// Handler attribute whose values name methods invoked via reflection
pub const ONCLICK_ATTRIBUTE: &str = "onClick";

/// Collector errors
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convert a dotted Java name to a JVM type descriptor.
/// Names already in descriptor form pass through unchanged.
pub(crate) fn dotted_to_descriptor(name: &str) -> String {
    if name.starts_with('L') && name.ends_with(';') {
        return name.to_string();
    }
    format!("L{};", name.replace('.', "/"))
}
