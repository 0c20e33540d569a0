//! Project loading and saving
//!
//! The ingress/egress boundary of the crate. Documents are normalized on the way in (see
//! [`normalize`]) so the rest of the crate only ever sees the canonical model, and written
//! back in canonical form on the way out.

pub mod loader;
pub mod normalize;
pub mod saver;

pub use loader::{LoadError, ProjectLoadResult, ProjectLoader};
pub use saver::{ProjectSaver, SaveError};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialization format of a project document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectFormat {
    #[default]
    Json,
    Yaml,
}

impl ProjectFormat {
    /// Format implied by a file extension; anything but `.yaml`/`.yml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ProjectFormat::Yaml
            }
            _ => ProjectFormat::Json,
        }
    }
}

impl std::str::FromStr for ProjectFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ProjectFormat::Json),
            "yaml" | "yml" => Ok(ProjectFormat::Yaml),
            _ => Err(format!("Unknown project format: {}. Use 'json' or 'yaml'.", s)),
        }
    }
}

impl std::fmt::Display for ProjectFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectFormat::Json => write!(f, "json"),
            ProjectFormat::Yaml => write!(f, "yaml"),
        }
    }
}
