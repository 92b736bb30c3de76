use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Configuration for the reachability root seeder
///
/// Every key has a default, so a partial file (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the input application package
    pub apk_dir: String,

    /// Class-name prefixes kept by string, with transitive subclasses
    pub keep_packages: Vec<String>,

    /// Annotation type descriptors; annotated elements are kept by type
    pub keep_annotations: Vec<String>,

    /// Free-form entries naming a class and one of its static fields
    pub keep_class_members: Vec<String>,

    /// Simple method names kept by string
    pub keep_methods: Vec<String>,

    /// Enable manifest and layout seeding
    pub compute_xml_reachability: bool,

    /// Component kinds for which unexported, filter-less declarations
    /// are not rooted; subset of {activity, activity-alias}
    pub prune_unexported_components: HashSet<String>,

    /// Enable ELF classname seeding
    pub analyze_native_lib_reachability: bool,

    /// Serializer/deserializer base type descriptors
    pub json_serde_supercls: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apk_dir: String::new(),
            keep_packages: vec![],
            keep_annotations: vec![],
            keep_class_members: vec![],
            keep_methods: vec![],
            compute_xml_reachability: true,
            prune_unexported_components: HashSet::new(),
            analyze_native_lib_reachability: true,
            json_serde_supercls: vec![],
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".dexkeep.yml",
            ".dexkeep.yaml",
            ".dexkeep.toml",
            "dexkeep.yml",
            "dexkeep.yaml",
            "dexkeep.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }
}
