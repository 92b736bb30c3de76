// Seeding phase: one-shot, no fixed point; propagation is a later pass

mod annotations;
mod layouts;
mod manifest;
mod reflection;
mod resolver;
mod seeds;

pub use annotations::keep_annotated_classes;
pub use layouts::{analyze_reachable_from_xml_layouts, recompute_reachable_from_xml_layouts};
pub use manifest::analyze_reachable_from_manifest;
pub use reflection::{analyze_reflection, AbstractObject, ReflectionAnalysis};
pub use resolver::{blacklist_field, blacklist_method};
pub use seeds::{
    analyze_serializable, initialize_reachable_for_json_serde, keep_class_members, keep_methods,
    mark_native_library_classes, mark_reflected_packages, recompute_classes_reachable_from_code,
};

use crate::config::Config;
use crate::ir::Scope;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Roots that survive every later pass: manifest and layout references,
/// reflective lookups, configured keeps, reflected packages,
/// serialization requirements.
fn init_permanently_reachable_classes(
    scope: &Scope,
    config: &Config,
    baseline_annotations: &HashSet<String>,
) {
    let mut annotation_types = baseline_annotations.clone();
    for name in &config.keep_annotations {
        if scope.class_by_descriptor(name).is_some() {
            annotation_types.insert(name.clone());
        } else {
            warn!("keep annotation {} not found", name);
        }
    }

    keep_annotated_classes(scope, &annotation_types);
    keep_class_members(scope, &config.keep_class_members);
    keep_methods(scope, &config.keep_methods);

    if !config.apk_dir.is_empty() {
        let apk_dir = Path::new(&config.apk_dir);
        if config.compute_xml_reachability {
            // Classes present in the manifest
            analyze_reachable_from_manifest(scope, apk_dir, &config.prune_unexported_components);
            // Classes present in XML layouts
            analyze_reachable_from_xml_layouts(scope, apk_dir);
        }
        if config.analyze_native_lib_reachability {
            // Classnames present in native libraries (lib/*/*.so)
            mark_native_library_classes(scope, apk_dir);
        }
    }

    analyze_reflection(scope);
    mark_reflected_packages(scope, &config.keep_packages);
    analyze_serializable(scope);
}

/// Seed every reachability root the static type system does not expose.
///
/// `baseline_annotations` are annotation type descriptors the driver
/// already resolved (e.g. its no-optimization set); they are merged with
/// the configured `keep_annotations`, which warn and are skipped when
/// unresolved. The phase is one-shot and idempotent; flag propagation
/// across references is a later pass.
pub fn init_reachable_classes(
    scope: &Scope,
    config: &Config,
    baseline_annotations: &HashSet<String>,
) {
    info!("Seeding reachability roots over {} classes", scope.len());

    init_permanently_reachable_classes(scope, config, baseline_annotations);

    // Reachable in ways that can change as passes delete code, so kept
    // separate from the permanent roots above
    recompute_classes_reachable_from_code(scope);

    initialize_reachable_for_json_serde(scope, &config.json_serde_supercls);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DexClass, DexMethod, Visibility};

    #[test]
    fn test_unresolved_keep_annotation_is_skipped() {
        let scope: Scope = [DexClass::new("La;")
            .with_annotations(vec!["Lmissing/Anno;".to_string()])]
        .into_iter()
        .collect();

        let config = Config {
            keep_annotations: vec!["Lmissing/Anno;".to_string()],
            ..Config::default()
        };

        // The annotation type is not loaded, so nothing is marked
        init_reachable_classes(&scope, &config, &HashSet::new());
        assert!(!scope
            .class_by_descriptor("La;")
            .unwrap()
            .rstate
            .is_referenced_by_type());
    }

    #[test]
    fn test_baseline_annotations_need_no_resolution() {
        let scope: Scope = [DexClass::new("La;")
            .with_annotations(vec!["Ldriver/NoOpt;".to_string()])]
        .into_iter()
        .collect();

        let baseline = ["Ldriver/NoOpt;".to_string()].into_iter().collect();
        init_reachable_classes(&scope, &Config::default(), &baseline);

        assert!(scope
            .class_by_descriptor("La;")
            .unwrap()
            .rstate
            .is_referenced_by_type());
    }

    #[test]
    fn test_empty_apk_dir_skips_package_steps() {
        let scope: Scope = [DexClass::new("La;")
            .with_dmethod(DexMethod::new("m", vec![], Visibility::Public).native())]
        .into_iter()
        .collect();

        // No apk_dir configured; only code-derived seeding runs
        init_reachable_classes(&scope, &Config::default(), &HashSet::new());

        let cls = scope.class_by_descriptor("La;").unwrap();
        assert!(cls.rstate.is_referenced_by_string());
        assert!(!cls.rstate.is_root());
    }
}
