use crate::ir::{KeepReason, Scope};
use crate::resources::{get_manifest_class_info, ComponentTag};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Root a class the manifest names. The manifest references the class
/// textually, so the keep count pins the name; constructors are rooted
/// because the framework instantiates components reflectively.
fn mark_manifest_root(scope: &Scope, classname: &str) {
    let Some(class) = scope.class_by_descriptor(classname) else {
        debug!("Dangling reference from manifest: {}", classname);
        return;
    };
    debug!("manifest: {}", classname);
    class.rstate.set_root(KeepReason::Manifest);
    class.rstate.increment_keep_count();
    for ctor in class.ctors() {
        ctor.rstate.set_root(KeepReason::Manifest);
    }
}

/// Seed reachability from the application manifest.
///
/// Activities (and aliases) are rooted when exported, carrying intent
/// filters, or when their kind is not in the prune set; an unrooted
/// activity still gets its name pinned, since the manifest spells it out
/// and this phase cannot rewrite the manifest. Receivers and services may
/// be started by the system, so they are always rooted, as are providers
/// together with their authority classes.
pub fn analyze_reachable_from_manifest(
    scope: &Scope,
    apk_dir: &Path,
    prune_unexported_components: &HashSet<String>,
) {
    let prune: HashSet<ComponentTag> = prune_unexported_components
        .iter()
        .map(|name| {
            ComponentTag::from_config_name(name).unwrap_or_else(|| {
                panic!("unknown component kind in prune_unexported_components: {name}")
            })
        })
        .collect();

    let manifest_path = apk_dir.join("AndroidManifest.xml");
    let class_info = match get_manifest_class_info(&manifest_path) {
        Ok(info) => info,
        Err(e) => {
            warn!("Skipping manifest seeding: {}", e);
            return;
        }
    };

    for classname in &class_info.application_classes {
        mark_manifest_root(scope, classname);
    }
    for classname in &class_info.instrumentation_classes {
        mark_manifest_root(scope, classname);
    }

    for tag_info in &class_info.component_tags {
        match tag_info.tag {
            ComponentTag::Activity | ComponentTag::ActivityAlias => {
                if tag_info.is_exported
                    || tag_info.has_intent_filters
                    || !prune.contains(&tag_info.tag)
                {
                    mark_manifest_root(scope, &tag_info.classname);
                } else {
                    debug!("{} not exported", tag_info.classname);
                    if let Some(class) = scope.class_by_descriptor(&tag_info.classname) {
                        class.rstate.increment_keep_count();
                        class.rstate.unset_allowobfuscation();
                    }
                }
            }
            ComponentTag::Receiver | ComponentTag::Service => {
                mark_manifest_root(scope, &tag_info.classname);
            }
            ComponentTag::Provider => {
                mark_manifest_root(scope, &tag_info.classname);
                for classname in &tag_info.authority_classes {
                    mark_manifest_root(scope, classname);
                }
            }
        }
    }
}
