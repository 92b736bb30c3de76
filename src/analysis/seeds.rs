use crate::ir::{ClassHierarchy, DexClass, KeepReason, Scope};
use crate::resources::get_native_classes;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Framework marker interface for runtime-serializable classes
const SERIALIZABLE_TYPE: &str = "Ljava/io/Serializable;";

/// Mark a class and all its declared members as reachable by string.
/// A stringly-named class can be instantiated by name at runtime, and the
/// same goes for anything it declares, so nothing inside may be renamed.
pub(crate) fn mark_reachable_by_classname(class: &DexClass) {
    class.rstate.ref_by_string();
    for method in class.all_methods() {
        method.rstate.ref_by_string();
    }
    for field in class.all_fields() {
        field.rstate.ref_by_string();
    }
}

/// Walk all code and mark native methods. Native symbols are bound by
/// name, so the method and its declaring class must keep theirs. Each
/// task writes only to the visited class, so the walk is parallel.
pub fn recompute_classes_reachable_from_code(scope: &Scope) {
    scope.as_slice().par_iter().for_each(|class| {
        if class.is_external {
            return;
        }
        for method in class.all_methods() {
            if method.is_native {
                debug!("native_method: {}.{}", class.name, method.name);
                class.rstate.ref_by_string();
                method.rstate.ref_by_string();
            }
        }
    });
}

/// Mark classes whose names appear as strings inside the package's
/// native libraries
pub fn mark_native_library_classes(scope: &Scope, apk_dir: &Path) {
    for classname in get_native_classes(apk_dir) {
        let Some(class) = scope.internal_class(&classname) else {
            continue;
        };
        debug!("native_lib: {}", classname);
        mark_reachable_by_classname(class);
    }
}

/// True iff this class or any of its superclasses matches a reflected
/// package prefix. Memoized per descriptor, so the scope is walked once
/// and each superclass chain is resolved at most once.
fn in_reflected_pkg(
    scope: &Scope,
    prefixes: &[String],
    memo: &mut HashMap<String, bool>,
    descriptor: &str,
) -> bool {
    if let Some(&cached) = memo.get(descriptor) {
        return cached;
    }
    // Seed the entry first so a malformed cyclic chain terminates
    memo.insert(descriptor.to_string(), false);

    let result = match scope.internal_class(descriptor) {
        None => false,
        Some(class) => {
            prefixes.iter().any(|p| class.name.starts_with(p.as_str()))
                || class
                    .super_class
                    .as_deref()
                    .map(|sup| in_reflected_pkg(scope, prefixes, memo, sup))
                    .unwrap_or(false)
        }
    };
    memo.insert(descriptor.to_string(), result);
    result
}

/// Mark every class under a configured package prefix, and every class
/// extending one, as reachable by string. The config cannot distinguish
/// by-type from by-string uses, so the conservative sense applies.
pub fn mark_reflected_packages(scope: &Scope, package_prefixes: &[String]) {
    if package_prefixes.is_empty() {
        return;
    }

    let mut memo = HashMap::new();
    for class in scope.classes() {
        if class.is_external {
            continue;
        }
        if in_reflected_pkg(scope, package_prefixes, &mut memo, &class.name) {
            debug!("reflected_package: {}", class.name);
            mark_reachable_by_classname(class);
        }
    }
}

/// Mark any direct or virtual method whose simple name is configured
pub fn keep_methods(scope: &Scope, method_names: &[String]) {
    let keep: HashSet<&str> = method_names.iter().map(String::as_str).collect();
    if keep.is_empty() {
        return;
    }

    for class in scope.classes() {
        if class.is_external {
            continue;
        }
        for method in class.all_methods() {
            if keep.contains(method.name.as_str()) {
                method.rstate.ref_by_string();
            }
        }
    }
}

/// Apply the free-form `keep_class_members` entries: an entry naming this
/// class followed by one of its static-field names pins both.
///
/// Matching is by plain substring containment on both the class and the
/// field name, as the configuration format has always been interpreted.
/// Short names can therefore match inside unrelated entries; tightening
/// this would silently change which members survive, so the loose match
/// is kept deliberately.
pub fn keep_class_members(scope: &Scope, entries: &[String]) {
    for class in scope.classes() {
        if class.is_external {
            continue;
        }
        for entry in entries {
            if let Some(pos) = entry.find(&class.name) {
                let remainder = &entry[pos + class.name.len()..];
                for field in &class.sfields {
                    if remainder.contains(&field.name) {
                        field.rstate.ref_by_type();
                        class.rstate.ref_by_type();
                    }
                }
                break;
            }
        }
    }
}

/// Root the zero-argument constructors of non-serializable superclasses
/// of serializable classes. Deserialization instantiates the first
/// non-serializable ancestor through that constructor without any
/// visible call in code.
pub fn analyze_serializable(scope: &Scope) {
    let hierarchy = ClassHierarchy::build(scope);
    let implementors = hierarchy.get_all_implementors(SERIALIZABLE_TYPE);

    for child in &implementors {
        let Some(child_class) = scope.class_by_descriptor(child) else {
            continue;
        };
        let Some(super_name) = child_class.super_class.as_deref() else {
            continue;
        };
        let Some(super_class) = scope.class_by_descriptor(super_name) else {
            continue;
        };
        if super_class.is_external || implementors.contains(super_name) {
            continue;
        }
        for ctor in super_class.ctors() {
            if ctor.params.is_empty() {
                debug!("serializable super ctor: {}", super_class.name);
                ctor.rstate.set_root(KeepReason::Serializable);
            }
        }
    }
}

/// Flag every transitive subclass of a configured serializer base type
/// as serde so downstream passes treat the family together
pub fn initialize_reachable_for_json_serde(scope: &Scope, supercls_names: &[String]) {
    if supercls_names.is_empty() {
        return;
    }

    let hierarchy = ClassHierarchy::build(scope);
    for supercls in supercls_names {
        for child in hierarchy.get_all_children(supercls) {
            if let Some(class) = scope.internal_class(&child) {
                class.rstate.set_is_serde();
            }
        }
    }
}
