use crate::ir::{KeepReason, Scope};
use std::collections::HashSet;
use tracing::trace;

/// Pin every field of `type_descriptor` named `name` that a reflective
/// lookup could resolve to.
///
/// `declared` mirrors the runtime API split: a declared lookup sees only
/// this class but any visibility; a non-declared lookup sees public
/// members and walks the superclass chain. External classes stop the walk.
pub fn blacklist_field(
    scope: &Scope,
    reflecting_method: &str,
    type_descriptor: &str,
    name: &str,
    declared: bool,
) {
    let mut visited = HashSet::new();
    let mut cursor = Some(type_descriptor.to_string());

    while let Some(descriptor) = cursor.take() {
        // Malformed cyclic superclass chains terminate at a revisit
        if !visited.insert(descriptor.clone()) {
            break;
        }
        let Some(class) = scope.class_by_descriptor(&descriptor) else {
            break;
        };
        if class.is_external {
            break;
        }

        for field in class.all_fields() {
            if field.name != name {
                continue;
            }
            if !field.visibility.is_public() && !declared {
                continue;
            }
            trace!("reflection blacklist: {}.{}", class.name, field.name);
            field
                .rstate
                .set_root_from(KeepReason::Reflection, reflecting_method);
        }

        if declared {
            break;
        }
        cursor = class.super_class.clone();
    }
}

/// Method counterpart of [`blacklist_field`]. When `params` is supplied a
/// match additionally requires the parameter type list to be equal
/// element-wise.
pub fn blacklist_method(
    scope: &Scope,
    reflecting_method: &str,
    type_descriptor: &str,
    name: &str,
    params: Option<&[String]>,
    declared: bool,
) {
    let mut visited = HashSet::new();
    let mut cursor = Some(type_descriptor.to_string());

    while let Some(descriptor) = cursor.take() {
        if !visited.insert(descriptor.clone()) {
            break;
        }
        let Some(class) = scope.class_by_descriptor(&descriptor) else {
            break;
        };
        if class.is_external {
            break;
        }

        for method in class.all_methods() {
            if method.name != name {
                continue;
            }
            if let Some(params) = params {
                if method.params != params {
                    continue;
                }
            }
            if !method.visibility.is_public() && !declared {
                continue;
            }
            trace!("reflection blacklist: {}.{}", class.name, method.name);
            method
                .rstate
                .set_root_from(KeepReason::Reflection, reflecting_method);
        }

        if declared {
            break;
        }
        cursor = class.super_class.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DexClass, DexField, DexMethod, Visibility};

    fn scope() -> Scope {
        [
            DexClass::new("La;")
                .with_ifield(DexField::new("x", Visibility::Public))
                .with_ifield(DexField::new("y", Visibility::Private))
                .with_vmethod(DexMethod::new(
                    "go",
                    vec!["Ljava/lang/String;".to_string()],
                    Visibility::Public,
                )),
            DexClass::new("Lb;")
                .extending("La;")
                .with_sfield(DexField::new("z", Visibility::Private)),
            DexClass::new("Lext;").external(),
        ]
        .into_iter()
        .collect()
    }

    fn field<'s>(scope: &'s Scope, class: &str, name: &str) -> &'s DexField {
        scope
            .class_by_descriptor(class)
            .unwrap()
            .all_fields()
            .find(|f| f.name == name)
            .unwrap()
    }

    #[test]
    fn test_inherited_public_field_is_rooted() {
        let scope = scope();
        blacklist_field(&scope, "Lcaller;.m", "Lb;", "x", false);

        let x = field(&scope, "La;", "x");
        assert_eq!(x.rstate.keep_reason(), Some(KeepReason::Reflection));
        assert_eq!(x.rstate.originators(), vec!["Lcaller;.m"]);
    }

    #[test]
    fn test_non_declared_lookup_skips_private() {
        let scope = scope();
        blacklist_field(&scope, "Lcaller;.m", "La;", "y", false);
        assert!(!field(&scope, "La;", "y").rstate.is_root());
    }

    #[test]
    fn test_declared_lookup_sees_private_but_not_supers() {
        let scope = scope();
        blacklist_field(&scope, "Lcaller;.m", "La;", "y", true);
        assert!(field(&scope, "La;", "y").rstate.is_root());

        // declared lookups never walk up
        blacklist_field(&scope, "Lcaller;.m", "Lb;", "x", true);
        assert!(!field(&scope, "La;", "x").rstate.is_root());
    }

    #[test]
    fn test_params_must_match_elementwise() {
        let scope = scope();
        let wrong = vec!["Ljava/lang/Object;".to_string()];
        blacklist_method(&scope, "Lcaller;.m", "La;", "go", Some(&wrong), false);
        let go = scope
            .class_by_descriptor("La;")
            .unwrap()
            .all_methods()
            .find(|m| m.name == "go")
            .unwrap();
        assert!(!go.rstate.is_root());

        let right = vec!["Ljava/lang/String;".to_string()];
        blacklist_method(&scope, "Lcaller;.m", "La;", "go", Some(&right), false);
        assert!(go.rstate.is_root());
    }

    #[test]
    fn test_external_class_is_untouched() {
        let scope = scope();
        blacklist_field(&scope, "Lcaller;.m", "Lext;", "x", false);
        // No panic, nothing marked anywhere
        for class in scope.classes() {
            for f in class.all_fields() {
                assert!(!f.rstate.is_root());
            }
        }
    }

    #[test]
    fn test_cyclic_super_chain_terminates() {
        let scope: Scope = [
            DexClass::new("La;")
                .extending("Lb;")
                .with_ifield(DexField::new("x", Visibility::Public)),
            DexClass::new("Lb;").extending("La;"),
        ]
        .into_iter()
        .collect();

        blacklist_field(&scope, "Lcaller;.m", "Lb;", "x", false);
        assert!(field(&scope, "La;", "x").rstate.is_root());
    }
}
