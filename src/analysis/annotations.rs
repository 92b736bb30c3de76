use crate::ir::Scope;
use std::collections::HashSet;
use tracing::debug;

fn annotated(annotations: &[String], keep: &HashSet<String>) -> bool {
    annotations.iter().any(|a| keep.contains(a))
}

/// Mark classes and members carrying a configured annotation as
/// type-named roots. External classes are never touched.
pub fn keep_annotated_classes(scope: &Scope, keep_annotations: &HashSet<String>) {
    if keep_annotations.is_empty() {
        return;
    }

    for class in scope.classes() {
        if class.is_external {
            continue;
        }
        if annotated(&class.annotations, keep_annotations) {
            debug!("keep annotation on class {}", class.name);
            class.rstate.ref_by_type();
        }
        for method in class.all_methods() {
            if annotated(&method.annotations, keep_annotations) {
                method.rstate.ref_by_type();
            }
        }
        for field in class.all_fields() {
            if annotated(&field.annotations, keep_annotations) {
                field.rstate.ref_by_type();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DexClass, DexField, DexMethod, Visibility};

    const KEEP: &str = "Lcom/example/Keep;";

    fn keep_set() -> HashSet<String> {
        [KEEP.to_string()].into_iter().collect()
    }

    #[test]
    fn test_annotated_class_and_members_marked() {
        let scope: Scope = [DexClass::new("La;")
            .with_annotations(vec![KEEP.to_string()])
            .with_vmethod(
                DexMethod::new("m", vec![], Visibility::Public)
                    .with_annotations(vec![KEEP.to_string()]),
            )
            .with_ifield(DexField::new("plain", Visibility::Public))]
        .into_iter()
        .collect();

        keep_annotated_classes(&scope, &keep_set());

        let cls = scope.class_by_descriptor("La;").unwrap();
        assert!(cls.rstate.is_referenced_by_type());
        assert!(cls.vmethods[0].rstate.is_referenced_by_type());
        assert!(!cls.ifields[0].rstate.is_referenced_by_type());
    }

    #[test]
    fn test_external_class_untouched() {
        let scope: Scope = [DexClass::new("Lext;")
            .external()
            .with_annotations(vec![KEEP.to_string()])]
        .into_iter()
        .collect();

        keep_annotated_classes(&scope, &keep_set());
        assert!(!scope
            .class_by_descriptor("Lext;")
            .unwrap()
            .rstate
            .is_referenced_by_type());
    }
}
