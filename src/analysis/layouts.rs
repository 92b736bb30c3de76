use crate::ir::{ClassHierarchy, DexMethod, Scope};
use crate::resources::{collect_layout_classes_and_attributes, ONCLICK_ATTRIBUTE};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Framework base type hosting UI handler methods
const UI_CONTEXT_TYPE: &str = "Landroid/content/Context;";
/// Parameter type a handler method must accept
const VIEW_TYPE: &str = "Landroid/view/View;";

/// Mark a class named in a layout. Inflation instantiates the class
/// reflectively, so its constructors are marked too.
fn mark_reachable_by_xml(scope: &Scope, classname: &str) {
    let Some(class) = scope.class_by_descriptor(classname) else {
        return;
    };
    class.rstate.set_referenced_by_resource_xml();
    for ctor in class.ctors() {
        ctor.rstate.set_referenced_by_resource_xml();
    }
}

/// Handler candidates take exactly one View argument and carry a name
/// bound in some layout
fn matches_onclick_method(method: &DexMethod, names_to_keep: &BTreeSet<String>) -> bool {
    method.params.len() == 1
        && method.params[0] == VIEW_TYPE
        && names_to_keep.contains(&method.name)
}

/// Mark candidate methods that could be invoked via a handler attribute.
/// Only virtual methods on non-external subclasses of the UI context type
/// qualify; the framework dispatches the call reflectively on the
/// inflating context.
fn mark_onclick_attributes_reachable(scope: &Scope, onclick_attribute_values: &BTreeSet<String>) {
    if onclick_attribute_values.is_empty() {
        return;
    }

    let hierarchy = ClassHierarchy::build(scope);
    for child in hierarchy.get_all_children(UI_CONTEXT_TYPE) {
        let Some(class) = scope.internal_class(&child) else {
            continue;
        };
        for method in &class.vmethods {
            if matches_onclick_method(method, onclick_attribute_values) {
                debug!(
                    "Keeping vmethod {}.{} due to onClick attribute in XML",
                    class.name, method.name
                );
                method.rstate.set_referenced_by_resource_xml();
            }
        }
    }
}

/// Seed reachability from resource XML layouts: classes used as element
/// tags (views, fragments) with their constructors, then candidate
/// handler methods named by `onClick` bindings.
pub fn analyze_reachable_from_xml_layouts(scope: &Scope, apk_dir: &Path) {
    let attrs_of_interest: HashSet<String> =
        [ONCLICK_ATTRIBUTE.to_string()].into_iter().collect();

    let (layout_classes, attribute_values) =
        match collect_layout_classes_and_attributes(apk_dir, &attrs_of_interest) {
            Ok(collected) => collected,
            Err(e) => {
                warn!("Skipping layout seeding: {}", e);
                return;
            }
        };

    for classname in &layout_classes {
        debug!("xml_layout: {}", classname);
        mark_reachable_by_xml(scope, classname);
    }

    let onclick_values: BTreeSet<String> = attribute_values
        .get(ONCLICK_ATTRIBUTE)
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    mark_onclick_attributes_reachable(scope, &onclick_values);
}

/// Clear every resource-XML flag in the scope, then re-run the layout
/// seeder. This is the only flag with clear semantics, so layout
/// reachability can be refreshed after passes invalidate it. The reset
/// only touches flags owned by the visited class, so it runs in parallel.
pub fn recompute_reachable_from_xml_layouts(scope: &Scope, apk_dir: &Path) {
    scope.as_slice().par_iter().for_each(|class| {
        class.rstate.unset_referenced_by_resource_xml();
        for method in class.all_methods() {
            method.rstate.unset_referenced_by_resource_xml();
        }
        for field in class.all_fields() {
            field.rstate.unset_referenced_by_resource_xml();
        }
    });

    analyze_reachable_from_xml_layouts(scope, apk_dir);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DexClass, Visibility};
    use std::fs;

    fn write_layout(root: &Path, contents: &str) {
        let layout_dir = root.join("res/layout");
        fs::create_dir_all(&layout_dir).unwrap();
        fs::write(layout_dir.join("main.xml"), contents).unwrap();
    }

    fn handler_scope() -> Scope {
        [
            DexClass::new(UI_CONTEXT_TYPE).external(),
            DexClass::new("Lcom/example/MainActivity;")
                .extending(UI_CONTEXT_TYPE)
                .with_vmethod(DexMethod::new(
                    "doThing",
                    vec![VIEW_TYPE.to_string()],
                    Visibility::Public,
                ))
                .with_vmethod(DexMethod::new(
                    "doThing",
                    vec!["Ljava/lang/String;".to_string()],
                    Visibility::Public,
                )),
            DexClass::new("Lcom/example/CustomView;").with_dmethod(DexMethod::constructor()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_layout_class_and_ctor_marked() {
        let scope = handler_scope();
        let dir = tempfile::tempdir().unwrap();
        write_layout(
            dir.path(),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                <com.example.CustomView android:layout_width="match_parent" />
            </LinearLayout>"#,
        );

        analyze_reachable_from_xml_layouts(&scope, dir.path());

        let view = scope.class_by_descriptor("Lcom/example/CustomView;").unwrap();
        assert!(view.rstate.is_referenced_by_resource_xml());
        assert!(view
            .ctors()
            .next()
            .unwrap()
            .rstate
            .is_referenced_by_resource_xml());
    }

    #[test]
    fn test_external_layout_class_is_still_marked() {
        // Framework widgets loaded as external can be named in layouts;
        // they are in scope, so the mark applies to them and their ctors
        let scope: Scope = [DexClass::new("Landroid/widget/ExtView;")
            .external()
            .with_dmethod(DexMethod::constructor())]
        .into_iter()
        .collect();
        let dir = tempfile::tempdir().unwrap();
        write_layout(
            dir.path(),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                <android.widget.ExtView android:layout_width="match_parent" />
            </LinearLayout>"#,
        );

        analyze_reachable_from_xml_layouts(&scope, dir.path());

        let ext = scope.class_by_descriptor("Landroid/widget/ExtView;").unwrap();
        assert!(ext.rstate.is_referenced_by_resource_xml());
        assert!(ext
            .ctors()
            .next()
            .unwrap()
            .rstate
            .is_referenced_by_resource_xml());
    }

    #[test]
    fn test_onclick_marks_only_view_overload() {
        let scope = handler_scope();
        let dir = tempfile::tempdir().unwrap();
        write_layout(
            dir.path(),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                <Button android:onClick="doThing" />
            </LinearLayout>"#,
        );

        analyze_reachable_from_xml_layouts(&scope, dir.path());

        let activity = scope
            .class_by_descriptor("Lcom/example/MainActivity;")
            .unwrap();
        let by_params: Vec<bool> = activity
            .vmethods
            .iter()
            .map(|m| m.rstate.is_referenced_by_resource_xml())
            .collect();
        assert_eq!(by_params, vec![true, false]);
    }

    #[test]
    fn test_recompute_resets_then_reseeds() {
        let scope = handler_scope();
        let dir = tempfile::tempdir().unwrap();
        write_layout(
            dir.path(),
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android">
                <com.example.CustomView android:layout_width="match_parent" />
            </LinearLayout>"#,
        );

        // Stale mark on a class the layouts no longer reference
        let activity = scope
            .class_by_descriptor("Lcom/example/MainActivity;")
            .unwrap();
        activity.rstate.set_referenced_by_resource_xml();
        // An unrelated sticky flag must survive the reset
        activity.rstate.ref_by_string();

        recompute_reachable_from_xml_layouts(&scope, dir.path());

        assert!(!activity.rstate.is_referenced_by_resource_xml());
        assert!(activity.rstate.is_referenced_by_string());
        assert!(scope
            .class_by_descriptor("Lcom/example/CustomView;")
            .unwrap()
            .rstate
            .is_referenced_by_resource_xml());
    }
}
