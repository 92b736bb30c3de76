use super::{dotted_to_descriptor, ResourceError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Component kinds the manifest can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentTag {
    Activity,
    ActivityAlias,
    Receiver,
    Service,
    Provider,
}

impl ComponentTag {
    /// Parse a configuration-file component name
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name {
            "activity" => Some(ComponentTag::Activity),
            "activity-alias" => Some(ComponentTag::ActivityAlias),
            "receiver" => Some(ComponentTag::Receiver),
            "service" => Some(ComponentTag::Service),
            "provider" => Some(ComponentTag::Provider),
            _ => None,
        }
    }

    fn from_element_name(name: &str) -> Option<Self> {
        Self::from_config_name(name)
    }
}

/// One component declaration extracted from the manifest
#[derive(Debug, Clone, Serialize)]
pub struct ComponentTagInfo {
    pub tag: ComponentTag,
    /// Referenced class, as a type descriptor
    pub classname: String,
    pub is_exported: bool,
    pub has_intent_filters: bool,
    /// Provider-only: classes named by `android:authorities`
    pub authority_classes: Vec<String>,
}

/// Class references the manifest pins by name
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManifestClassInfo {
    /// The application subclass and its backup agent, if declared
    pub application_classes: Vec<String>,
    pub instrumentation_classes: Vec<String>,
    pub component_tags: Vec<ComponentTagInfo>,
}

/// Parse an AndroidManifest.xml and extract every class the manifest
/// references by name, together with the component attributes the seeding
/// policy needs. Malformed trailing content yields whatever was collected
/// up to that point.
pub fn get_manifest_class_info(path: &Path) -> Result<ManifestClassInfo, ResourceError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ResourceError::io(path, e))?;

    let mut info = ManifestClassInfo::default();
    let mut reader = Reader::from_str(&contents);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut package: Option<String> = None;
    // The component element currently open, so nested <intent-filter>
    // tags land on the right record
    let mut current: Option<ComponentTagInfo> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag_name.as_str() {
                    "manifest" => package = attribute(e, "package"),
                    "intent-filter" => {
                        if let Some(component) = current.as_mut() {
                            component.has_intent_filters = true;
                        }
                    }
                    _ => {
                        collect_non_component(e, &tag_name, &package, &mut info);
                        if let Some(component) = read_component(e, &tag_name, &package) {
                            current = Some(component);
                        }
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                collect_non_component(e, &tag_name, &package, &mut info);
                // A self-closing component cannot carry intent filters
                if let Some(component) = read_component(e, &tag_name, &package) {
                    info.component_tags.push(component);
                }
            }
            Ok(Event::End(ref e)) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if ComponentTag::from_element_name(&tag_name).is_some() {
                    if let Some(component) = current.take() {
                        info.component_tags.push(component);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Error parsing manifest {}: {:?}", path.display(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    debug!(
        "Parsed manifest {}: {} components, {} application classes",
        path.display(),
        info.component_tags.len(),
        info.application_classes.len()
    );

    Ok(info)
}

fn collect_non_component(
    e: &BytesStart<'_>,
    tag_name: &str,
    package: &Option<String>,
    info: &mut ManifestClassInfo,
) {
    match tag_name {
        "application" => {
            if let Some(name) = class_attribute(e, "name", package) {
                info.application_classes.push(name);
            }
            if let Some(agent) = class_attribute(e, "backupAgent", package) {
                info.application_classes.push(agent);
            }
        }
        "instrumentation" => {
            if let Some(name) = class_attribute(e, "name", package) {
                info.instrumentation_classes.push(name);
            }
        }
        _ => {}
    }
}

fn read_component(
    e: &BytesStart<'_>,
    tag_name: &str,
    package: &Option<String>,
) -> Option<ComponentTagInfo> {
    let tag = ComponentTag::from_element_name(tag_name)?;

    // An alias points at its target activity; the alias name itself is
    // not a class
    let name_attr = match tag {
        ComponentTag::ActivityAlias => "targetActivity",
        _ => "name",
    };
    let classname = class_attribute(e, name_attr, package)?;

    let is_exported = attribute(e, "exported").as_deref() == Some("true");

    let mut authority_classes = Vec::new();
    if tag == ComponentTag::Provider {
        if let Some(authorities) = attribute(e, "authorities") {
            for authority in authorities.split(';').filter(|a| !a.is_empty()) {
                authority_classes.push(dotted_to_descriptor(authority));
            }
        }
    }

    Some(ComponentTagInfo {
        tag,
        classname,
        is_exported,
        has_intent_filters: false,
        authority_classes,
    })
}

/// Fetch an attribute by local name, so `android:name` and `name` both match
fn attribute(e: &BytesStart<'_>, local_name: &str) -> Option<String> {
    for attr in e.attributes().filter_map(|a| a.ok()) {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if key == local_name || key.ends_with(&format!(":{}", local_name)) {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}

/// Fetch a class-valued attribute and normalize it to a descriptor
fn class_attribute(
    e: &BytesStart<'_>,
    local_name: &str,
    package: &Option<String>,
) -> Option<String> {
    let value = attribute(e, local_name)?;
    Some(dotted_to_descriptor(&resolve_class_name(&value, package)))
}

/// Resolve a class name, handling relative names like ".MainActivity"
fn resolve_class_name(name: &str, package: &Option<String>) -> String {
    if let Some(stripped) = name.strip_prefix('.') {
        match package {
            Some(pkg) => format!("{}.{}", pkg, stripped),
            None => stripped.to_string(),
        }
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(manifest: &str) -> ManifestClassInfo {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(manifest.as_bytes()).unwrap();
        get_manifest_class_info(file.path()).unwrap()
    }

    #[test]
    fn test_parse_components() {
        let info = parse(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <manifest xmlns:android="http://schemas.android.com/apk/res/android"
                package="com.example.app">
                <application android:name=".MyApplication">
                    <activity android:name=".MainActivity" android:exported="true" />
                    <activity android:name=".HiddenActivity">
                        <intent-filter>
                            <action android:name="android.intent.action.VIEW" />
                        </intent-filter>
                    </activity>
                    <service android:name=".MyService" />
                </application>
            </manifest>"#,
        );

        assert_eq!(
            info.application_classes,
            vec!["Lcom/example/app/MyApplication;"]
        );
        assert_eq!(info.component_tags.len(), 3);

        let main = &info.component_tags[0];
        assert_eq!(main.tag, ComponentTag::Activity);
        assert_eq!(main.classname, "Lcom/example/app/MainActivity;");
        assert!(main.is_exported);
        assert!(!main.has_intent_filters);

        let hidden = &info.component_tags[1];
        assert_eq!(hidden.classname, "Lcom/example/app/HiddenActivity;");
        assert!(!hidden.is_exported);
        assert!(hidden.has_intent_filters);

        let service = &info.component_tags[2];
        assert_eq!(service.tag, ComponentTag::Service);
    }

    #[test]
    fn test_provider_authorities() {
        let info = parse(
            r#"<manifest package="com.example.x">
                <application>
                    <provider android:name="com.example.x.Foo"
                        android:authorities="com.example.x.Foo;com.example.y.Bar" />
                </application>
            </manifest>"#,
        );

        assert_eq!(info.component_tags.len(), 1);
        let provider = &info.component_tags[0];
        assert_eq!(provider.tag, ComponentTag::Provider);
        assert_eq!(provider.classname, "Lcom/example/x/Foo;");
        assert_eq!(
            provider.authority_classes,
            vec!["Lcom/example/x/Foo;", "Lcom/example/y/Bar;"]
        );
    }

    #[test]
    fn test_activity_alias_targets_activity() {
        let info = parse(
            r#"<manifest package="com.example">
                <application>
                    <activity-alias android:name=".Alias"
                        android:targetActivity=".Real" />
                </application>
            </manifest>"#,
        );

        assert_eq!(info.component_tags.len(), 1);
        assert_eq!(info.component_tags[0].tag, ComponentTag::ActivityAlias);
        assert_eq!(info.component_tags[0].classname, "Lcom/example/Real;");
    }

    #[test]
    fn test_from_config_name() {
        assert_eq!(
            ComponentTag::from_config_name("activity"),
            Some(ComponentTag::Activity)
        );
        assert_eq!(
            ComponentTag::from_config_name("activity-alias"),
            Some(ComponentTag::ActivityAlias)
        );
        assert_eq!(ComponentTag::from_config_name("widget"), None);
    }
}
