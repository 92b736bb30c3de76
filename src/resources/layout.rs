use super::{dotted_to_descriptor, ResourceError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Walk every layout XML under `<apk_dir>/res/layout*` and collect
///
/// 1. the set of classes referenced as element tags (custom views,
///    fragments, `<view class=…>` forms), as type descriptors, and
/// 2. for each attribute local-name in `attrs_of_interest`, the multiset
///    of literal values bound to it across all layouts.
///
/// A missing resource tree yields empty results; unreadable or malformed
/// files are logged and skipped.
pub fn collect_layout_classes_and_attributes(
    apk_dir: &Path,
    attrs_of_interest: &HashSet<String>,
) -> Result<(HashSet<String>, HashMap<String, Vec<String>>), ResourceError> {
    let mut layout_classes = HashSet::new();
    let mut attribute_values: HashMap<String, Vec<String>> = HashMap::new();

    let res_dir = apk_dir.join("res");
    if !res_dir.is_dir() {
        return Ok((layout_classes, attribute_values));
    }

    for entry in WalkDir::new(&res_dir)
        .min_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let in_layout_dir = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("layout"))
            .unwrap_or(false);
        if !in_layout_dir || path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => parse_layout(
                path,
                &contents,
                attrs_of_interest,
                &mut layout_classes,
                &mut attribute_values,
            ),
            Err(e) => debug!("Skipping unreadable layout {}: {}", path.display(), e),
        }
    }

    debug!(
        "Collected {} layout classes, {} tracked attributes",
        layout_classes.len(),
        attribute_values.len()
    );

    Ok((layout_classes, attribute_values))
}

fn parse_layout(
    path: &Path,
    contents: &str,
    attrs_of_interest: &HashSet<String>,
    layout_classes: &mut HashSet<String>,
    attribute_values: &mut HashMap<String, Vec<String>>,
) {
    let mut reader = Reader::from_str(contents);
    reader.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                // Dotted element tags name custom view classes directly
                if tag_name.contains('.') {
                    layout_classes.insert(dotted_to_descriptor(&tag_name));
                }

                // <view class="com.example.CustomView">
                if tag_name == "view" || tag_name == "View" {
                    if let Some(value) = attribute_value(e, "class") {
                        layout_classes.insert(dotted_to_descriptor(&value));
                    }
                }

                // <fragment android:name="com.example.MyFragment">
                if tag_name == "fragment" {
                    for attr_name in ["name", "class"] {
                        if let Some(value) = attribute_value(e, attr_name) {
                            if value.contains('.') {
                                layout_classes.insert(dotted_to_descriptor(&value));
                            }
                        }
                    }
                }

                // Tracked attributes, e.g. android:onClick="doThing"
                for attr in e.attributes().filter_map(|a| a.ok()) {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                    let local = key.rsplit(':').next().unwrap_or(&key);
                    if attrs_of_interest.contains(local) {
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        // Resource and theme references are not literals
                        if !value.is_empty() && !value.starts_with('@') && !value.starts_with('?') {
                            attribute_values
                                .entry(local.to_string())
                                .or_default()
                                .push(value);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Error parsing layout {}: {:?}", path.display(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
}

fn attribute_value(e: &BytesStart<'_>, local_name: &str) -> Option<String> {
    for attr in e.attributes().filter_map(|a| a.ok()) {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if key == local_name || key.ends_with(&format!(":{}", local_name)) {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}
