use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Minimum printable run worth considering; shorter runs are almost
/// always instruction bytes that happen to be ASCII
const MIN_STRING_LEN: usize = 6;

/// Scan the ELF libraries under `<apk_dir>/lib/*/*.so` for embedded
/// strings shaped like class names (JNI `com/example/Foo` or dotted
/// `com.example.Foo` form) and return them as type descriptors, deduped
/// and sorted. Unreadable libraries are logged and skipped.
pub fn get_native_classes(apk_dir: &Path) -> Vec<String> {
    let lib_dir = apk_dir.join("lib");
    if !lib_dir.is_dir() {
        return Vec::new();
    }

    // Two or more identifier segments joined by a single separator style
    let class_shape =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*([/.][A-Za-z_$][A-Za-z0-9_$]*)+$")
            .expect("class-name pattern is valid");

    let mut classnames = BTreeSet::new();

    for entry in WalkDir::new(&lib_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|e| e.to_str()) != Some("so")
        {
            continue;
        }

        let bytes = match std::fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Skipping unreadable library {}: {}", entry.path().display(), e);
                continue;
            }
        };

        for candidate in printable_runs(&bytes) {
            if class_shape.is_match(candidate) {
                classnames.insert(format!("L{};", candidate.replace('.', "/")));
            }
        }
    }

    debug!("Native libraries reference {} classnames", classnames.len());
    classnames.into_iter().collect()
}

/// Printable ASCII runs of at least `MIN_STRING_LEN` bytes
fn printable_runs(bytes: &[u8]) -> impl Iterator<Item = &str> {
    bytes
        .split(|&b| !(0x20..0x7f).contains(&b))
        .filter(|run| run.len() >= MIN_STRING_LEN)
        .filter_map(|run| std::str::from_utf8(run).ok())
}
