use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

/// Why an element was pinned as a root by a seeder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    /// Looked up via a reflective API call
    Reflection,
    /// Named by the application manifest
    Manifest,
    /// Required by the serialization runtime
    Serializable,
}

impl KeepReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeepReason::Reflection => "reflection",
            KeepReason::Manifest => "manifest",
            KeepReason::Serializable => "serializable",
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(KeepReason::Reflection),
            2 => Some(KeepReason::Manifest),
            3 => Some(KeepReason::Serializable),
            _ => None,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            KeepReason::Reflection => 1,
            KeepReason::Manifest => 2,
            KeepReason::Serializable => 3,
        }
    }
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const REF_BY_TYPE: u32 = 1 << 0;
const REF_BY_STRING: u32 = 1 << 1;
const REF_BY_RESOURCE_XML: u32 = 1 << 2;
const IS_SERDE: u32 = 1 << 3;
const NO_OBFUSCATION: u32 = 1 << 4;

/// Per-element reachability flags and keep-reason log
///
/// Attached to every class, method and field in the scope. Seeders write
/// through these operations only; all flag sets are idempotent, and storage
/// is atomic so the parallel passes can mark without locking. Apart from
/// the resource-XML bit (clearable so layout reachability can be
/// recomputed), flags are sticky within a run.
#[derive(Debug, Default)]
pub struct ReferencedState {
    flags: AtomicU32,
    /// First keep reason recorded, as a tag; 0 while unset
    reason: AtomicU8,
    keep_count: AtomicU32,
    /// Methods whose reflection sites pinned this element, for diagnostics
    originators: Mutex<Vec<String>>,
}

impl ReferencedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark as referenced by a type-named root
    pub fn ref_by_type(&self) {
        self.flags.fetch_or(REF_BY_TYPE, Ordering::Relaxed);
    }

    pub fn is_referenced_by_type(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & REF_BY_TYPE != 0
    }

    /// Mark as referenced by a stringly-named root; renaming would break it
    pub fn ref_by_string(&self) {
        self.flags.fetch_or(REF_BY_STRING, Ordering::Relaxed);
    }

    pub fn is_referenced_by_string(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & REF_BY_STRING != 0
    }

    pub fn set_referenced_by_resource_xml(&self) {
        self.flags.fetch_or(REF_BY_RESOURCE_XML, Ordering::Relaxed);
    }

    /// The only flag with clear semantics; layout reachability is recomputable
    pub fn unset_referenced_by_resource_xml(&self) {
        self.flags.fetch_and(!REF_BY_RESOURCE_XML, Ordering::Relaxed);
    }

    pub fn is_referenced_by_resource_xml(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & REF_BY_RESOURCE_XML != 0
    }

    pub fn set_is_serde(&self) {
        self.flags.fetch_or(IS_SERDE, Ordering::Relaxed);
    }

    pub fn is_serde(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & IS_SERDE != 0
    }

    /// Pin as a root. The first recorded reason wins; later calls leave it
    /// unchanged so duplicate marking stays idempotent.
    pub fn set_root(&self, reason: KeepReason) {
        let _ = self
            .reason
            .compare_exchange(0, reason.tag(), Ordering::Relaxed, Ordering::Relaxed);
    }

    /// Pin as a root, recording the reflecting method for diagnostics.
    /// On duplicate calls the originator is appended to the log while the
    /// original reason is kept.
    pub fn set_root_from(&self, reason: KeepReason, originator: &str) {
        self.set_root(reason);
        self.originators
            .lock()
            .expect("originator log poisoned")
            .push(originator.to_string());
    }

    pub fn is_root(&self) -> bool {
        self.reason.load(Ordering::Relaxed) != 0
    }

    pub fn keep_reason(&self) -> Option<KeepReason> {
        KeepReason::from_tag(self.reason.load(Ordering::Relaxed))
    }

    /// Methods recorded by `set_root_from`, in call order
    pub fn originators(&self) -> Vec<String> {
        self.originators
            .lock()
            .expect("originator log poisoned")
            .clone()
    }

    /// Non-zero forbids renaming
    pub fn increment_keep_count(&self) {
        self.keep_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn keep_count(&self) -> u32 {
        self.keep_count.load(Ordering::Relaxed)
    }

    pub fn unset_allowobfuscation(&self) {
        self.flags.fetch_or(NO_OBFUSCATION, Ordering::Relaxed);
    }

    pub fn allows_obfuscation(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & NO_OBFUSCATION == 0
    }
}

/// Diagnostic form: each flag as 0/1, then the keep count
impl fmt::Display for ReferencedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{} {}",
            self.is_referenced_by_type() as u8,
            self.is_referenced_by_string() as u8,
            self.is_referenced_by_resource_xml() as u8,
            self.is_serde() as u8,
            self.is_root() as u8,
            self.allows_obfuscation() as u8,
            self.keep_count()
        )
    }
}
