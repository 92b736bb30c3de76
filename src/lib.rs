//! dexkeep - Reachability root seeding for an Android bytecode shrinker
//!
//! Before a shrinker may rename, inline or delete anything, every program
//! element reachable through channels the static type system cannot see
//! must be pinned. This crate is that seeding phase:
//!
//! 1. **Annotations** - elements carrying configured keep annotations
//! 2. **Configured keeps** - member, method and package keep lists
//! 3. **Manifest** - components the application manifest names
//! 4. **Layouts** - views, fragments and click handlers bound in XML
//! 5. **Native libraries** - classnames embedded in ELF string tables
//! 6. **Reflection** - lookups resolved by a constant tracker over the IR
//! 7. **Serialization** - serializable chains and serde families
//!
//! Seeders write only through the per-element [`ir::ReferencedState`];
//! the phase is one-shot, and reachability propagation is a later pass.

pub mod analysis;
pub mod config;
pub mod ir;
pub mod resources;

pub use analysis::{init_reachable_classes, recompute_reachable_from_xml_layouts};
pub use config::Config;
pub use ir::{
    ClassHierarchy, DexClass, DexField, DexMethod, IrCode, IrInstruction, KeepReason,
    ReferencedState, Scope, Visibility,
};
pub use resources::{
    collect_layout_classes_and_attributes, get_manifest_class_info, get_native_classes,
    ComponentTag, ComponentTagInfo, ManifestClassInfo, ONCLICK_ATTRIBUTE,
};
