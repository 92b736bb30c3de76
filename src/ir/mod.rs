// IR surface the seeder reads and marks; loading is the loader's job

mod class;
mod code;
mod hierarchy;
mod rstate;
mod scope;

pub use class::{DexClass, DexField, DexMethod, Visibility, CONSTRUCTOR_NAME};
pub use code::{IrCode, IrInstruction};
pub use hierarchy::ClassHierarchy;
pub use rstate::{KeepReason, ReferencedState};
pub use scope::Scope;
