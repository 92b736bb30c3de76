use super::resolver::{blacklist_field, blacklist_method};
use crate::ir::{IrCode, IrInstruction, Scope, CONSTRUCTOR_NAME};
use std::collections::HashMap;
use tracing::trace;

const JAVA_LANG_CLASS: &str = "Ljava/lang/Class;";
const ATOMIC_INT_FIELD_UPDATER: &str = "Ljava/util/concurrent/atomic/AtomicIntegerFieldUpdater;";
const ATOMIC_LONG_FIELD_UPDATER: &str = "Ljava/util/concurrent/atomic/AtomicLongFieldUpdater;";
const ATOMIC_REF_FIELD_UPDATER: &str =
    "Ljava/util/concurrent/atomic/AtomicReferenceFieldUpdater;";

/// Action kind for a recognized reflective call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReflectionSite {
    GetField,
    GetDeclaredField,
    GetMethod,
    GetDeclaredMethod,
    GetConstructor,
    GetDeclaredConstructor,
    IntUpdater,
    LongUpdater,
    RefUpdater,
}

/// Callee class and method name to action kind
fn reflection_site(class: &str, method: &str) -> Option<ReflectionSite> {
    use ReflectionSite::*;
    match (class, method) {
        (JAVA_LANG_CLASS, "getField") => Some(GetField),
        (JAVA_LANG_CLASS, "getDeclaredField") => Some(GetDeclaredField),
        (JAVA_LANG_CLASS, "getMethod") => Some(GetMethod),
        (JAVA_LANG_CLASS, "getDeclaredMethod") => Some(GetDeclaredMethod),
        (JAVA_LANG_CLASS, "getConstructor" | "getConstructors") => Some(GetConstructor),
        (JAVA_LANG_CLASS, "getDeclaredConstructor" | "getDeclaredConstructors") => {
            Some(GetDeclaredConstructor)
        }
        (ATOMIC_INT_FIELD_UPDATER, "newUpdater") => Some(IntUpdater),
        (ATOMIC_LONG_FIELD_UPDATER, "newUpdater") => Some(LongUpdater),
        (ATOMIC_REF_FIELD_UPDATER, "newUpdater") => Some(RefUpdater),
        _ => None,
    }
}

/// Abstract value a register may hold at a call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractObject {
    /// A concrete class reference, by descriptor
    Class(String),
    /// A concrete string literal
    Str(String),
    /// An array of class references; `None` slots are unknown
    ClassArray(Vec<Option<String>>),
}

/// Forward constant tracker over a method body
///
/// Built lazily by the scanner on the first recognized call site in a
/// method and dropped when that method's walk completes. Registers are
/// tracked per instruction; anything written by an unmodeled instruction
/// becomes unknown, so imprecision only ever widens.
pub struct ReflectionAnalysis {
    /// Abstract environment of each invoke site's source registers
    envs: HashMap<usize, HashMap<u16, AbstractObject>>,
}

impl ReflectionAnalysis {
    pub fn new(code: &IrCode) -> Self {
        let mut env: HashMap<u16, AbstractObject> = HashMap::new();
        let mut envs = HashMap::new();

        for (idx, insn) in code.insns.iter().enumerate() {
            match insn {
                IrInstruction::ConstString { dest, value } => {
                    env.insert(*dest, AbstractObject::Str(value.clone()));
                }
                IrInstruction::ConstClass { dest, class } => {
                    env.insert(*dest, AbstractObject::Class(class.clone()));
                }
                IrInstruction::Move { dest, src } => match env.get(src).cloned() {
                    Some(value) => {
                        env.insert(*dest, value);
                    }
                    None => {
                        env.remove(dest);
                    }
                },
                IrInstruction::NewArray { dest, length } => {
                    env.insert(*dest, AbstractObject::ClassArray(vec![None; *length]));
                }
                IrInstruction::ArrayPut { array, index, src } => {
                    let value = match env.get(src) {
                        Some(AbstractObject::Class(c)) => Some(c.clone()),
                        _ => None,
                    };
                    if let Some(AbstractObject::ClassArray(slots)) = env.get_mut(array) {
                        if *index < slots.len() {
                            slots[*index] = value;
                        }
                    }
                }
                IrInstruction::Invoke { srcs, .. } => {
                    let snapshot: HashMap<u16, AbstractObject> = srcs
                        .iter()
                        .filter_map(|reg| env.get(reg).map(|v| (*reg, v.clone())))
                        .collect();
                    envs.insert(idx, snapshot);
                }
                IrInstruction::Other => {}
            }
        }

        Self { envs }
    }

    /// Abstract object held in `register` at instruction `insn`
    pub fn get_abstract_object(&self, register: u16, insn: usize) -> Option<&AbstractObject> {
        self.envs.get(&insn)?.get(&register)
    }

    /// Parameter-type list a fully resolved class array in `register`
    /// implies at instruction `insn`; `None` when any slot is unknown
    pub fn get_method_params(&self, register: u16, insn: usize) -> Option<Vec<String>> {
        match self.get_abstract_object(register, insn)? {
            AbstractObject::ClassArray(slots) => {
                slots.iter().cloned().collect::<Option<Vec<String>>>()
            }
            _ => None,
        }
    }
}

/// Scan every method body in scope for reflective lookups and pin the
/// members they resolve to. Imprecise class or name values make the call
/// site a no-op here; coarser seeders (packages, configuration) cover
/// that gap.
pub fn analyze_reflection(scope: &Scope) {
    for class in scope.classes() {
        if class.is_external {
            continue;
        }
        for method in class.all_methods() {
            let Some(code) = &method.code else {
                continue;
            };
            let reflector = format!("{}.{}", class.name, method.name);
            scan_method(scope, &reflector, code);
        }
    }
}

fn scan_method(scope: &Scope, reflector: &str, code: &IrCode) {
    // Building the tracker also interprets the whole body, so wait until
    // a call site actually needs it; one instance serves the whole walk
    // and drops at the end of this method's scan.
    let mut analysis: Option<ReflectionAnalysis> = None;

    for (idx, insn) in code.insns.iter().enumerate() {
        let IrInstruction::Invoke { class, name, srcs } = insn else {
            continue;
        };
        let Some(site) = reflection_site(class, name) else {
            continue;
        };
        let analysis = analysis.get_or_insert_with(|| ReflectionAnalysis::new(code));

        let Some(&class_reg) = srcs.first() else {
            continue;
        };
        let Some(AbstractObject::Class(target)) = analysis.get_abstract_object(class_reg, idx)
        else {
            continue;
        };
        let target = target.clone();

        let member_name = match site {
            ReflectionSite::GetConstructor | ReflectionSite::GetDeclaredConstructor => {
                Some(CONSTRUCTOR_NAME.to_string())
            }
            site => {
                let name_arg = if site == ReflectionSite::RefUpdater { 2 } else { 1 };
                match srcs
                    .get(name_arg)
                    .and_then(|reg| analysis.get_abstract_object(*reg, idx))
                {
                    Some(AbstractObject::Str(s)) => Some(s.clone()),
                    _ => None,
                }
            }
        };
        let Some(member_name) = member_name else {
            continue;
        };

        let params = match site {
            ReflectionSite::GetMethod | ReflectionSite::GetDeclaredMethod => srcs
                .get(2)
                .and_then(|reg| analysis.get_method_params(*reg, idx)),
            ReflectionSite::GetConstructor | ReflectionSite::GetDeclaredConstructor => srcs
                .get(1)
                .and_then(|reg| analysis.get_method_params(*reg, idx)),
            _ => None,
        };

        trace!(
            "reflective lookup in {}: {:?} {} {}",
            reflector,
            site,
            target,
            member_name
        );

        match site {
            ReflectionSite::GetField => {
                blacklist_field(scope, reflector, &target, &member_name, false);
            }
            ReflectionSite::GetDeclaredField => {
                blacklist_field(scope, reflector, &target, &member_name, true);
            }
            ReflectionSite::GetMethod | ReflectionSite::GetConstructor => {
                blacklist_method(
                    scope,
                    reflector,
                    &target,
                    &member_name,
                    params.as_deref(),
                    false,
                );
            }
            ReflectionSite::GetDeclaredMethod | ReflectionSite::GetDeclaredConstructor => {
                blacklist_method(
                    scope,
                    reflector,
                    &target,
                    &member_name,
                    params.as_deref(),
                    true,
                );
            }
            ReflectionSite::IntUpdater
            | ReflectionSite::LongUpdater
            | ReflectionSite::RefUpdater => {
                blacklist_field(scope, reflector, &target, &member_name, true);
            }
        }
    }
}
