use super::code::IrCode;
use super::rstate::ReferencedState;

/// Reserved method name for constructors
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Member visibility as the runtime reflection API distinguishes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

impl Visibility {
    /// Non-declared reflective lookups only see public members
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// A field declaration
#[derive(Debug, Default)]
pub struct DexField {
    /// Simple name
    pub name: String,
    pub visibility: Visibility,
    /// Annotation type descriptors declared on this field
    pub annotations: Vec<String>,
    pub rstate: ReferencedState,
}

impl DexField {
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            visibility,
            ..Self::default()
        }
    }

    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// A method declaration, direct or virtual
#[derive(Debug, Default)]
pub struct DexMethod {
    /// Simple name; constructors are named `<init>`
    pub name: String,
    /// Parameter type descriptors, in order
    pub params: Vec<String>,
    pub visibility: Visibility,
    /// Native access flag; the symbol is resolved by name at runtime
    pub is_native: bool,
    /// Annotation type descriptors declared on this method
    pub annotations: Vec<String>,
    /// Instruction body; absent for abstract and native methods
    pub code: Option<IrCode>,
    pub rstate: ReferencedState,
}

impl DexMethod {
    pub fn new(name: impl Into<String>, params: Vec<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            params,
            visibility,
            ..Self::default()
        }
    }

    /// A zero-argument constructor, the common case in tests and loaders
    pub fn constructor() -> Self {
        Self::new(CONSTRUCTOR_NAME, Vec::new(), Visibility::Public)
    }

    pub fn with_code(mut self, code: IrCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn native(mut self) -> Self {
        self.is_native = true;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

/// A loaded class
///
/// Classes carry their declared members split the way the container format
/// stores them: static then instance fields, direct then virtual methods.
/// Constructors live among the direct methods.
#[derive(Debug, Default)]
pub struct DexClass {
    /// JVM type descriptor, e.g. `Lcom/example/Foo;`
    pub name: String,
    /// Superclass descriptor; `None` only for the hierarchy root
    pub super_class: Option<String>,
    /// Implemented interface descriptors
    pub interfaces: Vec<String>,
    /// True when the class is not part of the optimized program
    pub is_external: bool,
    /// Annotation type descriptors declared on the class itself
    pub annotations: Vec<String>,
    pub sfields: Vec<DexField>,
    pub ifields: Vec<DexField>,
    pub dmethods: Vec<DexMethod>,
    pub vmethods: Vec<DexMethod>,
    pub rstate: ReferencedState,
}

impl DexClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn extending(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_sfield(mut self, field: DexField) -> Self {
        self.sfields.push(field);
        self
    }

    pub fn with_ifield(mut self, field: DexField) -> Self {
        self.ifields.push(field);
        self
    }

    pub fn with_dmethod(mut self, method: DexMethod) -> Self {
        self.dmethods.push(method);
        self
    }

    pub fn with_vmethod(mut self, method: DexMethod) -> Self {
        self.vmethods.push(method);
        self
    }

    /// Declared constructors, in declaration order
    pub fn ctors(&self) -> impl Iterator<Item = &DexMethod> {
        self.dmethods.iter().filter(|m| m.is_constructor())
    }

    /// Declared static then instance fields
    pub fn all_fields(&self) -> impl Iterator<Item = &DexField> {
        self.sfields.iter().chain(self.ifields.iter())
    }

    /// Declared direct then virtual methods
    pub fn all_methods(&self) -> impl Iterator<Item = &DexMethod> {
        self.dmethods.iter().chain(self.vmethods.iter())
    }
}
