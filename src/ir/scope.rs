use super::class::DexClass;
use std::collections::HashMap;

/// The ordered collection of classes loaded for optimization
///
/// Holds the program's own classes plus any framework classes the loader
/// brought in for inspection (flagged external). Lookup is by type
/// descriptor. Classes are never removed during seeding; reachability
/// state lives inside each class and is interior-mutable, so seeders only
/// ever need a shared reference to the scope.
#[derive(Debug, Default)]
pub struct Scope {
    classes: Vec<DexClass>,
    index: HashMap<String, usize>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class, keeping insertion order. A duplicate descriptor
    /// replaces the index entry but keeps both classes in iteration,
    /// matching loader behavior of last-definition-wins for lookup.
    pub fn add_class(&mut self, class: DexClass) {
        self.index.insert(class.name.clone(), self.classes.len());
        self.classes.push(class);
    }

    /// All classes in load order, external ones included
    pub fn classes(&self) -> impl Iterator<Item = &DexClass> {
        self.classes.iter()
    }

    /// Slice view, for the parallel passes
    pub fn as_slice(&self) -> &[DexClass] {
        &self.classes
    }

    /// Look up any loaded class by descriptor
    pub fn class_by_descriptor(&self, descriptor: &str) -> Option<&DexClass> {
        self.index.get(descriptor).map(|&i| &self.classes[i])
    }

    /// Look up a class that is part of the optimized program
    pub fn internal_class(&self, descriptor: &str) -> Option<&DexClass> {
        self.class_by_descriptor(descriptor)
            .filter(|c| !c.is_external)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<DexClass> for Scope {
    fn from_iter<T: IntoIterator<Item = DexClass>>(iter: T) -> Self {
        let mut scope = Scope::new();
        for class in iter {
            scope.add_class(class);
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_descriptor() {
        let scope: Scope = [DexClass::new("La;"), DexClass::new("Lb;").external()]
            .into_iter()
            .collect();

        assert!(scope.class_by_descriptor("La;").is_some());
        assert!(scope.class_by_descriptor("Lb;").is_some());
        assert!(scope.class_by_descriptor("Lc;").is_none());
    }

    #[test]
    fn test_internal_class_skips_external() {
        let scope: Scope = [DexClass::new("La;"), DexClass::new("Lb;").external()]
            .into_iter()
            .collect();

        assert!(scope.internal_class("La;").is_some());
        assert!(scope.internal_class("Lb;").is_none());
    }

    #[test]
    fn test_iteration_preserves_load_order() {
        let scope: Scope = [DexClass::new("Lb;"), DexClass::new("La;")]
            .into_iter()
            .collect();

        let names: Vec<_> = scope.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Lb;", "La;"]);
    }
}
