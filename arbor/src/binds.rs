//! Template binding maps and substituted types
//!
//! A `BindingMap` carries one monomorphization tuple: template parameter
//! name to concrete type. It is installed for exactly one declaration's
//! lowering and never mutated in place; nested generic contexts merge the
//! member's map over the enclosing type's map.
//!
//! `RtType` is the substitution witness: the only way to obtain one is to
//! run a signature through `RtType::resolve`, so emission helpers that
//! compare identity keys or derive accessor names cannot be handed an
//! unsubstituted type by accident.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::TypeSig;

/// An immutable template-parameter -> concrete-type mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingMap {
    binds: BTreeMap<String, TypeSig>,
}

impl BindingMap {
    pub fn new() -> Self {
        BindingMap {
            binds: BTreeMap::new(),
        }
    }

    pub fn of(pairs: Vec<(&str, TypeSig)>) -> Self {
        let mut binds = BTreeMap::new();
        for (name, ty) in pairs {
            let prev = binds.insert(name.to_string(), ty);
            debug_assert!(prev.is_none(), "duplicate template parameter {name}");
        }
        BindingMap { binds }
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeSig> {
        self.binds.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Merge an inner (member) map over an enclosing (type) map. Inner
    /// bindings win on collision; either side may be absent.
    pub fn try_merge(outer: Option<&BindingMap>, inner: Option<&BindingMap>) -> Option<BindingMap> {
        match (outer, inner) {
            (None, None) => None,
            (Some(o), None) => Some(o.clone()),
            (None, Some(i)) => Some(i.clone()),
            (Some(o), Some(i)) => {
                let mut binds = o.binds.clone();
                for (k, v) in &i.binds {
                    binds.insert(k.clone(), v.clone());
                }
                Some(BindingMap { binds })
            }
        }
    }

    /// Substitute template parameters throughout a signature. Names with
    /// no binding are left as-is (the checker guarantees closed inputs;
    /// a leftover template indicates an upstream fault, not ours).
    pub fn remap(&self, ty: &TypeSig) -> TypeSig {
        match ty {
            TypeSig::Template { name } => match self.binds.get(name) {
                Some(concrete) => concrete.clone(),
                None => ty.clone(),
            },
            TypeSig::Nominal { ns, name, args } => TypeSig::Nominal {
                ns: ns.clone(),
                name: name.clone(),
                args: args.iter().map(|a| self.remap(a)).collect(),
            },
            TypeSig::Elist { entries } => TypeSig::Elist {
                entries: entries.iter().map(|a| self.remap(a)).collect(),
            },
        }
    }
}

/// A signature that has been run through the active binding map.
///
/// Construction is restricted to `resolve`; downstream code receives these
/// by value and can only read, which keeps the substitute-before-compare
/// rule structural rather than a discipline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtType(TypeSig);

impl RtType {
    pub fn resolve(ty: &TypeSig, mapper: Option<&BindingMap>) -> RtType {
        match mapper {
            Some(m) => RtType(m.remap(ty)),
            None => RtType(ty.clone()),
        }
    }

    pub fn sig(&self) -> &TypeSig {
        &self.0
    }

    pub fn tkey(&self) -> String {
        self.0.tkey()
    }

    pub fn is_elist(&self) -> bool {
        self.0.is_elist()
    }

    pub fn term_args(&self) -> &[TypeSig] {
        self.0.term_args()
    }
}

impl std::fmt::Display for RtType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeSig {
        TypeSig::core("Int", vec![])
    }

    #[test]
    fn test_remap_direct_template() {
        let m = BindingMap::of(vec![("T", int())]);
        assert_eq!(m.remap(&TypeSig::template("T")).tkey(), "Int");
    }

    #[test]
    fn test_remap_nested_args() {
        let m = BindingMap::of(vec![("T", int())]);
        let opt = TypeSig::core("Option", vec![TypeSig::template("T")]);
        assert_eq!(m.remap(&opt).tkey(), "Option<Int>");
    }

    #[test]
    fn test_remap_leaves_unbound_names() {
        let m = BindingMap::of(vec![("T", int())]);
        assert_eq!(m.remap(&TypeSig::template("U")).tkey(), "U");
    }

    #[test]
    fn test_remap_elist() {
        let m = BindingMap::of(vec![("T", int())]);
        let el = TypeSig::Elist {
            entries: vec![TypeSig::template("T"), TypeSig::core("Bool", vec![])],
        };
        assert_eq!(m.remap(&el).tkey(), "(|Int, Bool|)");
    }

    #[test]
    fn test_merge_inner_wins() {
        let outer = BindingMap::of(vec![("T", int()), ("E", TypeSig::core("String", vec![]))]);
        let inner = BindingMap::of(vec![("T", TypeSig::core("Bool", vec![]))]);
        let merged = BindingMap::try_merge(Some(&outer), Some(&inner)).unwrap();
        assert_eq!(merged.lookup("T").unwrap().tkey(), "Bool");
        assert_eq!(merged.lookup("E").unwrap().tkey(), "String");
    }

    #[test]
    fn test_merge_absent_sides() {
        let m = BindingMap::of(vec![("T", int())]);
        assert!(BindingMap::try_merge(None, None).is_none());
        assert_eq!(
            BindingMap::try_merge(Some(&m), None).unwrap().lookup("T"),
            m.lookup("T")
        );
        assert_eq!(
            BindingMap::try_merge(None, Some(&m)).unwrap().lookup("T"),
            m.lookup("T")
        );
    }

    #[test]
    fn test_resolve_without_mapper_is_identity() {
        let opt = TypeSig::core("Option", vec![int()]);
        let rt = RtType::resolve(&opt, None);
        assert_eq!(rt.tkey(), "Option<Int>");
    }

    #[test]
    fn test_resolve_applies_mapper() {
        let m = BindingMap::of(vec![("T", int())]);
        let rt = RtType::resolve(&TypeSig::template("T"), Some(&m));
        assert_eq!(rt.tkey(), "Int");
    }
}
