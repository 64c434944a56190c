//! Instantiation map
//!
//! Produced by the propagation pass that discovers which generic bindings
//! a program actually uses. The monomorphization driver consumes it
//! read-only: one emitted code object per recorded binding tuple, nothing
//! for declarations with no record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::binds::BindingMap;

/// Instantiation info for one function or method.
///
/// `binds: None` means the declaration has no template parameters and is
/// lowered exactly once; `binds: Some(v)` lists the concrete mappings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FnInst {
    pub binds: Option<Vec<BindingMap>>,
}

impl FnInst {
    pub fn once() -> Self {
        FnInst { binds: None }
    }

    pub fn each(binds: Vec<BindingMap>) -> Self {
        FnInst { binds: Some(binds) }
    }
}

/// One concrete instantiation of a type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeInst {
    /// Canonical key of the instantiated type (`Foo<Int>`)
    pub tkey: String,
    /// Bindings for the type's own template parameters
    pub binds: Option<BindingMap>,
    /// Nested records for member functions used under this instantiation
    pub function_binds: BTreeMap<String, FnInst>,
    /// Nested records for methods used under this instantiation
    pub method_binds: BTreeMap<String, FnInst>,
}

impl TypeInst {
    pub fn mono(tkey: &str) -> Self {
        TypeInst {
            tkey: tkey.to_string(),
            binds: None,
            function_binds: BTreeMap::new(),
            method_binds: BTreeMap::new(),
        }
    }

    pub fn with_binds(tkey: &str, binds: BindingMap) -> Self {
        TypeInst {
            tkey: tkey.to_string(),
            binds: Some(binds),
            function_binds: BTreeMap::new(),
            method_binds: BTreeMap::new(),
        }
    }
}

/// Instantiations recorded for one namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceInst {
    pub ns: String,
    pub functions: BTreeMap<String, FnInst>,
    pub types: BTreeMap<String, Vec<TypeInst>>,
}

impl NamespaceInst {
    pub fn new(ns: &str) -> Self {
        NamespaceInst {
            ns: ns.to_string(),
            functions: BTreeMap::new(),
            types: BTreeMap::new(),
        }
    }
}

/// The whole program's instantiation records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstantiationMap {
    pub namespaces: Vec<NamespaceInst>,
}

impl InstantiationMap {
    pub fn namespace(&self, ns: &str) -> Option<&NamespaceInst> {
        self.namespaces.iter().find(|n| n.ns == ns)
    }

    /// Records for a type under a namespace, if any use was observed
    pub fn type_insts(&self, ns: &str, name: &str) -> Option<&[TypeInst]> {
        self.namespace(ns)
            .and_then(|n| n.types.get(name))
            .map(|v| v.as_slice())
    }
}
