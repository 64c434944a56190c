//! Resolved type signatures
//!
//! Every type occurrence in the checked assembly is a `TypeSig` with no
//! unresolved inference variables. `Template` nodes only appear inside
//! generic declarations and are eliminated by the binding map before any
//! identity comparison happens (see `binds::RtType`).

use serde::{Deserialize, Serialize};

/// Namespace holding the built-in types (`None`, `Option`, `Result`, ...)
pub const CORE_NS: &str = "Core";

/// A resolved type signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeSig {
    /// A nominal type occurrence: declaration reference plus term arguments
    Nominal {
        ns: String,
        name: String,
        args: Vec<TypeSig>,
    },
    /// A fixed-arity ephemeral product `(|T1, T2|)` compared by exact key
    Elist { entries: Vec<TypeSig> },
    /// A template parameter, meaningful only under a binding map
    Template { name: String },
}

impl TypeSig {
    pub fn nominal(ns: &str, name: &str, args: Vec<TypeSig>) -> Self {
        TypeSig::Nominal {
            ns: ns.to_string(),
            name: name.to_string(),
            args,
        }
    }

    pub fn core(name: &str, args: Vec<TypeSig>) -> Self {
        Self::nominal(CORE_NS, name, args)
    }

    pub fn template(name: &str) -> Self {
        TypeSig::Template {
            name: name.to_string(),
        }
    }

    /// Canonical identity key. Stable for a given concrete type; used for
    /// memoization, folding decisions, and the emitted `Symbol.for` keys.
    pub fn tkey(&self) -> String {
        match self {
            TypeSig::Nominal { ns, name, args } => {
                let base = if ns == CORE_NS {
                    name.clone()
                } else {
                    format!("{ns}::{name}")
                };
                if args.is_empty() {
                    base
                } else {
                    let targs: Vec<String> = args.iter().map(|a| a.tkey()).collect();
                    format!("{}<{}>", base, targs.join(", "))
                }
            }
            TypeSig::Elist { entries } => {
                let targs: Vec<String> = entries.iter().map(|a| a.tkey()).collect();
                format!("(|{}|)", targs.join(", "))
            }
            TypeSig::Template { name } => name.clone(),
        }
    }

    pub fn is_elist(&self) -> bool {
        matches!(self, TypeSig::Elist { .. })
    }

    /// Term arguments of a nominal occurrence (empty otherwise)
    pub fn term_args(&self) -> &[TypeSig] {
        match self {
            TypeSig::Nominal { args, .. } => args,
            _ => &[],
        }
    }
}

impl std::fmt::Display for TypeSig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tkey())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_key_unqualified() {
        assert_eq!(TypeSig::core("Int", vec![]).tkey(), "Int");
    }

    #[test]
    fn test_user_key_qualified() {
        let t = TypeSig::nominal("Main", "Foo", vec![]);
        assert_eq!(t.tkey(), "Main::Foo");
    }

    #[test]
    fn test_generic_key() {
        let t = TypeSig::core("Option", vec![TypeSig::core("Int", vec![])]);
        assert_eq!(t.tkey(), "Option<Int>");
    }

    #[test]
    fn test_nested_generic_key() {
        let t = TypeSig::core(
            "Result",
            vec![
                TypeSig::core("Option", vec![TypeSig::core("Nat", vec![])]),
                TypeSig::nominal("Main", "Err", vec![]),
            ],
        );
        assert_eq!(t.tkey(), "Result<Option<Nat>, Main::Err>");
    }

    #[test]
    fn test_elist_key() {
        let t = TypeSig::Elist {
            entries: vec![TypeSig::core("Int", vec![]), TypeSig::core("Bool", vec![])],
        };
        assert_eq!(t.tkey(), "(|Int, Bool|)");
        assert!(t.is_elist());
    }

    #[test]
    fn test_template_key_is_name() {
        assert_eq!(TypeSig::template("T").tkey(), "T");
    }
}
