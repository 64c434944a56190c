//! Emitted-name derivation
//!
//! One place decides how declarations are addressed in the output:
//! type-identity symbols, cross-namespace accessors, per-instantiation
//! table keys, and the identifier-safe keys used by the runtime's
//! operator dispatch tables.

use crate::ast::TypeSig;
use crate::binds::RtType;

/// `Symbol.for("K")` for a canonical type key
pub fn type_symbol(tkey: &str) -> String {
    format!("Symbol.for(\"{tkey}\")")
}

/// Table key for one instantiation: `"<Int, Bool>"`
pub fn term_key(args: &[TypeSig]) -> String {
    let keys: Vec<String> = args.iter().map(|a| a.tkey()).collect();
    format!("<{}>", keys.join(", "))
}

/// Table key from already-resolved term types
pub fn term_key_resolved(args: &[RtType]) -> String {
    let keys: Vec<String> = args.iter().map(|a| a.tkey()).collect();
    format!("<{}>", keys.join(", "))
}

/// Accessor path for a type object from the current namespace
pub fn accessor_for_type(cur_ns: &str, ty: &RtType) -> String {
    match ty.sig() {
        TypeSig::Nominal { ns, name, args } => {
            let base = if ns == cur_ns {
                name.clone()
            } else {
                format!("${ns}.{name}")
            };
            if args.is_empty() {
                base
            } else {
                format!("{base}[\"{}\"]", term_key(args))
            }
        }
        other => format!("$Unresolvable[\"{}\"]", other.tkey()),
    }
}

/// Accessor for a namespace function, generic instantiations addressed
/// through their table key
pub fn accessor_for_ns_function(
    cur_ns: &str,
    ns: &str,
    name: &str,
    terms: &[RtType],
) -> String {
    let base = if ns == cur_ns {
        name.to_string()
    } else {
        format!("${ns}.{name}")
    };
    if terms.is_empty() {
        base
    } else {
        format!("{base}[\"{}\"]", term_key_resolved(terms))
    }
}

/// Accessor for a namespace constant (memoized thunk; callers append `()`)
pub fn accessor_for_ns_const(cur_ns: &str, ns: &str, name: &str) -> String {
    if ns == cur_ns {
        name.to_string()
    } else {
        format!("${ns}.{name}")
    }
}

/// Accessor for a member function of a type object
pub fn accessor_for_type_function(
    cur_ns: &str,
    ttype: &RtType,
    name: &str,
    terms: &[RtType],
) -> String {
    let base = format!("{}.{name}", accessor_for_type(cur_ns, ttype));
    if terms.is_empty() {
        base
    } else {
        format!("{base}[\"{}\"]", term_key_resolved(terms))
    }
}

/// Companion name of an invocable's postcondition fragment
pub fn on_return_name(name: &str) -> String {
    format!("{name}$onreturn")
}

/// Table key of a generic instantiation's postcondition fragment
pub fn on_return_term_key(tkey: &str) -> String {
    format!("{tkey}$onreturn")
}

/// Identifier-safe key for the runtime operator dispatch tables
/// (`_$fkeq.<key>`); canonical keys may contain `::` and term brackets
pub fn operator_lookup_key(tkey: &str) -> String {
    tkey.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '$'
            }
        })
        .collect::<String>()
        .replace("$$", "$")
}

/// Marker replaced by the return expression when routing through an
/// on-complete fragment
pub const RESULT_ARG: &str = "$[RESULT]$";
