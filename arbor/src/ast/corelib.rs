//! Built-in core declarations
//!
//! The checker ships the `Core` namespace as part of every assembly; the
//! builders here construct the same declarations for drivers and tests.

use super::expr::BodyImpl;
use super::span::Span;
use super::types::{CORE_NS, TypeSig};
use super::{
    Assembly, FieldInfo, FnDecl, MemberFieldDecl, NamespaceDecl, ParamDecl, TypeDecl, TypeDeclKind,
};

const CORE_FILE: &str = "core.arb";

impl TypeDecl {
    /// Bare declaration of the given kind; callers fill in members
    pub fn plain(name: &str, kind: TypeDeclKind) -> Self {
        TypeDecl {
            name: name.to_string(),
            file: CORE_FILE.to_string(),
            sinfo: Span::implicit(),
            kind,
            terms: Vec::new(),
            fields: Vec::new(),
            saturated_fields: Vec::new(),
            invariants: Vec::new(),
            validates: Vec::new(),
            all_invariants: Vec::new(),
            all_validates: Vec::new(),
            saturated_provides: Vec::new(),
            consts: Vec::new(),
            functions: Vec::new(),
            methods: Vec::new(),
        }
    }
}

impl FnDecl {
    /// Declaration with no contracts and a standard body
    pub fn plain(name: &str, params: Vec<ParamDecl>, result: TypeSig, body: BodyImpl) -> Self {
        FnDecl {
            name: name.to_string(),
            file: CORE_FILE.to_string(),
            sinfo: Span::implicit(),
            terms: Vec::new(),
            params,
            result,
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            body,
        }
    }
}

fn primitive(name: &str) -> TypeDecl {
    TypeDecl::plain(name, TypeDeclKind::Primitive)
}

fn saturated_value_field(name: &str, ftype: TypeSig, containing: TypeSig) -> FieldInfo {
    FieldInfo {
        name: name.to_string(),
        ftype,
        has_default: false,
        containing,
    }
}

/// The `Core` namespace: primitives, `Option`/`Some`, `Result`/`Ok`/`Fail`
pub fn core_namespace() -> NamespaceDecl {
    let t = TypeSig::template("T");
    let e = TypeSig::template("E");

    let mut some_decl = TypeDecl::plain("Some", TypeDeclKind::SomeEntity);
    some_decl.terms = vec!["T".to_string()];
    some_decl.fields = vec![MemberFieldDecl {
        name: "value".to_string(),
        ftype: t.clone(),
        default_value: None,
        sinfo: Span::implicit(),
    }];
    some_decl.saturated_fields = vec![saturated_value_field(
        "value",
        t.clone(),
        TypeSig::core("Some", vec![t.clone()]),
    )];
    some_decl.saturated_provides = vec![TypeSig::core("Option", vec![t.clone()])];

    let mut option_decl = TypeDecl::plain("Option", TypeDeclKind::OptionConcept);
    option_decl.terms = vec!["T".to_string()];

    let mut ok_decl = TypeDecl::plain("Ok", TypeDeclKind::OkEntity);
    ok_decl.terms = vec!["T".to_string(), "E".to_string()];
    ok_decl.fields = vec![MemberFieldDecl {
        name: "value".to_string(),
        ftype: t.clone(),
        default_value: None,
        sinfo: Span::implicit(),
    }];
    ok_decl.saturated_fields = vec![saturated_value_field(
        "value",
        t.clone(),
        TypeSig::core("Ok", vec![t.clone(), e.clone()]),
    )];
    ok_decl.saturated_provides = vec![TypeSig::core("Result", vec![t.clone(), e.clone()])];

    let mut fail_decl = TypeDecl::plain("Fail", TypeDeclKind::FailEntity);
    fail_decl.terms = vec!["T".to_string(), "E".to_string()];
    fail_decl.fields = vec![MemberFieldDecl {
        name: "info".to_string(),
        ftype: e.clone(),
        default_value: None,
        sinfo: Span::implicit(),
    }];
    fail_decl.saturated_fields = vec![saturated_value_field(
        "info",
        e.clone(),
        TypeSig::core("Fail", vec![t.clone(), e.clone()]),
    )];
    fail_decl.saturated_provides = vec![TypeSig::core("Result", vec![t.clone(), e.clone()])];

    let mut result_decl = TypeDecl::plain("Result", TypeDeclKind::ResultConcept);
    result_decl.terms = vec!["T".to_string(), "E".to_string()];

    NamespaceDecl {
        name: CORE_NS.to_string(),
        file: CORE_FILE.to_string(),
        consts: Vec::new(),
        functions: Vec::new(),
        typedecls: vec![
            primitive("None"),
            primitive("Bool"),
            primitive("Int"),
            primitive("Nat"),
            primitive("Float"),
            primitive("String"),
            some_decl,
            option_decl,
            ok_decl,
            fail_decl,
            result_decl,
        ],
    }
}

impl Assembly {
    /// Assembly seeded with the core namespace
    pub fn with_core(mut namespaces: Vec<NamespaceDecl>) -> Assembly {
        let mut all = vec![core_namespace()];
        all.append(&mut namespaces);
        Assembly { namespaces: all }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_namespace_has_builtins() {
        let core = core_namespace();
        for name in ["None", "Bool", "Int", "Option", "Some", "Result", "Ok", "Fail"] {
            assert!(
                core.typedecls.iter().any(|t| t.name == name),
                "missing core decl {name}"
            );
        }
    }

    #[test]
    fn test_some_provides_option() {
        let core = core_namespace();
        let some_decl = core.typedecls.iter().find(|t| t.name == "Some").unwrap();
        assert_eq!(some_decl.saturated_provides.len(), 1);
        assert_eq!(some_decl.saturated_provides[0].tkey(), "Option<T>");
    }

    #[test]
    fn test_none_is_unique_but_untabled() {
        let core = core_namespace();
        let none_decl = core.typedecls.iter().find(|t| t.name == "None").unwrap();
        assert!(none_decl.is_unique_for_subtype_checking());
        assert!(!none_decl.emits_subtype_relation());
    }

    #[test]
    fn test_option_is_not_unique() {
        let core = core_namespace();
        let opt = core.typedecls.iter().find(|t| t.name == "Option").unwrap();
        assert!(!opt.is_unique_for_subtype_checking());
        assert!(opt.is_option());
    }
}
