//! Checked assembly definitions
//!
//! The backend's input: namespaces of type declarations, functions, and
//! methods with attached contracts, fully resolved by the type checker.
//! Everything here is immutable during lowering and serde-serializable so
//! the checker can hand the assembly over as JSON.

mod corelib;
mod expr;
mod span;
mod types;

pub use corelib::*;
pub use expr::*;
pub use span::*;
pub use types::*;

use serde::{Deserialize, Serialize};

use crate::cfg::BuildLevel;

/// A checked program assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    pub namespaces: Vec<NamespaceDecl>,
}

impl Assembly {
    pub fn namespace(&self, name: &str) -> Option<&NamespaceDecl> {
        self.namespaces.iter().find(|n| n.name == name)
    }

    pub fn type_decl(&self, ns: &str, name: &str) -> Option<&TypeDecl> {
        self.namespace(ns)
            .and_then(|n| n.typedecls.iter().find(|t| t.name == name))
    }

    /// Declaration behind a nominal signature, if any
    pub fn resolve_nominal(&self, sig: &TypeSig) -> Option<&TypeDecl> {
        match sig {
            TypeSig::Nominal { ns, name, .. } => self.type_decl(ns, name),
            _ => None,
        }
    }
}

/// One namespace of declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub name: String,
    /// Source file the namespace was declared in
    pub file: String,
    pub consts: Vec<ConstDecl>,
    pub functions: Vec<FnDecl>,
    pub typedecls: Vec<TypeDecl>,
}

/// A namespace- or type-level constant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: String,
    pub file: String,
    pub value: Expr,
    pub sinfo: Span,
}

/// A function or method parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ptype: TypeSig,
    /// Default expression evaluated when the caller omits the argument
    pub default_value: Option<Expr>,
    /// By-reference parameter; its pre-state is snapshot for postconditions
    pub is_ref: bool,
}

impl ParamDecl {
    pub fn plain(name: &str, ptype: TypeSig) -> Self {
        ParamDecl {
            name: name.to_string(),
            ptype,
            default_value: None,
            is_ref: false,
        }
    }
}

/// A precondition (`requires`) on an invocable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreconditionDecl {
    pub exp: Expr,
    /// Source text of the condition, used for the abort diagnostic
    pub text: String,
    pub level: BuildLevel,
    pub is_soft: bool,
    pub tag: Option<String>,
    pub sinfo: Span,
}

/// A postcondition (`ensures`) on an invocable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostconditionDecl {
    pub exp: Expr,
    pub text: String,
    pub level: BuildLevel,
    pub is_soft: bool,
    pub tag: Option<String>,
    pub sinfo: Span,
}

/// A field invariant attached to a type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantDecl {
    pub exp: Expr,
    pub level: BuildLevel,
    pub tag: Option<String>,
    /// Type the invariant was declared on (differs from the constructed
    /// type for inherited invariants)
    pub containing: TypeSig,
    pub sinfo: Span,
}

/// An always-on API-boundary validation attached to a type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateDecl {
    pub exp: Expr,
    pub tag: Option<String>,
    pub containing: TypeSig,
    pub sinfo: Span,
}

/// Pattern/format constraint on a refinement declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
    /// Regex literal text (without delimiters)
    pub regex: String,
    pub tag: Option<String>,
    pub sinfo: Span,
}

/// One entry of a saturated (inheritance-flattened) field list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub ftype: TypeSig,
    pub has_default: bool,
    /// Type that declared the field
    pub containing: TypeSig,
}

/// A member field declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberFieldDecl {
    pub name: String,
    pub ftype: TypeSig,
    pub default_value: Option<Expr>,
    pub sinfo: Span,
}

/// A function or method declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub file: String,
    pub sinfo: Span,
    /// Template parameter names (empty for non-generic declarations)
    pub terms: Vec<String>,
    pub params: Vec<ParamDecl>,
    pub result: TypeSig,
    pub preconditions: Vec<PreconditionDecl>,
    pub postconditions: Vec<PostconditionDecl>,
    pub body: BodyImpl,
}

/// Kind of a nominal type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDeclKind {
    /// Built-in leaf type with an unboxed runtime representation
    Primitive,
    /// Closed set of named members, represented as key strings
    Enum { variants: Vec<String> },
    /// Wraps a single value of `basetype`, optionally format-constrained
    Refinement {
        basetype: TypeSig,
        format: Option<FormatSpec>,
    },
    /// Concrete object type with fields
    Entity,
    /// Abstract supertype; never a runtime representation of its own
    Concept,
    /// Closed sum head over its member entities
    Datatype { members: Vec<String> },
    /// Concrete member of a closed sum
    DatatypeMember { parent: String },
    /// Built-in `Option<T>` concept
    OptionConcept,
    /// Built-in `Some<T>` entity
    SomeEntity,
    /// Built-in `Result<T, E>` concept
    ResultConcept,
    /// Built-in `Ok<T, E>` entity
    OkEntity,
    /// Built-in `Fail<T, E>` entity
    FailEntity,
}

/// A nominal type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub file: String,
    pub sinfo: Span,
    pub kind: TypeDeclKind,
    /// Template parameter names (empty for non-generic declarations)
    pub terms: Vec<String>,
    /// Fields declared directly on this type
    pub fields: Vec<MemberFieldDecl>,
    /// Inheritance-flattened field list, in materialization order
    pub saturated_fields: Vec<FieldInfo>,
    /// Invariants declared directly on this type
    pub invariants: Vec<InvariantDecl>,
    /// Validates declared directly on this type
    pub validates: Vec<ValidateDecl>,
    /// All invariants that apply on construction, inherited included
    pub all_invariants: Vec<InvariantDecl>,
    /// All validates that apply on API construction, inherited included
    pub all_validates: Vec<ValidateDecl>,
    /// Inheritance-flattened supertype list
    pub saturated_provides: Vec<TypeSig>,
    pub consts: Vec<ConstDecl>,
    pub functions: Vec<FnDecl>,
    pub methods: Vec<FnDecl>,
}

impl TypeDecl {
    /// Leaf declaration with no possible runtime subtype ambiguity
    pub fn is_unique_for_subtype_checking(&self) -> bool {
        !matches!(
            self.kind,
            TypeDeclKind::Concept
                | TypeDeclKind::Datatype { .. }
                | TypeDeclKind::OptionConcept
                | TypeDeclKind::ResultConcept
        )
    }

    /// Values of this type are tagged runtime objects (methods dispatch
    /// through the prototype); everything else lives unboxed
    pub fn is_boxed_repr(&self) -> bool {
        matches!(
            self.kind,
            TypeDeclKind::Entity
                | TypeDeclKind::DatatypeMember { .. }
                | TypeDeclKind::SomeEntity
                | TypeDeclKind::OkEntity
                | TypeDeclKind::FailEntity
        )
    }

    pub fn is_option(&self) -> bool {
        matches!(self.kind, TypeDeclKind::OptionConcept)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeDeclKind::Primitive)
    }

    /// Concrete declarations that get a supertype-table entry per
    /// instantiation (`None` is special-cased in the runtime instead)
    pub fn emits_subtype_relation(&self) -> bool {
        if self.name == "None" {
            return false;
        }
        !matches!(
            self.kind,
            TypeDeclKind::Concept
                | TypeDeclKind::Datatype { .. }
                | TypeDeclKind::OptionConcept
                | TypeDeclKind::ResultConcept
        )
    }
}
