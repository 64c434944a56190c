//! Checked expression and statement trees
//!
//! These are the post-typecheck forms: every node that lowering needs a
//! static type for carries it directly (the checker annotates operand and
//! receiver types during checking), so the backend never re-infers.

use serde::{Deserialize, Serialize};

use super::span::Span;
use super::types::TypeSig;

/// A type-pattern test attached to a condition, postfix op, or match arm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ITest {
    pub kind: ITestKind,
    pub isnot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ITestKind {
    None,
    Some,
    Ok,
    Fail,
    Type(TypeSig),
}

impl ITest {
    pub fn is(kind: ITestKind) -> Self {
        ITest { kind, isnot: false }
    }

    pub fn isnot(kind: ITestKind) -> Self {
        ITest { kind, isnot: true }
    }
}

/// A name introduced by a successful/failed type test in a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinderInfo {
    /// Synthesized scope name (`$x`) declared once in the body prologue
    pub scope_name: String,
}

/// A conditional guard: expression, its static type, optional type test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondInfo {
    pub exp: Box<Expr>,
    /// Static type of `exp` (pre-substitution)
    pub vtype: TypeSig,
    pub itest: Option<ITest>,
}

/// Kind of a key-equality comparison, resolved by the checker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEqKind {
    /// `none == x`, reduced to a none test on the other side
    LhsNone,
    /// `x == none`
    RhsNone,
    /// Both sides concrete keyable values of the given operand type
    StrictEq(TypeSig),
}

/// One step of a postfix chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PostfixOpKind {
    /// `.field` on a nominal value
    AccessField { name: String },
    /// `.i` on an elist value
    AccessIndex { idx: usize },
    /// `?is` test; `vtype` is the receiver's static type at this step
    IsTest { ttest: ITest, vtype: TypeSig },
    /// `@as` convert-or-abort
    AsConvert {
        ttest: ITest,
        vtype: TypeSig,
        sinfo: Span,
    },
    /// Resolved (non-virtual) method invoke on the declaring type
    Invoke {
        /// Type declaring the method, receiver-substituted
        resolved_type: TypeSig,
        /// Receiver's static type at this step
        vtype: TypeSig,
        name: String,
        terms: Vec<TypeSig>,
        args: Vec<Expr>,
    },
    /// Virtual invoke, not supported by this backend yet
    VirtualInvoke { name: String, sinfo: Span },
}

/// Checked expression forms (closed; lowering matches exhaustively)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    LitNone,
    LitBool(bool),
    LitInt(i64),
    LitNat(u64),
    LitFloat(f64),
    LitString(String),
    LitRegex(String),

    AccessVar {
        name: String,
    },
    AccessNsConst {
        ns: String,
        name: String,
    },
    AccessTypeConst {
        ttype: TypeSig,
        name: String,
    },
    AccessEnum {
        ttype: TypeSig,
        variant: String,
    },

    /// Standard constructor for entities and refinements (`T{...}`)
    ConsPrimary {
        ctype: TypeSig,
        args: Vec<Expr>,
    },
    /// `ok(v)` / `fail(v)` / `some(v)` with the concrete constructed type
    ConsSpecial {
        ctype: TypeSig,
        arg: Box<Expr>,
    },
    /// Ephemeral list `(|a, b|)`
    ConsEList {
        args: Vec<Expr>,
    },
    /// Lambda with an expression body
    ConsLambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    LambdaInvoke {
        name: String,
        args: Vec<Expr>,
    },

    CallNsFunction {
        ns: String,
        name: String,
        terms: Vec<TypeSig>,
        args: Vec<Expr>,
    },
    CallTypeFunction {
        ttype: TypeSig,
        name: String,
        terms: Vec<TypeSig>,
        args: Vec<Expr>,
    },

    Postfix {
        root: Box<Expr>,
        ops: Vec<PostfixOpKind>,
    },

    PrefixNot {
        exp: Box<Expr>,
        opertype: TypeSig,
    },
    PrefixNegate {
        exp: Box<Expr>,
        opertype: TypeSig,
        restype: TypeSig,
    },

    BinAdd {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
        restype: TypeSig,
    },
    BinSub {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
        restype: TypeSig,
    },
    BinMult {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
        restype: TypeSig,
    },
    BinDiv {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
        restype: TypeSig,
    },

    KeyEq {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        kind: KeyEqKind,
    },
    KeyNeq {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        kind: KeyEqKind,
    },
    KeyLess {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        optype: TypeSig,
    },

    NumericEq {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
    },
    NumericNeq {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
    },
    NumericLess {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
    },
    NumericLessEq {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
    },
    NumericGreater {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
    },
    NumericGreaterEq {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        opertype: TypeSig,
    },

    LogicAnd {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    LogicOr {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    LogicImplies {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    IfExpr {
        test: CondInfo,
        binder: Option<BinderInfo>,
        then_val: Box<Expr>,
        else_val: Box<Expr>,
        sinfo: Span,
    },

    /// Constructs the checker still produces but this backend does not
    /// lower yet; surfaces as an `Unimplemented` diagnostic
    Unsupported {
        feature: String,
        sinfo: Span,
    },
}

/// A block of statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

/// One arm of a literal switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchArm {
    /// `None` marks the trailing wildcard arm
    pub lval: Option<Expr>,
    /// Comparison operand type for this arm
    pub optype: TypeSig,
    pub body: Block,
}

/// One arm of a type-pattern match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchArm {
    /// `None` marks the trailing wildcard arm; its type comes from
    /// `MatchStmt::implicit_final_type`
    pub mtype: Option<TypeSig>,
    pub body: Block,
}

/// Checked statement forms (closed; lowering matches exhaustively)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Empty,
    VarDecl {
        name: String,
    },
    VarInit {
        name: String,
        is_const: bool,
        exp: Expr,
    },
    VarAssign {
        name: String,
        exp: Expr,
    },
    ReturnVoid,
    ReturnSingle {
        exp: Expr,
    },
    If {
        cond: CondInfo,
        binder: Option<BinderInfo>,
        then_block: Block,
        sinfo: Span,
    },
    IfElse {
        cond: CondInfo,
        binder: Option<BinderInfo>,
        then_block: Block,
        else_block: Block,
        sinfo: Span,
    },
    IfElifElse {
        condflow: Vec<(Expr, Block)>,
        else_block: Block,
    },
    Switch {
        sval: Expr,
        arms: Vec<SwitchArm>,
        /// Checker verdict: arms statically cover the scrutinee type
        must_exhaustive: bool,
        sinfo: Span,
    },
    Match {
        sval: Expr,
        /// Static type of the scrutinee
        vtype: TypeSig,
        binder: Option<BinderInfo>,
        arms: Vec<MatchArm>,
        implicit_final_type: Option<TypeSig>,
        must_exhaustive: bool,
        sinfo: Span,
    },
    Block(Block),
    Abort {
        sinfo: Span,
    },
    Assert {
        cond: Expr,
        text: String,
        level: crate::cfg::BuildLevel,
        sinfo: Span,
    },
    Validate {
        cond: Expr,
        text: String,
        tag: Option<String>,
        sinfo: Span,
    },
    Debug {
        value: Expr,
        sinfo: Span,
    },
    /// Statement forms this backend does not lower yet
    Unsupported {
        feature: String,
        sinfo: Span,
    },
}

/// Body of an invocable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyImpl {
    /// Abstract member on a concept; nothing is emitted
    Abstract,
    /// Backed by a runtime intrinsic looked up by key
    Builtin(String),
    /// Single-expression body
    Expression(Expr),
    /// Full statement body
    Standard(Vec<Stmt>),
}
