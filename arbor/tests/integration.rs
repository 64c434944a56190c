//! Integration tests for the Arbor lowering backend
//!
//! Exercises the full emission pipeline over hand-built checked
//! assemblies: determinism, decidability folding, monomorphization,
//! contract ordering, and exhaustiveness gating.

use arbor::ast::{
    Assembly, BinderInfo, Block, BodyImpl, CondInfo, ConstDecl, Expr, FieldInfo, FnDecl, ITest,
    ITestKind, InvariantDecl, MatchArm, MemberFieldDecl, NamespaceDecl, ParamDecl,
    PostconditionDecl, PreconditionDecl, Span, Stmt, TypeDecl, TypeDeclKind, TypeSig, ValidateDecl,
};
use arbor::binds::BindingMap;
use arbor::cfg::{BuildLevel, EmitMode, EmitProfile};
use arbor::emit::emit_assembly;
use arbor::instmap::{FnInst, InstantiationMap, NamespaceInst, TypeInst};

const MAIN_FILE: &str = "main.arb";

fn int() -> TypeSig {
    TypeSig::core("Int", vec![])
}

fn bool_ty() -> TypeSig {
    TypeSig::core("Bool", vec![])
}

fn none_ty() -> TypeSig {
    TypeSig::core("None", vec![])
}

fn span_at(line: usize) -> Span {
    Span::new(line * 100, line * 100 + 10, line)
}

fn main_ns(functions: Vec<FnDecl>, typedecls: Vec<TypeDecl>) -> NamespaceDecl {
    NamespaceDecl {
        name: "Main".to_string(),
        file: MAIN_FILE.to_string(),
        consts: Vec::new(),
        functions,
        typedecls,
    }
}


/// Function declared in the Main namespace's source file
fn main_fn(name: &str, params: Vec<ParamDecl>, result: TypeSig, body: BodyImpl) -> FnDecl {
    let mut f = FnDecl::plain(name, params, result, body);
    f.file = MAIN_FILE.to_string();
    f
}

fn ns_inst(
    functions: Vec<(&str, FnInst)>,
    types: Vec<(&str, Vec<TypeInst>)>,
) -> NamespaceInst {
    let mut inst = NamespaceInst::new("Main");
    for (name, fi) in functions {
        inst.functions.insert(name.to_string(), fi);
    }
    for (name, ti) in types {
        inst.types.insert(name.to_string(), ti);
    }
    inst
}

fn emit_main(
    asm: &Assembly,
    nsinst: NamespaceInst,
) -> (String, arbor::emit::EmitOutput) {
    let instmap = InstantiationMap {
        namespaces: vec![nsinst],
    };
    let output = emit_assembly(asm, &instmap, EmitProfile::default()).expect("emission failed");
    let unit = output
        .units
        .iter()
        .find(|u| u.ns == "Main")
        .expect("Main module missing");
    (unit.contents.clone(), output)
}

/// `entity Point { x: Int, y: Int } invariant $x >= $y;` declared at `line`
fn point_decl(line: usize) -> TypeDecl {
    let point_sig = TypeSig::nominal("Main", "Point", vec![]);
    let fields = vec![
        FieldInfo {
            name: "x".to_string(),
            ftype: int(),
            has_default: false,
            containing: point_sig.clone(),
        },
        FieldInfo {
            name: "y".to_string(),
            ftype: int(),
            has_default: false,
            containing: point_sig.clone(),
        },
    ];
    let inv = InvariantDecl {
        exp: Expr::NumericGreaterEq {
            lhs: Box::new(Expr::AccessVar {
                name: "$x".to_string(),
            }),
            rhs: Box::new(Expr::AccessVar {
                name: "$y".to_string(),
            }),
            opertype: int(),
        },
        level: BuildLevel::Release,
        tag: None,
        containing: point_sig,
        sinfo: span_at(line),
    };

    let mut decl = TypeDecl::plain("Point", TypeDeclKind::Entity);
    decl.file = MAIN_FILE.to_string();
    decl.fields = vec![
        MemberFieldDecl {
            name: "x".to_string(),
            ftype: int(),
            default_value: None,
            sinfo: span_at(line),
        },
        MemberFieldDecl {
            name: "y".to_string(),
            ftype: int(),
            default_value: None,
            sinfo: span_at(line),
        },
    ];
    decl.saturated_fields = fields;
    decl.invariants = vec![inv.clone()];
    decl.all_invariants = vec![inv];
    decl
}

// ============================================
// Determinism
// ============================================

#[test]
fn test_emission_is_deterministic() {
    let asm = Assembly::with_core(vec![main_ns(
        vec![main_fn(
            "main",
            vec![],
            int(),
            BodyImpl::Expression(Expr::LitInt(42)),
        )],
        vec![point_decl(7)],
    )]);
    let nsinst = || {
        ns_inst(
            vec![("main", FnInst::once())],
            vec![("Point", vec![TypeInst::mono("Main::Point")])],
        )
    };

    let (first, _) = emit_main(&asm, nsinst());
    let (second, _) = emit_main(&asm, nsinst());
    assert_eq!(first, second);
}

// ============================================
// Decidability folding (Scenario D)
// ============================================

#[test]
fn test_none_test_on_none_value_folds_to_literal() {
    let body = vec![Stmt::If {
        cond: CondInfo {
            exp: Box::new(Expr::AccessVar {
                name: "v".to_string(),
            }),
            vtype: none_ty(),
            itest: Some(ITest::is(ITestKind::None)),
        },
        binder: None,
        then_block: Block {
            statements: vec![Stmt::ReturnSingle {
                exp: Expr::LitInt(1),
            }],
        },
        sinfo: span_at(3),
    }];
    let f = main_fn(
        "check",
        vec![ParamDecl::plain("v", none_ty())],
        int(),
        BodyImpl::Standard(body),
    );
    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let (out, _) = emit_main(&asm, ns_inst(vec![("check", FnInst::once())], vec![]));

    assert!(out.contains("if(true)"), "test did not fold:\n{out}");
    let fragment = out
        .split("function check")
        .nth(1)
        .expect("check function missing");
    let fn_body = fragment.split("export").next().unwrap_or(fragment);
    assert!(
        !fn_body.contains("_$isNone"),
        "folded test still calls a helper:\n{fn_body}"
    );
}

// ============================================
// Monomorphization (Scenario C + bijection)
// ============================================

fn generic_id_fn() -> FnDecl {
    let mut f = main_fn(
        "id",
        vec![ParamDecl::plain("x", TypeSig::template("T"))],
        TypeSig::template("T"),
        BodyImpl::Expression(Expr::AccessVar {
            name: "x".to_string(),
        }),
    );
    f.terms = vec!["T".to_string()];
    f
}

#[test]
fn test_generic_function_emitted_once_per_binding() {
    let asm = Assembly::with_core(vec![main_ns(vec![generic_id_fn()], vec![])]);
    let binds = vec![
        BindingMap::of(vec![("T", int())]),
        BindingMap::of(vec![("T", bool_ty())]),
    ];
    let (out, _) = emit_main(&asm, ns_inst(vec![("id", FnInst::each(binds))], vec![]));

    assert!(out.contains("export const id = {"));
    assert_eq!(out.matches("\"<Int>\": function(x)").count(), 1);
    assert_eq!(out.matches("\"<Bool>\": function(x)").count(), 1);
}

#[test]
fn test_removing_a_binding_removes_exactly_one_object() {
    let asm = Assembly::with_core(vec![main_ns(vec![generic_id_fn()], vec![])]);
    let (out, _) = emit_main(
        &asm,
        ns_inst(
            vec![("id", FnInst::each(vec![BindingMap::of(vec![("T", int())])]))],
            vec![],
        ),
    );

    assert_eq!(out.matches("\"<Int>\": function(x)").count(), 1);
    assert!(!out.contains("\"<Bool>\""));
}

#[test]
fn test_unrecorded_declaration_is_omitted() {
    let asm = Assembly::with_core(vec![main_ns(
        vec![
            generic_id_fn(),
            main_fn("unused", vec![], int(), BodyImpl::Expression(Expr::LitInt(0))),
        ],
        vec![],
    )]);
    let (out, _) = emit_main(
        &asm,
        ns_inst(
            vec![("id", FnInst::each(vec![BindingMap::of(vec![("T", int())])]))],
            vec![],
        ),
    );

    assert!(!out.contains("unused"));
}

#[test]
fn test_generic_type_emitted_once_per_binding() {
    let box_sig = |arg: TypeSig| TypeSig::nominal("Main", "Box", vec![arg]);
    let mut decl = TypeDecl::plain("Box", TypeDeclKind::Entity);
    decl.file = MAIN_FILE.to_string();
    decl.terms = vec!["T".to_string()];
    decl.saturated_fields = vec![FieldInfo {
        name: "v".to_string(),
        ftype: TypeSig::template("T"),
        has_default: false,
        containing: box_sig(TypeSig::template("T")),
    }];

    let asm = Assembly::with_core(vec![main_ns(vec![], vec![decl])]);
    let insts = vec![
        TypeInst::with_binds("Main::Box<Int>", BindingMap::of(vec![("T", int())])),
        TypeInst::with_binds("Main::Box<Bool>", BindingMap::of(vec![("T", bool_ty())])),
    ];
    let (out, _) = emit_main(&asm, ns_inst(vec![], vec![("Box", insts)]));

    assert!(out.contains("export const Box = {"));
    assert_eq!(out.matches("\"<Int>\": Object.create($VRepr").count(), 1);
    assert_eq!(out.matches("\"<Bool>\": Object.create($VRepr").count(), 1);
    assert!(out.contains("$tsym: { value: Symbol.for(\"Main::Box<Int>\") }"));
    assert!(out.contains("_$supertypes[Symbol.for(\"Main::Box<Int>\")] = [];"));
}

#[test]
fn test_method_emitted_inside_type_object() {
    let mut decl = point_decl(7);
    let mut norm = main_fn(
        "norm",
        vec![],
        int(),
        BodyImpl::Expression(Expr::Postfix {
            root: Box::new(Expr::AccessVar {
                name: "this".to_string(),
            }),
            ops: vec![arbor::ast::PostfixOpKind::AccessField {
                name: "x".to_string(),
            }],
        }),
    );
    norm.file = MAIN_FILE.to_string();
    decl.methods = vec![norm];

    let mut tinst = TypeInst::mono("Main::Point");
    tinst.method_binds.insert("norm".to_string(), FnInst::once());

    let asm = Assembly::with_core(vec![main_ns(vec![], vec![decl])]);
    let (out, _) = emit_main(&asm, ns_inst(vec![], vec![("Point", vec![tinst])]));

    assert!(out.contains("norm: { value: function() {"));
    assert!(out.contains("return this.x;"));
    assert!(
        out.contains("$scall: { value: function(name, tt, ...args)"),
        "boxed types carry the dynamic dispatcher:\n{out}"
    );
}

#[test]
fn test_generic_recorded_without_binds_is_fatal() {
    let asm = Assembly::with_core(vec![main_ns(vec![generic_id_fn()], vec![])]);
    let instmap = InstantiationMap {
        namespaces: vec![ns_inst(vec![("id", FnInst::once())], vec![])],
    };
    let err = emit_assembly(&asm, &instmap, EmitProfile::default());
    assert!(err.is_err(), "missing binds must be a fatal inconsistency");
}

// ============================================
// Contract ordering (Scenario B included)
// ============================================

#[test]
fn test_invariant_abort_references_declaration_line() {
    let asm = Assembly::with_core(vec![main_ns(vec![], vec![point_decl(42)])]);
    let (out, _) = emit_main(
        &asm,
        ns_inst(vec![], vec![("Point", vec![TypeInst::mono("Main::Point")])]),
    );

    assert!(
        out.contains("failed invariant @ main.arb:42"),
        "diagnostic must carry the invariant's source line:\n{out}"
    );
}

/// Refinement `Meters = Int of /[0-9]+m/` with one invariant and one
/// validate: `$createAPI` must run defaults, format check, invariants,
/// validates, materialization in that order
#[test]
fn test_construction_sequence_order() {
    let meters_sig = TypeSig::nominal("Main", "Meters", vec![]);
    let mut decl = TypeDecl::plain(
        "Meters",
        TypeDeclKind::Refinement {
            basetype: int(),
            format: Some(arbor::ast::FormatSpec {
                regex: "[0-9]+m".to_string(),
                tag: None,
                sinfo: span_at(10),
            }),
        },
    );
    decl.file = MAIN_FILE.to_string();
    let inv = InvariantDecl {
        exp: Expr::LitBool(true),
        level: BuildLevel::Release,
        tag: None,
        containing: meters_sig.clone(),
        sinfo: span_at(11),
    };
    let val = ValidateDecl {
        exp: Expr::LitBool(true),
        tag: Some("V-M".to_string()),
        containing: meters_sig,
        sinfo: span_at(12),
    };
    decl.invariants = vec![inv.clone()];
    decl.all_invariants = vec![inv];
    decl.validates = vec![val.clone()];
    decl.all_validates = vec![val];

    let asm = Assembly::with_core(vec![main_ns(vec![], vec![decl])]);
    let (out, _) = emit_main(
        &asm,
        ns_inst(vec![], vec![("Meters", vec![TypeInst::mono("Main::Meters")])]),
    );

    let api = out.split("$createAPI").nth(1).expect("$createAPI missing");
    let fmt_pos = api.find("_$formatchk").expect("format check missing");
    let inv_pos = api.find("_$invariant").expect("invariant missing");
    let val_pos = api.find("_$validate").expect("validate missing");
    let ret_pos = api.find("return value;").expect("materialization missing");
    assert!(fmt_pos < inv_pos, "format check must precede invariants");
    assert!(inv_pos < val_pos, "invariants must precede validates");
    assert!(val_pos < ret_pos, "validates must precede materialization");

    // the plain constructor never runs validates
    let create = out
        .split("$create:")
        .nth(1)
        .expect("$create missing")
        .split("$createAPI")
        .next()
        .unwrap();
    assert!(!create.contains("_$validate"));
}

#[test]
fn test_disabled_invariant_is_skipped_entirely() {
    let mut decl = point_decl(7);
    decl.invariants[0].level = BuildLevel::Debug;
    decl.all_invariants[0].level = BuildLevel::Debug;

    let asm = Assembly::with_core(vec![main_ns(vec![], vec![decl])]);
    let instmap = InstantiationMap {
        namespaces: vec![ns_inst(
            vec![],
            vec![("Point", vec![TypeInst::mono("Main::Point")])],
        )],
    };
    let profile = EmitProfile {
        mode: EmitMode::Debug,
        level: BuildLevel::Test,
    };
    let output = emit_assembly(&asm, &instmap, profile).expect("emission failed");
    let out = &output.units.iter().find(|u| u.ns == "Main").unwrap().contents;

    assert!(!out.contains("_$invariant"));
    assert!(!out.contains("$checkinv"));
}

#[test]
fn test_default_parameters_initialize_left_to_right() {
    let f = FnDecl {
        params: vec![
            ParamDecl {
                name: "a".to_string(),
                ptype: int(),
                default_value: Some(Expr::LitInt(1)),
                is_ref: false,
            },
            ParamDecl {
                name: "b".to_string(),
                ptype: int(),
                default_value: Some(Expr::AccessVar {
                    name: "a".to_string(),
                }),
                is_ref: false,
            },
        ],
        ..main_fn(
            "pair",
            vec![],
            int(),
            BodyImpl::Expression(Expr::AccessVar {
                name: "b".to_string(),
            }),
        )
    };
    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let (out, _) = emit_main(&asm, ns_inst(vec![("pair", FnInst::once())], vec![]));

    let a_pos = out.find("if(a === undefined)").expect("default for a missing");
    let b_pos = out.find("if(b === undefined)").expect("default for b missing");
    assert!(a_pos < b_pos, "defaults must run in declaration order");
}

// ============================================
// Postconditions
// ============================================

#[test]
fn test_postcondition_routes_return_through_on_complete() {
    let post = PostconditionDecl {
        exp: Expr::NumericGreaterEq {
            lhs: Box::new(Expr::AccessVar {
                name: "$return".to_string(),
            }),
            rhs: Box::new(Expr::LitInt(0)),
            opertype: int(),
        },
        text: "$return >= 0i".to_string(),
        level: BuildLevel::Release,
        is_soft: false,
        tag: None,
        sinfo: span_at(5),
    };
    let mut f = main_fn(
        "abs",
        vec![ParamDecl::plain("x", int())],
        int(),
        BodyImpl::Standard(vec![Stmt::ReturnSingle {
            exp: Expr::AccessVar {
                name: "x".to_string(),
            },
        }]),
    );
    f.postconditions = vec![post];

    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let (out, _) = emit_main(&asm, ns_inst(vec![("abs", FnInst::once())], vec![]));

    assert!(out.contains("export function abs$onreturn(x, $return)"));
    assert!(out.contains("_$postcond($return >= 0n, \"$return >= 0i @ main.arb:5\");"));
    assert!(out.contains("return abs$onreturn(x, x);"));
    assert!(out.contains("return $return;"));
}

#[test]
fn test_disabled_postcondition_leaves_return_untouched() {
    let post = PostconditionDecl {
        exp: Expr::LitBool(true),
        text: "true".to_string(),
        level: BuildLevel::Debug,
        is_soft: false,
        tag: None,
        sinfo: span_at(5),
    };
    let mut f = main_fn(
        "abs",
        vec![ParamDecl::plain("x", int())],
        int(),
        BodyImpl::Standard(vec![Stmt::ReturnSingle {
            exp: Expr::AccessVar {
                name: "x".to_string(),
            },
        }]),
    );
    f.postconditions = vec![post];

    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let instmap = InstantiationMap {
        namespaces: vec![ns_inst(vec![("abs", FnInst::once())], vec![])],
    };
    let profile = EmitProfile {
        mode: EmitMode::Debug,
        level: BuildLevel::Release,
    };
    let output = emit_assembly(&asm, &instmap, profile).expect("emission failed");
    let out = &output.units.iter().find(|u| u.ns == "Main").unwrap().contents;

    assert!(!out.contains("$onreturn"));
    assert!(out.contains("return x;"));
}

#[test]
fn test_soft_precondition_reports_without_aborting() {
    let pre_soft = PreconditionDecl {
        exp: Expr::LitBool(true),
        text: "soft one".to_string(),
        level: BuildLevel::Release,
        is_soft: true,
        tag: None,
        sinfo: span_at(2),
    };
    let pre_hard = PreconditionDecl {
        exp: Expr::LitBool(true),
        text: "hard one".to_string(),
        level: BuildLevel::Release,
        is_soft: false,
        tag: Some("P-H".to_string()),
        sinfo: span_at(3),
    };
    let mut f = main_fn(
        "guarded",
        vec![ParamDecl::plain("x", int())],
        int(),
        BodyImpl::Expression(Expr::AccessVar {
            name: "x".to_string(),
        }),
    );
    f.preconditions = vec![pre_soft, pre_hard];

    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let (out, _) = emit_main(&asm, ns_inst(vec![("guarded", FnInst::once())], vec![]));

    assert!(out.contains("_$softprecond(true, \"soft one @ main.arb:2\");"));
    assert!(out.contains("_$precond(true, \"hard one[P-H] @ main.arb:3\");"));
}

// ============================================
// Exhaustiveness gating (Scenarios A + guard)
// ============================================

/// `datatype Shape = Circle | Square`, matched over both members
fn shape_decls() -> Vec<TypeDecl> {
    let shape_sig = TypeSig::nominal("Main", "Shape", vec![]);
    let mut shape = TypeDecl::plain(
        "Shape",
        TypeDeclKind::Datatype {
            members: vec!["Circle".to_string(), "Square".to_string()],
        },
    );
    shape.file = MAIN_FILE.to_string();

    let member = |name: &str| {
        let mut d = TypeDecl::plain(
            name,
            TypeDeclKind::DatatypeMember {
                parent: "Shape".to_string(),
            },
        );
        d.file = MAIN_FILE.to_string();
        d.saturated_provides = vec![shape_sig.clone()];
        d
    };
    vec![shape, member("Circle"), member("Square")]
}

fn shape_match_fn(must_exhaustive: bool) -> FnDecl {
    let arm = |ty: &str, ret: i64| MatchArm {
        mtype: Some(TypeSig::nominal("Main", ty, vec![])),
        body: Block {
            statements: vec![Stmt::ReturnSingle {
                exp: Expr::LitInt(ret),
            }],
        },
    };
    main_fn(
        "area",
        vec![ParamDecl::plain(
            "s",
            TypeSig::nominal("Main", "Shape", vec![]),
        )],
        int(),
        BodyImpl::Standard(vec![Stmt::Match {
            sval: Expr::AccessVar {
                name: "s".to_string(),
            },
            vtype: TypeSig::nominal("Main", "Shape", vec![]),
            binder: None,
            arms: vec![arm("Circle", 1), arm("Square", 2)],
            implicit_final_type: None,
            must_exhaustive,
            sinfo: span_at(20),
        }]),
    )
}

fn shape_insts() -> Vec<(&'static str, Vec<TypeInst>)> {
    vec![
        ("Shape", vec![TypeInst::mono("Main::Shape")]),
        ("Circle", vec![TypeInst::mono("Main::Circle")]),
        ("Square", vec![TypeInst::mono("Main::Square")]),
    ]
}

#[test]
fn test_exhaustive_match_has_no_runtime_guard() {
    let asm = Assembly::with_core(vec![main_ns(vec![shape_match_fn(true)], shape_decls())]);
    let (out, _) = emit_main(
        &asm,
        ns_inst(vec![("area", FnInst::once())], shape_insts()),
    );

    assert!(
        !out.contains("_$exhaustive("),
        "guard on exhaustive match:\n{out}"
    );
    assert!(out.contains("else {"));
}

#[test]
fn test_non_exhaustive_match_gets_runtime_guard() {
    let asm = Assembly::with_core(vec![main_ns(vec![shape_match_fn(false)], shape_decls())]);
    let (out, _) = emit_main(
        &asm,
        ns_inst(vec![("area", FnInst::once())], shape_insts()),
    );

    assert!(
        out.contains("_$exhaustive(("),
        "non-exhaustive match must assert its final guard:\n{out}"
    );
    assert!(out.contains("exhaustive match @ main.arb:20"));
}

#[test]
fn test_non_exhaustive_switch_gets_runtime_guard() {
    let arm = |lit: i64, ret: i64| arbor::ast::SwitchArm {
        lval: Some(Expr::LitInt(lit)),
        optype: int(),
        body: Block {
            statements: vec![Stmt::ReturnSingle {
                exp: Expr::LitInt(ret),
            }],
        },
    };
    let f = main_fn(
        "pick",
        vec![ParamDecl::plain("n", int())],
        int(),
        BodyImpl::Standard(vec![Stmt::Switch {
            sval: Expr::AccessVar {
                name: "n".to_string(),
            },
            arms: vec![arm(1, 10), arm(2, 20)],
            must_exhaustive: false,
            sinfo: span_at(30),
        }]),
    );
    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let (out, _) = emit_main(&asm, ns_inst(vec![("pick", FnInst::once())], vec![]));

    assert!(out.contains("_$exhaustive(_$fkeq.Int(n, 2n)"));
}

// ============================================
// Supertype table & entry point
// ============================================

#[test]
fn test_datatype_members_get_supertype_entries() {
    let asm = Assembly::with_core(vec![main_ns(vec![shape_match_fn(true)], shape_decls())]);
    let (out, _) = emit_main(
        &asm,
        ns_inst(vec![("area", FnInst::once())], shape_insts()),
    );

    assert!(out.contains(
        "_$supertypes[Symbol.for(\"Main::Circle\")] = [Symbol.for(\"Main::Shape\")];"
    ));
    assert!(out.contains(
        "_$supertypes[Symbol.for(\"Main::Square\")] = [Symbol.for(\"Main::Shape\")];"
    ));
    // the abstract head never gets its own entry
    assert!(!out.contains("_$supertypes[Symbol.for(\"Main::Shape\")]"));
}

#[test]
fn test_main_namespace_gets_entry_point() {
    let asm = Assembly::with_core(vec![main_ns(
        vec![main_fn(
            "main",
            vec![],
            int(),
            BodyImpl::Expression(Expr::LitInt(0)),
        )],
        vec![],
    )]);
    let (out, _) = emit_main(&asm, ns_inst(vec![("main", FnInst::once())], vec![]));

    assert!(out.contains("process.stdout.write(`${main()}\\n`)"));
}

// ============================================
// Namespace constants & binders
// ============================================

#[test]
fn test_namespace_const_is_memoized() {
    let ns = NamespaceDecl {
        name: "Main".to_string(),
        file: MAIN_FILE.to_string(),
        consts: vec![ConstDecl {
            name: "limit".to_string(),
            file: MAIN_FILE.to_string(),
            value: Expr::LitInt(100),
            sinfo: span_at(1),
        }],
        functions: vec![],
        typedecls: vec![],
    };
    let asm = Assembly::with_core(vec![ns]);
    let (out, _) = emit_main(&asm, ns_inst(vec![], vec![]));

    assert!(out.contains(
        "export function limit() { return _$memoconstval(_$consts, \"Main::limit\", () => 100n); }"
    ));
}

#[test]
fn test_binder_declared_once_and_bound_in_both_branches() {
    let opt_int = TypeSig::core("Option", vec![int()]);
    let f = main_fn(
        "unwrapish",
        vec![ParamDecl::plain("v", opt_int.clone())],
        int(),
        BodyImpl::Standard(vec![Stmt::IfElse {
            cond: CondInfo {
                exp: Box::new(Expr::AccessVar {
                    name: "v".to_string(),
                }),
                vtype: opt_int,
                itest: Some(ITest::is(ITestKind::Some)),
            },
            binder: Some(BinderInfo {
                scope_name: "$v".to_string(),
            }),
            then_block: Block {
                statements: vec![Stmt::ReturnSingle {
                    exp: Expr::LitInt(1),
                }],
            },
            else_block: Block {
                statements: vec![Stmt::ReturnSingle {
                    exp: Expr::LitInt(0),
                }],
            },
            sinfo: span_at(9),
        }]),
    );
    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let (out, _) = emit_main(&asm, ns_inst(vec![("unwrapish", FnInst::once())], vec![]));

    assert!(out.contains("var $v;"), "binder must be hoisted once:\n{out}");
    assert!(out.contains("$v = v._$asSome("));
    assert!(out.contains("$v = v._$asNotSome("));
    assert!(out.contains("if(v._$isSome())"));
}

// ============================================
// Diagnostics for unsupported constructs
// ============================================

#[test]
fn test_unsupported_construct_collects_diagnostic_and_continues() {
    let bad = main_fn(
        "bad",
        vec![],
        int(),
        BodyImpl::Standard(vec![Stmt::Unsupported {
            feature: "environment update".to_string(),
            sinfo: span_at(4),
        }]),
    );
    let good = main_fn("good", vec![], int(), BodyImpl::Expression(Expr::LitInt(1)));

    let asm = Assembly::with_core(vec![main_ns(vec![bad, good], vec![])]);
    let (out, output) = emit_main(
        &asm,
        ns_inst(
            vec![("bad", FnInst::once()), ("good", FnInst::once())],
            vec![],
        ),
    );

    assert_eq!(output.diagnostics.len(), 1);
    assert!(out.contains("export function good"), "lowering must continue past gaps");
}

// ============================================
// Release-mode diagnostics
// ============================================

#[test]
fn test_release_mode_emits_tag_only_diagnostics() {
    let pre = PreconditionDecl {
        exp: Expr::LitBool(true),
        text: "x is fine".to_string(),
        level: BuildLevel::Release,
        is_soft: false,
        tag: Some("P-X".to_string()),
        sinfo: span_at(6),
    };
    let mut f = main_fn(
        "guarded",
        vec![ParamDecl::plain("x", int())],
        int(),
        BodyImpl::Expression(Expr::AccessVar {
            name: "x".to_string(),
        }),
    );
    f.preconditions = vec![pre];

    let asm = Assembly::with_core(vec![main_ns(vec![f], vec![])]);
    let instmap = InstantiationMap {
        namespaces: vec![ns_inst(vec![("guarded", FnInst::once())], vec![])],
    };
    let profile = EmitProfile {
        mode: EmitMode::Release,
        level: BuildLevel::Release,
    };
    let output = emit_assembly(&asm, &instmap, profile).expect("emission failed");
    let out = &output.units.iter().find(|u| u.ns == "Main").unwrap().contents;

    assert!(out.contains("_$precond(true, \"P-X\");"));
    assert!(!out.contains("x is fine"));
    assert!(!out.contains("main.arb:6"));
}
