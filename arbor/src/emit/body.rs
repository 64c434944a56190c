//! Expression and statement lowering
//!
//! Recursive tree-walk over the closed checked forms. Every type
//! consulted here goes through `tproc` first; emission helpers only ever
//! see substituted types.

use crate::ast::{
    Block, BodyImpl, CondInfo, Expr, KeyEqKind, MatchArm, PostfixOpKind, Span, Stmt, SwitchArm,
    TypeSig,
};
use crate::binds::RtType;
use crate::cfg::{EmitMode, is_build_level_enabled};

use super::JsEmitter;
use super::fmt::CodeFormatter;
use super::names::{
    RESULT_ARG, accessor_for_ns_const, accessor_for_ns_function, accessor_for_type,
    accessor_for_type_function, operator_lookup_key, term_key_resolved,
};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

fn paren(toplevel: bool, text: String) -> String {
    if toplevel { text } else { format!("({text})") }
}

/// Quote a string literal for the emitted module
fn quote(text: &str) -> String {
    format!("{text:?}")
}

impl JsEmitter<'_> {
    fn op_key(&self, opertype: &TypeSig) -> String {
        operator_lookup_key(&self.tproc(opertype).tkey())
    }

    fn resolved_terms(&self, terms: &[TypeSig]) -> Vec<RtType> {
        terms.iter().map(|t| self.tproc(t)).collect()
    }

    /// Constructor reference for refinement re-checking on arithmetic
    /// whose result is a refinement value
    fn refinement_ctor_suffix(&self, restype: &TypeSig) -> String {
        let rt = self.tproc(restype);
        if self.is_primitive_type(&rt) {
            String::new()
        } else {
            format!(", {}.$create", accessor_for_type(self.current_ns(), &rt))
        }
    }

    pub(crate) fn emit_expression(&mut self, exp: &Expr, toplevel: bool) -> String {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.emit_expression_inner(exp, toplevel)
        })
    }

    fn emit_expression_inner(&mut self, exp: &Expr, toplevel: bool) -> String {
        match exp {
            Expr::LitNone => "_$None".to_string(),
            Expr::LitBool(b) => b.to_string(),
            Expr::LitInt(i) => format!("{i}n"),
            Expr::LitNat(n) => format!("{n}n"),
            Expr::LitFloat(f) => format!("{f}"),
            Expr::LitString(s) => quote(s),
            Expr::LitRegex(r) => format!("/{r}/"),

            Expr::AccessVar { name } => name.clone(),
            Expr::AccessNsConst { ns, name } => {
                format!("{}()", accessor_for_ns_const(self.current_ns(), ns, name))
            }
            Expr::AccessTypeConst { ttype, name } => {
                let rt = self.tproc(ttype);
                format!("{}.{name}()", accessor_for_type(self.current_ns(), &rt))
            }
            Expr::AccessEnum { ttype, variant } => {
                let rt = self.tproc(ttype);
                format!("{}.{variant}", accessor_for_type(self.current_ns(), &rt))
            }

            Expr::ConsPrimary { ctype, args } => {
                let rt = self.tproc(ctype);
                let taccess = accessor_for_type(self.current_ns(), &rt);
                let aargs: Vec<String> = args.iter().map(|a| self.emit_expression(a, true)).collect();
                format!("{taccess}.$create({})", aargs.join(", "))
            }
            Expr::ConsSpecial { ctype, arg } => {
                let rt = self.tproc(ctype);
                let taccess = accessor_for_type(self.current_ns(), &rt);
                format!("{taccess}.$create({})", self.emit_expression(arg, true))
            }
            Expr::ConsEList { args } => {
                let vals: Vec<String> = args.iter().map(|a| self.emit_expression(a, true)).collect();
                format!("[{}]", vals.join(", "))
            }
            Expr::ConsLambda { params, body } => {
                let bexp = self.emit_expression(body, true);
                format!("({}) => {bexp}", params.join(", "))
            }
            Expr::LambdaInvoke { name, args } => {
                let aargs: Vec<String> = args.iter().map(|a| self.emit_expression(a, true)).collect();
                format!("{name}({})", aargs.join(", "))
            }

            Expr::CallNsFunction {
                ns,
                name,
                terms,
                args,
            } => {
                let tterms = self.resolved_terms(terms);
                let accessor = accessor_for_ns_function(self.current_ns(), ns, name, &tterms);
                let aargs: Vec<String> = args.iter().map(|a| self.emit_expression(a, true)).collect();
                format!("{accessor}({})", aargs.join(", "))
            }
            Expr::CallTypeFunction {
                ttype,
                name,
                terms,
                args,
            } => {
                let rt = self.tproc(ttype);
                let tterms = self.resolved_terms(terms);
                let accessor = accessor_for_type_function(self.current_ns(), &rt, name, &tterms);
                let aargs: Vec<String> = args.iter().map(|a| self.emit_expression(a, true)).collect();
                format!("{accessor}({})", aargs.join(", "))
            }

            Expr::Postfix { root, ops } => {
                let mut eexp = self.emit_expression(root, false);
                for op in ops {
                    eexp = self.emit_postfix_op(eexp, op);
                }
                eexp
            }

            Expr::PrefixNot { exp, opertype } => {
                let rt = self.tproc(opertype);
                if self.is_primitive_type(&rt) {
                    paren(toplevel, format!("!{}", self.emit_expression(exp, false)))
                } else {
                    let ctor = format!("{}.$create", accessor_for_type(self.current_ns(), &rt));
                    format!("_$not({}, {ctor})", self.emit_expression(exp, true))
                }
            }
            Expr::PrefixNegate {
                exp,
                opertype,
                restype,
            } => {
                let rt = self.tproc(opertype);
                if self.is_primitive_type(&rt) {
                    paren(toplevel, format!("-{}", self.emit_expression(exp, false)))
                } else {
                    let key = self.op_key(opertype);
                    let ctor = self.refinement_ctor_suffix(restype);
                    format!("_$negate.{key}({}{ctor})", self.emit_expression(exp, true))
                }
            }

            Expr::BinAdd {
                lhs,
                rhs,
                opertype,
                restype,
            } => self.emit_checked_arith("_$add", lhs, rhs, opertype, restype),
            Expr::BinSub {
                lhs,
                rhs,
                opertype,
                restype,
            } => self.emit_checked_arith("_$sub", lhs, rhs, opertype, restype),
            Expr::BinMult {
                lhs,
                rhs,
                opertype,
                restype,
            } => self.emit_checked_arith("_$mult", lhs, rhs, opertype, restype),
            Expr::BinDiv {
                lhs,
                rhs,
                opertype,
                restype,
            } => self.emit_checked_arith("_$div", lhs, rhs, opertype, restype),

            Expr::KeyEq { lhs, rhs, kind } => match kind {
                KeyEqKind::LhsNone => format!("{}._$isNone()", self.emit_expression(rhs, false)),
                KeyEqKind::RhsNone => format!("{}._$isNone()", self.emit_expression(lhs, false)),
                KeyEqKind::StrictEq(opertype) => {
                    let key = self.op_key(opertype);
                    format!(
                        "_$fkeq.{key}({}, {})",
                        self.emit_expression(lhs, true),
                        self.emit_expression(rhs, true)
                    )
                }
            },
            Expr::KeyNeq { lhs, rhs, kind } => match kind {
                KeyEqKind::LhsNone => format!("{}._$isNotNone()", self.emit_expression(rhs, false)),
                KeyEqKind::RhsNone => format!("{}._$isNotNone()", self.emit_expression(lhs, false)),
                KeyEqKind::StrictEq(opertype) => {
                    let key = self.op_key(opertype);
                    format!(
                        "_$fkneq.{key}({}, {})",
                        self.emit_expression(lhs, true),
                        self.emit_expression(rhs, true)
                    )
                }
            },
            Expr::KeyLess { lhs, rhs, optype } => {
                let key = self.op_key(optype);
                format!(
                    "_$fkless.{key}({}, {})",
                    self.emit_expression(lhs, true),
                    self.emit_expression(rhs, true)
                )
            }

            Expr::NumericEq { lhs, rhs, opertype } => {
                self.emit_numeric_cmp("===", "_$fnumeq", false, lhs, rhs, opertype, toplevel)
            }
            Expr::NumericNeq { lhs, rhs, opertype } => {
                let rt = self.tproc(opertype);
                if self.is_primitive_type(&rt) {
                    paren(
                        toplevel,
                        format!(
                            "{} !== {}",
                            self.emit_expression(lhs, false),
                            self.emit_expression(rhs, false)
                        ),
                    )
                } else {
                    let key = self.op_key(opertype);
                    format!(
                        "(!_$fnumeq.{key}({}, {}))",
                        self.emit_expression(lhs, true),
                        self.emit_expression(rhs, true)
                    )
                }
            }
            Expr::NumericLess { lhs, rhs, opertype } => {
                self.emit_numeric_cmp("<", "_$fnumless", false, lhs, rhs, opertype, toplevel)
            }
            Expr::NumericLessEq { lhs, rhs, opertype } => {
                self.emit_numeric_cmp("<=", "_$fnumlesseq", false, lhs, rhs, opertype, toplevel)
            }
            Expr::NumericGreater { lhs, rhs, opertype } => {
                self.emit_numeric_cmp(">", "_$fnumless", true, lhs, rhs, opertype, toplevel)
            }
            Expr::NumericGreaterEq { lhs, rhs, opertype } => {
                self.emit_numeric_cmp(">=", "_$fnumlesseq", true, lhs, rhs, opertype, toplevel)
            }

            Expr::LogicAnd { lhs, rhs } => paren(
                toplevel,
                format!(
                    "{} && {}",
                    self.emit_expression(lhs, false),
                    self.emit_expression(rhs, false)
                ),
            ),
            Expr::LogicOr { lhs, rhs } => paren(
                toplevel,
                format!(
                    "{} || {}",
                    self.emit_expression(lhs, false),
                    self.emit_expression(rhs, false)
                ),
            ),
            Expr::LogicImplies { lhs, rhs } => paren(
                toplevel,
                format!(
                    "!{} || {}",
                    self.emit_expression(lhs, false),
                    self.emit_expression(rhs, false)
                ),
            ),

            Expr::IfExpr {
                test,
                binder,
                then_val,
                else_val,
                sinfo,
            } => {
                let texp = self.emit_expression(then_val, false);
                let fexp = self.emit_expression(else_val, false);

                match &test.itest {
                    None => {
                        let cond = self.emit_expression(&test.exp, false);
                        paren(toplevel, format!("{cond} ? {texp} : {fexp}"))
                    }
                    Some(itest) => {
                        let vval = self.emit_expression(&test.exp, false);
                        let ttest = self.emit_itest_as_test(&vval, &test.vtype, itest);
                        match binder {
                            None => paren(toplevel, format!("{ttest} ? {texp} : {fexp}")),
                            Some(b) => {
                                self.register_binder(&b.scope_name);
                                let btrue = self.emit_itest_as_convert(
                                    *sinfo,
                                    &vval,
                                    &test.vtype,
                                    itest,
                                    itest.isnot,
                                );
                                let bfalse = self.emit_itest_as_convert(
                                    *sinfo,
                                    &vval,
                                    &test.vtype,
                                    itest,
                                    !itest.isnot,
                                );
                                let name = &b.scope_name;
                                paren(
                                    toplevel,
                                    format!(
                                        "{ttest} ? ({name} = {btrue}, {texp}) : ({name} = {bfalse}, {fexp})"
                                    ),
                                )
                            }
                        }
                    }
                }
            }

            Expr::Unsupported { feature, sinfo } => {
                self.push_unimplemented(feature, *sinfo);
                format!(
                    "_$abort({})",
                    self.error_info(&format!("not implemented -- {feature}"), *sinfo, None)
                )
            }
        }
    }

    fn emit_checked_arith(
        &mut self,
        op: &str,
        lhs: &Expr,
        rhs: &Expr,
        opertype: &TypeSig,
        restype: &TypeSig,
    ) -> String {
        let key = self.op_key(opertype);
        let ctor = self.refinement_ctor_suffix(restype);
        format!(
            "{op}.{key}({}, {}{ctor})",
            self.emit_expression(lhs, true),
            self.emit_expression(rhs, true)
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_numeric_cmp(
        &mut self,
        raw_op: &str,
        helper: &str,
        swap: bool,
        lhs: &Expr,
        rhs: &Expr,
        opertype: &TypeSig,
        toplevel: bool,
    ) -> String {
        let rt = self.tproc(opertype);
        if self.is_primitive_type(&rt) {
            paren(
                toplevel,
                format!(
                    "{} {raw_op} {}",
                    self.emit_expression(lhs, false),
                    self.emit_expression(rhs, false)
                ),
            )
        } else {
            let key = self.op_key(opertype);
            let (a, b) = if swap { (rhs, lhs) } else { (lhs, rhs) };
            format!(
                "{helper}.{key}({}, {})",
                self.emit_expression(a, true),
                self.emit_expression(b, true)
            )
        }
    }

    fn emit_postfix_op(&mut self, val: String, op: &PostfixOpKind) -> String {
        match op {
            PostfixOpKind::AccessField { name } => format!("{val}.{name}"),
            PostfixOpKind::AccessIndex { idx } => format!("{val}[{idx}]"),
            PostfixOpKind::IsTest { ttest, vtype } => {
                self.emit_itest_as_test(&val, vtype, ttest)
            }
            PostfixOpKind::AsConvert {
                ttest,
                vtype,
                sinfo,
            } => self.emit_itest_as_convert(*sinfo, &val, vtype, ttest, ttest.isnot),
            PostfixOpKind::Invoke {
                resolved_type,
                vtype,
                name,
                terms,
                args,
            } => {
                let aargs: Vec<String> = args.iter().map(|a| self.emit_expression(a, true)).collect();
                let rcvr = self.tproc(vtype);
                let tterms = self.resolved_terms(terms);

                if self.is_boxed_repr(&rcvr) {
                    if tterms.is_empty() {
                        format!("{val}.{name}({})", aargs.join(", "))
                    } else {
                        // generic method through the dynamic table dispatcher,
                        // avoids re-evaluating the receiver expression
                        let sep = if aargs.is_empty() { "" } else { ", " };
                        format!(
                            "{val}.$scall(\"{name}\", \"{}\"{sep}{})",
                            term_key_resolved(&tterms),
                            aargs.join(", ")
                        )
                    }
                } else {
                    let decl_rt = self.tproc(resolved_type);
                    let mut accessor =
                        format!("{}.{name}", accessor_for_type(self.current_ns(), &decl_rt));
                    if !tterms.is_empty() {
                        accessor = format!("{accessor}[\"{}\"]", term_key_resolved(&tterms));
                    }
                    let sep = if aargs.is_empty() { "" } else { ", " };
                    format!("{accessor}.call({val}{sep}{})", aargs.join(", "))
                }
            }
            PostfixOpKind::VirtualInvoke { name, sinfo } => {
                self.push_unimplemented("virtual method dispatch", *sinfo);
                format!(
                    "_$abort({})",
                    self.error_info(&format!("not implemented -- virtual invoke {name}"), *sinfo, None)
                )
            }
        }
    }

    // === statements =====================================================

    pub(crate) fn emit_statement(&mut self, stmt: &Stmt, fmt: &mut CodeFormatter) -> String {
        match stmt {
            Stmt::Empty => ";".to_string(),
            Stmt::VarDecl { name } => format!("let {name};"),
            Stmt::VarInit {
                name,
                is_const,
                exp,
            } => {
                let rhs = self.emit_expression(exp, true);
                if name == "_" {
                    format!("{rhs};")
                } else {
                    let kw = if *is_const { "const" } else { "let" };
                    format!("{kw} {name} = {rhs};")
                }
            }
            Stmt::VarAssign { name, exp } => {
                let rhs = self.emit_expression(exp, true);
                if name == "_" {
                    format!("{rhs};")
                } else {
                    format!("{name} = {rhs};")
                }
            }
            Stmt::ReturnVoid => match self.return_complete().cloned() {
                None => "return;".to_string(),
                Some(call) => format!("return {};", call.replace(RESULT_ARG, "undefined")),
            },
            Stmt::ReturnSingle { exp } => {
                let rexp = self.emit_expression(exp, true);
                match self.return_complete().cloned() {
                    None => format!("return {rexp};"),
                    Some(call) => format!("return {};", call.replace(RESULT_ARG, &rexp)),
                }
            }
            Stmt::If {
                cond,
                binder,
                then_block,
                sinfo,
            } => self.emit_if_statement(cond, binder.as_ref(), then_block, *sinfo, fmt),
            Stmt::IfElse {
                cond,
                binder,
                then_block,
                else_block,
                sinfo,
            } => self.emit_if_else_statement(
                cond,
                binder.as_ref(),
                then_block,
                else_block,
                *sinfo,
                fmt,
            ),
            Stmt::IfElifElse {
                condflow,
                else_block,
            } => {
                let mut parts: Vec<String> = Vec::new();
                for (ii, (cond, block)) in condflow.iter().enumerate() {
                    let kw = if ii == 0 {
                        "if".to_string()
                    } else {
                        fmt.indent("else if")
                    };
                    let test = self.emit_expression(cond, true);
                    let body = self.emit_block(block, fmt);
                    parts.push(format!("{kw}({test}) {body}\n"));
                }
                let eeop = self.emit_block(else_block, fmt);
                format!("{}{}{eeop}", parts.join(""), fmt.indent("else "))
            }
            Stmt::Switch {
                sval,
                arms,
                must_exhaustive,
                sinfo,
            } => self.emit_switch_statement(sval, arms, *must_exhaustive, *sinfo, fmt),
            Stmt::Match {
                sval,
                vtype,
                binder,
                arms,
                implicit_final_type,
                must_exhaustive,
                sinfo,
            } => self.emit_match_statement(
                sval,
                vtype,
                binder.as_ref(),
                arms,
                implicit_final_type.as_ref(),
                *must_exhaustive,
                *sinfo,
                fmt,
            ),
            Stmt::Block(block) => self.emit_block(block, fmt),
            Stmt::Abort { sinfo } => {
                format!("_$abort({});", self.error_info("abort", *sinfo, None))
            }
            Stmt::Assert {
                cond,
                text,
                level,
                sinfo,
            } => {
                if !is_build_level_enabled(*level, self.profile().level) {
                    ";".to_string()
                } else {
                    let eexp = self.emit_expression(cond, true);
                    format!("_$assert({eexp}, {});", self.error_info(text, *sinfo, None))
                }
            }
            Stmt::Validate {
                cond,
                text,
                tag,
                sinfo,
            } => {
                let eexp = self.emit_expression(cond, true);
                format!(
                    "_$validate({eexp}, {});",
                    self.error_info(text, *sinfo, tag.as_deref())
                )
            }
            Stmt::Debug { value, sinfo } => {
                if self.profile().mode == EmitMode::Release {
                    ";".to_string()
                } else {
                    let eexp = self.emit_expression(value, true);
                    format!(
                        "try {{ console.log(\"_debug>> \" + {eexp}); }} catch {{ console.log(\"error evaluating debug statement @ line {}\"); }}",
                        sinfo.line
                    )
                }
            }
            Stmt::Unsupported { feature, sinfo } => {
                self.push_unimplemented(feature, *sinfo);
                format!(
                    "_$abort({});",
                    self.error_info(&format!("not implemented -- {feature}"), *sinfo, None)
                )
            }
        }
    }

    fn emit_if_statement(
        &mut self,
        cond: &CondInfo,
        binder: Option<&crate::ast::BinderInfo>,
        then_block: &Block,
        sinfo: Span,
        fmt: &mut CodeFormatter,
    ) -> String {
        match (&cond.itest, binder) {
            (None, _) => {
                let test = self.emit_expression(&cond.exp, true);
                let body = self.emit_block(then_block, fmt);
                format!("if({test}) {body}")
            }
            (Some(itest), None) => {
                let vexp = self.emit_expression(&cond.exp, true);
                let test = self.emit_itest_as_test(&vexp, &cond.vtype, itest);
                let body = self.emit_block(then_block, fmt);
                format!("if({test}) {body}")
            }
            (Some(itest), Some(b)) => {
                self.register_binder(&b.scope_name);
                let vexp = self.emit_expression(&cond.exp, false);
                let test = self.emit_itest_as_test(&vexp, &cond.vtype, itest);
                let bexp = self.emit_itest_as_convert(sinfo, &vexp, &cond.vtype, itest, itest.isnot);

                fmt.indent_push();
                let body = self.emit_block(then_block, fmt);
                let bassign = fmt.indent(&format!("{} = {bexp}; {body}", b.scope_name));
                fmt.indent_pop();

                format!("if({test}) {{\n{bassign}\n{}", fmt.indent("}"))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_if_else_statement(
        &mut self,
        cond: &CondInfo,
        binder: Option<&crate::ast::BinderInfo>,
        then_block: &Block,
        else_block: &Block,
        sinfo: Span,
        fmt: &mut CodeFormatter,
    ) -> String {
        match (&cond.itest, binder) {
            (None, _) => {
                let test = self.emit_expression(&cond.exp, true);
                let tbody = self.emit_block(then_block, fmt);
                let fbody = self.emit_block(else_block, fmt);
                format!("if({test}) {tbody}\n{}else {fbody}", fmt.indent(""))
            }
            (Some(itest), None) => {
                let vexp = self.emit_expression(&cond.exp, true);
                let test = self.emit_itest_as_test(&vexp, &cond.vtype, itest);
                let tbody = self.emit_block(then_block, fmt);
                let fbody = self.emit_block(else_block, fmt);
                format!("if({test}) {tbody}\n{}else {fbody}", fmt.indent(""))
            }
            (Some(itest), Some(b)) => {
                self.register_binder(&b.scope_name);
                let vexp = self.emit_expression(&cond.exp, false);
                let test = self.emit_itest_as_test(&vexp, &cond.vtype, itest);
                let btrue = self.emit_itest_as_convert(sinfo, &vexp, &cond.vtype, itest, itest.isnot);
                let bfalse =
                    self.emit_itest_as_convert(sinfo, &vexp, &cond.vtype, itest, !itest.isnot);

                fmt.indent_push();
                let tbody = self.emit_block(then_block, fmt);
                let tassign = fmt.indent(&format!("{} = {btrue}; {tbody}", b.scope_name));
                let fbody = self.emit_block(else_block, fmt);
                let fassign = fmt.indent(&format!("{} = {bfalse}; {fbody}", b.scope_name));
                fmt.indent_pop();

                format!(
                    "if({test}) {{\n{tassign}\n{close}\n{els}\n{fassign}\n{close}",
                    close = fmt.indent("}"),
                    els = fmt.indent("else {")
                )
            }
        }
    }

    fn emit_switch_statement(
        &mut self,
        sval: &Expr,
        arms: &[SwitchArm],
        must_exhaustive: bool,
        sinfo: Span,
        fmt: &mut CodeFormatter,
    ) -> String {
        let val = self.emit_expression(sval, true);
        let mut parts: Vec<String> = Vec::new();

        for (ii, arm) in arms[..arms.len() - 1].iter().enumerate() {
            // a wildcard before the final arm is a checker fault; guard
            // with a vacuous test rather than halting the pass
            let guard = match &arm.lval {
                Some(lval) => {
                    let cval = self.emit_expression(lval, true);
                    let key = self.op_key(&arm.optype);
                    format!("_$fkeq.{key}({val}, {cval})")
                }
                None => "true".to_string(),
            };
            let cbody = self.emit_block(&arm.body, fmt);
            let prefix = if ii != 0 {
                fmt.indent("else ")
            } else {
                String::new()
            };
            parts.push(format!("{prefix}if ({guard}) {cbody}"));
        }

        let final_arm = &arms[arms.len() - 1];
        let elseval = match (&final_arm.lval, must_exhaustive) {
            (None, _) | (_, true) => {
                let body = self.emit_block(&final_arm.body, fmt);
                fmt.indent(&format!("else {body}"))
            }
            (Some(lval), false) => {
                // guard still evaluated at runtime, wrapped in the
                // exhaustiveness assertion
                fmt.indent_push();
                let raw_body = self.emit_block(&final_arm.body, fmt);
                let body = fmt.indent(&raw_body);
                let cval = self.emit_expression(lval, true);
                let key = self.op_key(&final_arm.optype);
                let chk = fmt.indent(&format!(
                    "_$exhaustive(_$fkeq.{key}({val}, {cval}), {});",
                    self.error_info("exhaustive switch", sinfo, None)
                ));
                fmt.indent_pop();
                fmt.indent(&format!("else {{\n{chk}\n{body}\n{}", fmt.indent("}")))
            }
        };

        parts.push(elseval);
        parts.join("\n")
    }

    fn emit_match_case(
        &mut self,
        mtype: &TypeSig,
        body: &Block,
        vval: &str,
        vtype: &TypeSig,
        binder: Option<&crate::ast::BinderInfo>,
        fmt: &mut CodeFormatter,
    ) -> (String, String) {
        let tm = self.tproc(mtype);
        let tv = self.tproc(vtype);
        let itest = crate::ast::ITest::is(crate::ast::ITestKind::Type(tm.sig().clone()));
        // both sides already substituted; run through the test lowering
        // with no extra mapping applied
        let ttest = format!(
            "({})",
            self.emit_itest_as_test(vval, tv.sig(), &itest)
        );

        match binder {
            None => (ttest, self.emit_block(body, fmt)),
            Some(b) => {
                self.register_binder(&b.scope_name);
                fmt.indent_push();
                let blck = self.emit_block(body, fmt);
                fmt.indent_pop();
                (
                    ttest,
                    format!("{{ {} = {vval}; {blck}\n{}", b.scope_name, fmt.indent("}")),
                )
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_match_statement(
        &mut self,
        sval: &Expr,
        vtype: &TypeSig,
        binder: Option<&crate::ast::BinderInfo>,
        arms: &[MatchArm],
        implicit_final_type: Option<&TypeSig>,
        must_exhaustive: bool,
        sinfo: Span,
        fmt: &mut CodeFormatter,
    ) -> String {
        let val = self.emit_expression(sval, true);
        let mut parts: Vec<String> = Vec::new();

        for (ii, arm) in arms[..arms.len() - 1].iter().enumerate() {
            // a wildcard before the final arm is a checker fault; test
            // against the scrutinee's own type rather than halting
            let mtype = arm.mtype.clone().unwrap_or_else(|| vtype.clone());
            let (test, body) = self.emit_match_case(&mtype, &arm.body, &val, vtype, binder, fmt);
            let prefix = if ii != 0 {
                fmt.indent("else if ")
            } else {
                "if ".to_string()
            };
            parts.push(format!("{prefix}{test} {body}"));
        }

        let final_arm = &arms[arms.len() - 1];
        let final_type = final_arm
            .mtype
            .as_ref()
            .or(implicit_final_type)
            .cloned()
            .unwrap_or(TypeSig::core("None", vec![]));

        let elseval = if must_exhaustive {
            let (_, body) =
                self.emit_match_case(&final_type, &final_arm.body, &val, vtype, binder, fmt);
            fmt.indent(&format!("else {body}"))
        } else {
            fmt.indent_push();
            let (test, body) =
                self.emit_match_case(&final_type, &final_arm.body, &val, vtype, binder, fmt);
            let chk = fmt.indent(&format!(
                "_$exhaustive({test}, {});",
                self.error_info("exhaustive match", sinfo, None)
            ));
            let bbody = fmt.indent(&body);
            fmt.indent_pop();
            fmt.indent(&format!("else {{\n{chk}\n{bbody}\n{}", fmt.indent("}")))
        };

        parts.push(elseval);
        parts.join("\n")
    }

    pub(crate) fn emit_statement_array(
        &mut self,
        stmts: &[Stmt],
        fmt: &mut CodeFormatter,
    ) -> Vec<String> {
        fmt.indent_push();
        let out: Vec<String> = stmts
            .iter()
            .map(|s| {
                let text = self.emit_statement(s, fmt);
                fmt.indent(&text)
            })
            .collect();
        fmt.indent_pop();
        out
    }

    pub(crate) fn emit_block(&mut self, block: &Block, fmt: &mut CodeFormatter) -> String {
        let stmts = self.emit_statement_array(&block.statements, fmt);
        format!("{{\n{}\n{}", stmts.join("\n"), fmt.indent("}"))
    }

    /// Assemble a full invocable body: binder prologue, default
    /// initializers, preconditions, ref-parameter snapshots, then the
    /// statements. Returns `None` for abstract bodies.
    pub(crate) fn emit_body_implementation(
        &mut self,
        body: &BodyImpl,
        param_names: &[String],
        initializers: &[String],
        preconds: &[String],
        refsaves: &[String],
        return_complete: Option<String>,
        fmt: &mut CodeFormatter,
    ) -> Option<String> {
        let stmts: Vec<String> = match body {
            BodyImpl::Abstract => return None,
            BodyImpl::Builtin(key) => {
                fmt.indent_push();
                let line = fmt.indent(&format!(
                    "return _$builtin[\"{key}\"]({});",
                    param_names.join(", ")
                ));
                fmt.indent_pop();
                vec![line]
            }
            BodyImpl::Expression(exp) => {
                fmt.indent_push();
                let line = fmt.indent(&format!("return {};", self.emit_expression(exp, true)));
                fmt.indent_pop();
                vec![line]
            }
            BodyImpl::Standard(body_stmts) => {
                let saved = self.return_complete().cloned();
                self.set_return_complete(return_complete);
                let out = self.emit_statement_array(body_stmts, fmt);
                self.set_return_complete(saved);
                out
            }
        };

        let binders = self.take_binders();
        let mut lines: Vec<String> = Vec::new();

        fmt.indent_push();
        if !binders.is_empty() {
            lines.push(fmt.indent(&format!("var {};", binders.join(", "))));
        }
        for ii in initializers {
            lines.push(fmt.indent(ii));
        }
        for pc in preconds {
            lines.push(fmt.indent(pc));
        }
        for rs in refsaves {
            lines.push(fmt.indent(rs));
        }
        fmt.indent_pop();

        lines.extend(stmts);
        Some(format!("{{\n{}\n{}", lines.join("\n"), fmt.indent("}")))
    }
}
