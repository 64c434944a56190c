//! Contract and construction codegen
//!
//! Assembles constructor and invocable prologues in the fixed order:
//! default initialization, format validation, invariants, validates
//! (API construction only), materialization. Postconditions route the
//! return path through a synthesized on-complete fragment.

use crate::ast::{
    FieldInfo, FormatSpec, InvariantDecl, ParamDecl, PostconditionDecl, PreconditionDecl,
    TypeDecl, TypeDeclKind, TypeSig, ValidateDecl,
};
use crate::binds::RtType;
use crate::cfg::is_build_level_enabled;

use super::JsEmitter;
use super::fmt::CodeFormatter;
use super::names::accessor_for_type;

impl JsEmitter<'_> {
    /// `$checkinv_<line>_<pos>`, one check function per contract site
    fn checkinv_name(sinfo: crate::ast::Span) -> String {
        format!("$checkinv_{}_{}", sinfo.line, sinfo.start)
    }

    /// Default-parameter initialization for an invocable, left-to-right
    /// by declaration position (dependency cycles are not detected)
    pub(crate) fn emit_parameter_initializers(&mut self, params: &[ParamDecl]) -> Vec<String> {
        let mut inits: Vec<String> = Vec::new();
        for p in params {
            if let Some(dv) = &p.default_value {
                let dexp = self.emit_expression(dv, true);
                inits.push(format!(
                    "if({name} === undefined) {{ ${name} = {name} = {dexp}; }}",
                    name = p.name
                ));
            }
        }

        if inits.is_empty() {
            return inits;
        }

        let shadows: Vec<String> = params.iter().map(|p| format!("${0} = {0}", p.name)).collect();
        let mut out = vec![format!("let {};", shadows.join(", "))];
        out.append(&mut inits);
        out
    }

    /// Level-gated precondition checks
    pub(crate) fn emit_requires(&mut self, requires: &[PreconditionDecl]) -> Vec<String> {
        let mut preconds: Vec<String> = Vec::new();
        for pre in requires {
            if !is_build_level_enabled(pre.level, self.profile().level) {
                continue;
            }
            let eexp = self.emit_expression(&pre.exp, true);
            let info = self.error_info(&pre.text, pre.sinfo, pre.tag.as_deref());
            if pre.is_soft {
                preconds.push(format!("_$softprecond({eexp}, {info});"));
            } else {
                preconds.push(format!("_$precond({eexp}, {info});"));
            }
        }
        preconds
    }

    /// Pre-state snapshots of by-reference parameters, captured before
    /// the body runs
    pub(crate) fn emit_ref_saves(&mut self, params: &[ParamDecl]) -> Vec<String> {
        params
            .iter()
            .filter(|p| p.is_ref)
            .map(|p| format!("let ${0} = {0};", p.name))
            .collect()
    }

    /// Level-gated postcondition checks for the on-complete fragment
    pub(crate) fn emit_ensures(&mut self, ensures: &[PostconditionDecl]) -> Vec<String> {
        let mut postconds: Vec<String> = Vec::new();
        for post in ensures {
            if !is_build_level_enabled(post.level, self.profile().level) {
                continue;
            }
            let eexp = self.emit_expression(&post.exp, true);
            let info = self.error_info(&post.text, post.sinfo, post.tag.as_deref());
            if post.is_soft {
                postconds.push(format!("_$softpostcond({eexp}, {info});"));
            } else {
                postconds.push(format!("_$postcond({eexp}, {info});"));
            }
        }
        postconds
    }

    /// Per-site invariant check functions declared on the type object
    pub(crate) fn emit_invariant_decls(
        &mut self,
        tdecl: &TypeDecl,
        invariants: &[InvariantDecl],
    ) -> Vec<String> {
        let mut decls: Vec<String> = Vec::new();
        for inv in invariants {
            if !is_build_level_enabled(inv.level, self.profile().level) {
                continue;
            }
            let args = self.check_args_of(tdecl);
            let body = self.emit_expression(&inv.exp, true);
            decls.push(format!(
                "{}: {{ value: ({args}) => {body} }}",
                Self::checkinv_name(inv.sinfo)
            ));
        }
        decls
    }

    /// Validate check functions; never level-gated
    pub(crate) fn emit_validate_decls(
        &mut self,
        tdecl: &TypeDecl,
        validates: &[ValidateDecl],
    ) -> Vec<String> {
        let mut decls: Vec<String> = Vec::new();
        for v in validates {
            let args = self.check_args_of(tdecl);
            let body = self.emit_expression(&v.exp, true);
            decls.push(format!(
                "{}: {{ value: ({args}) => {body} }}",
                Self::checkinv_name(v.sinfo)
            ));
        }
        decls
    }

    fn check_args_of(&self, tdecl: &TypeDecl) -> String {
        if matches!(tdecl.kind, TypeDeclKind::Refinement { .. }) {
            "$value".to_string()
        } else {
            tdecl
                .saturated_fields
                .iter()
                .map(|f| format!("${}", f.name))
                .collect::<Vec<String>>()
                .join(", ")
        }
    }

    /// `$default$<field>` functions for defaulted member fields
    pub(crate) fn emit_member_field_defaults(&mut self, tdecl: &TypeDecl) -> Vec<String> {
        let mut decls: Vec<String> = Vec::new();
        let aargs: Vec<String> = tdecl
            .saturated_fields
            .iter()
            .map(|f| format!("${}", f.name))
            .collect();
        for f in &tdecl.fields {
            if let Some(dv) = &f.default_value {
                let dexp = self.emit_expression(dv, true);
                decls.push(format!(
                    "$default${}: {{ value: ({}) => {dexp} }}",
                    f.name,
                    aargs.join(", ")
                ));
            }
        }
        decls
    }

    /// Default-field initialization, left-to-right over the saturated
    /// field list (dependency cycles are not detected)
    fn emit_default_field_initializers(&mut self, ffinfo: &[FieldInfo]) -> Vec<String> {
        let mut inits: Vec<String> = Vec::new();
        for f in ffinfo {
            if f.has_default {
                let aargs: Vec<String> = ffinfo.iter().map(|fi| format!("${}", fi.name)).collect();
                let containing = self.tproc(&f.containing);
                let icall = format!(
                    "{}.$default${}({})",
                    accessor_for_type(self.current_ns(), &containing),
                    f.name,
                    aargs.join(", ")
                );
                inits.push(format!(
                    "if({name} === undefined) {{ ${name} = {name} = {icall}; }}",
                    name = f.name
                ));
            }
        }

        if inits.is_empty() {
            return inits;
        }

        let shadows: Vec<String> = ffinfo.iter().map(|f| format!("${0} = {0}", f.name)).collect();
        let mut out = vec![format!("let {};", shadows.join(", "))];
        out.append(&mut inits);
        out
    }

    /// Format-constraint check for refinement declarations
    fn emit_format_checks(&mut self, tdecl: &TypeDecl) -> Vec<String> {
        let TypeDeclKind::Refinement {
            format: Some(FormatSpec { regex, tag, sinfo }),
            ..
        } = &tdecl.kind
        else {
            return Vec::new();
        };
        let info = self.error_info("failed format check", *sinfo, tag.as_deref());
        vec![format!(
            "_$formatchk(_$accepts(/{regex}/, value, {}), {info});",
            self.current_inns()
        )]
    }

    /// Invariant check calls over the saturated field list
    fn emit_invariant_calls(&mut self, tdecl: &TypeDecl) -> Vec<String> {
        let mut calls: Vec<String> = Vec::new();
        for inv in &tdecl.all_invariants {
            if !is_build_level_enabled(inv.level, self.profile().level) {
                continue;
            }
            let containing = self.tproc(&inv.containing);
            let chkcall = format!(
                "{}.{}",
                accessor_for_type(self.current_ns(), &containing),
                Self::checkinv_name(inv.sinfo)
            );
            let args = Self::constructor_params(tdecl);
            let info = self.error_info("failed invariant", inv.sinfo, inv.tag.as_deref());
            calls.push(format!("_$invariant({chkcall}({args}), {info});"));
        }
        calls
    }

    /// Validate check calls; enabled at every build level
    fn emit_validate_calls(&mut self, tdecl: &TypeDecl) -> Vec<String> {
        let mut calls: Vec<String> = Vec::new();
        for v in &tdecl.all_validates {
            let containing = self.tproc(&v.containing);
            let chkcall = format!(
                "{}.{}",
                accessor_for_type(self.current_ns(), &containing),
                Self::checkinv_name(v.sinfo)
            );
            let args = Self::constructor_params(tdecl);
            let info = self.error_info("failed validation", v.sinfo, v.tag.as_deref());
            calls.push(format!("_$validate({chkcall}({args}), {info});"));
        }
        calls
    }

    /// Constructor parameter list, doubling as the argument list for the
    /// check calls: the defaulting prologue reassigns the plain names, so
    /// they are always current at check time
    fn constructor_params(tdecl: &TypeDecl) -> String {
        if matches!(tdecl.kind, TypeDeclKind::Refinement { .. }) {
            return "value".to_string();
        }
        tdecl
            .saturated_fields
            .iter()
            .map(|f| f.name.clone())
            .collect::<Vec<String>>()
            .join(", ")
    }

    /// Final value composition from the (possibly defaulted) fields
    fn emit_materialization(&self, tdecl: &TypeDecl, rcvr: &RtType) -> String {
        if !tdecl.is_boxed_repr() {
            // refinements pass the underlying value through unboxed
            return "return value;".to_string();
        }
        let fieldargs: Vec<String> = tdecl
            .saturated_fields
            .iter()
            .map(|f| format!("{0}: {{ value: {0} }}", f.name))
            .collect();
        format!(
            "return Object.create({}, {{ {} }});",
            accessor_for_type(self.current_ns(), rcvr),
            fieldargs.join(", ")
        )
    }

    /// `$create`: defaults, format check, invariants, materialization,
    /// in that order and no other
    pub(crate) fn emit_create(
        &mut self,
        tdecl: &TypeDecl,
        rcvr: &RtType,
        fmt: &mut CodeFormatter,
    ) -> String {
        let ddecls = if matches!(tdecl.kind, TypeDeclKind::Refinement { .. }) {
            Vec::new()
        } else {
            self.emit_default_field_initializers(&tdecl.saturated_fields)
        };
        let rechks = self.emit_format_checks(tdecl);
        let cchks = self.emit_invariant_calls(tdecl);
        let ccons = self.emit_materialization(tdecl, rcvr);

        fmt.indent_push();
        let body: Vec<String> = ddecls
            .iter()
            .chain(rechks.iter())
            .chain(cchks.iter())
            .chain(std::iter::once(&ccons))
            .map(|line| fmt.indent(line))
            .collect();
        fmt.indent_pop();

        format!(
            "$create: {{ value: ({}) => {{\n{}\n{} }}",
            Self::constructor_params(tdecl),
            body.join("\n"),
            fmt.indent("}")
        )
    }

    /// `$createAPI` is the API-facing construction entry: like `$create`
    /// with the always-on validates between invariants and materialization
    pub(crate) fn emit_create_api(
        &mut self,
        tdecl: &TypeDecl,
        rcvr: &RtType,
        fmt: &mut CodeFormatter,
    ) -> String {
        let ddecls = if matches!(tdecl.kind, TypeDeclKind::Refinement { .. }) {
            Vec::new()
        } else {
            self.emit_default_field_initializers(&tdecl.saturated_fields)
        };
        let rechks = self.emit_format_checks(tdecl);
        let cchks = self.emit_invariant_calls(tdecl);
        let vchks = self.emit_validate_calls(tdecl);
        let ccons = self.emit_materialization(tdecl, rcvr);

        fmt.indent_push();
        let body: Vec<String> = ddecls
            .iter()
            .chain(rechks.iter())
            .chain(cchks.iter())
            .chain(vchks.iter())
            .chain(std::iter::once(&ccons))
            .map(|line| fmt.indent(line))
            .collect();
        fmt.indent_pop();

        format!(
            "$createAPI: {{ value: ({}) => {{\n{}\n{} }}",
            Self::constructor_params(tdecl),
            body.join("\n"),
            fmt.indent("}")
        )
    }

    /// Whether the type needs the API-facing constructor at all
    pub(crate) fn needs_create_api(tdecl: &TypeDecl) -> bool {
        tdecl.saturated_fields.iter().any(|f| f.has_default)
            || !tdecl.all_invariants.is_empty()
            || !tdecl.all_validates.is_empty()
            || matches!(
                &tdecl.kind,
                TypeDeclKind::Refinement {
                    format: Some(_),
                    ..
                }
            )
    }

    /// Supertype-table entry for one concrete instantiation
    pub(crate) fn emit_subtype_relation(
        &mut self,
        tdecl: &TypeDecl,
        tkey: &str,
        binds: Option<&crate::binds::BindingMap>,
    ) -> Option<String> {
        if !tdecl.emits_subtype_relation() {
            return None;
        }
        let supers: Vec<String> = tdecl
            .saturated_provides
            .iter()
            .map(|s| {
                let rt = RtType::resolve(s, binds);
                format!("Symbol.for(\"{}\")", rt.tkey())
            })
            .collect();
        Some(format!(
            "_$supertypes[Symbol.for(\"{tkey}\")] = [{}];",
            supers.join(", ")
        ))
    }

}

/// The `TypeSig` of a receiver for a declaration under concrete binds
pub(crate) fn rcvr_signature(
    ns: &str,
    tdecl: &TypeDecl,
    binds: Option<&crate::binds::BindingMap>,
) -> TypeSig {
    let args: Vec<TypeSig> = tdecl
        .terms
        .iter()
        .map(|t| match binds.and_then(|b| b.lookup(t)) {
            Some(concrete) => concrete.clone(),
            None => TypeSig::template(t),
        })
        .collect();
    TypeSig::nominal(ns, &tdecl.name, args)
}
