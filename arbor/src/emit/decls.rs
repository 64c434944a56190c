//! Declaration emission and the monomorphization driver
//!
//! Walks each namespace's declarations against the instantiation map:
//! one emitted code object per recorded concrete binding tuple, exactly
//! one for template-free declarations, nothing for declarations with no
//! record. The binding map for a member merges over its enclosing type's
//! map and is installed around that one declaration's lowering only.

use crate::ast::{ConstDecl, FnDecl, NamespaceDecl, TypeDecl, TypeDeclKind};
use crate::binds::{BindingMap, RtType};
use crate::error::{EmitError, Result};
use crate::instmap::{FnInst, NamespaceInst, TypeInst};

use super::JsEmitter;
use super::contracts::rcvr_signature;
use super::fmt::CodeFormatter;
use super::names::{RESULT_ARG, accessor_for_type, on_return_name, on_return_term_key, type_symbol};

/// Where an invocable lives, deciding its emitted wrapper and how the
/// return path addresses the on-complete fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvokeStyle {
    NsFunction,
    TypeFunction,
    Method { boxed: bool },
}

/// One lowered invocable instantiation
struct LoweredInvoke {
    body_decl: Option<String>,
    on_complete_decl: Option<String>,
}

impl JsEmitter<'_> {
    fn term_key_for(&self, decl_name: &str, terms: &[String], binds: &BindingMap) -> Result<String> {
        let mut keys: Vec<String> = Vec::new();
        for t in terms {
            match binds.lookup(t) {
                Some(ty) => keys.push(ty.tkey()),
                None => {
                    return Err(EmitError::inconsistent(
                        decl_name,
                        format!("no binding recorded for template parameter {t}"),
                    ));
                }
            }
        }
        Ok(format!("<{}>", keys.join(", ")))
    }

    /// The call template routing a return through the on-complete
    /// fragment; `RESULT_ARG` is replaced at each return site
    fn on_complete_call(
        &self,
        style: InvokeStyle,
        taccess: Option<&str>,
        fdecl: &FnDecl,
        term_key: Option<&str>,
    ) -> String {
        let mut args: Vec<String> = fdecl.params.iter().map(|p| p.name.clone()).collect();
        args.extend(
            fdecl
                .params
                .iter()
                .filter(|p| p.is_ref)
                .map(|p| format!("${}", p.name)),
        );
        args.push(RESULT_ARG.to_string());
        let argstr = args.join(", ");

        match (style, term_key) {
            (InvokeStyle::NsFunction, None) => {
                format!("{}({argstr})", on_return_name(&fdecl.name))
            }
            (InvokeStyle::NsFunction, Some(tk)) => {
                format!("{}[\"{}\"]({argstr})", fdecl.name, on_return_term_key(tk))
            }
            (InvokeStyle::TypeFunction, None) => {
                format!("{}.{}({argstr})", taccess.unwrap_or_default(), on_return_name(&fdecl.name))
            }
            (InvokeStyle::TypeFunction, Some(tk)) => format!(
                "{}.{}[\"{}\"]({argstr})",
                taccess.unwrap_or_default(),
                fdecl.name,
                on_return_term_key(tk)
            ),
            (InvokeStyle::Method { boxed: true }, None) => {
                format!("this.{}({argstr})", on_return_name(&fdecl.name))
            }
            (InvokeStyle::Method { boxed: true }, Some(tk)) => format!(
                "this.$scall(\"{}\", \"{}\", {argstr})",
                fdecl.name,
                on_return_term_key(tk)
            ),
            (InvokeStyle::Method { boxed: false }, None) => format!(
                "{}.{}.call(this, {argstr})",
                taccess.unwrap_or_default(),
                on_return_name(&fdecl.name)
            ),
            (InvokeStyle::Method { boxed: false }, Some(tk)) => format!(
                "{}.{}[\"{}\"].call(this, {argstr})",
                taccess.unwrap_or_default(),
                fdecl.name,
                on_return_term_key(tk)
            ),
        }
    }

    /// Lower one invocable under one binding tuple. The mapper (merged
    /// with the enclosing type's, when given) is installed around this
    /// declaration only and restored on exit.
    fn emit_invoke(
        &mut self,
        fdecl: &FnDecl,
        style: InvokeStyle,
        taccess: Option<&str>,
        enclosing: Option<&BindingMap>,
        mapping: Option<&BindingMap>,
        term_key: Option<&str>,
        fmt: &mut CodeFormatter,
    ) -> LoweredInvoke {
        let installed = if mapping.is_some() {
            BindingMap::try_merge(enclosing, mapping)
        } else {
            BindingMap::try_merge(enclosing, self.current_mapper())
        };

        self.with_mapper(installed, |em| {
            let param_names: Vec<String> = fdecl.params.iter().map(|p| p.name.clone()).collect();

            let initializers = em.emit_parameter_initializers(&fdecl.params);
            let preconds = em.emit_requires(&fdecl.preconditions);
            let ensures = em.emit_ensures(&fdecl.postconditions);
            let refsaves = if ensures.is_empty() {
                Vec::new()
            } else {
                em.emit_ref_saves(&fdecl.params)
            };

            let mut on_complete_decl: Option<String> = None;
            let mut return_complete: Option<String> = None;
            if !ensures.is_empty() {
                return_complete = Some(em.on_complete_call(style, taccess, fdecl, term_key));

                let mut oc_params = param_names.clone();
                oc_params.extend(
                    fdecl
                        .params
                        .iter()
                        .filter(|p| p.is_ref)
                        .map(|p| format!("${}", p.name)),
                );
                oc_params.push("$return".to_string());

                fmt.indent_push();
                let mut oc_lines: Vec<String> =
                    ensures.iter().map(|e| fmt.indent(e)).collect();
                oc_lines.push(fmt.indent("return $return;"));
                fmt.indent_pop();
                let oc_body = format!(
                    "({}) {{\n{}\n{}",
                    oc_params.join(", "),
                    oc_lines.join("\n"),
                    fmt.indent("}")
                );

                on_complete_decl = Some(match (style, term_key) {
                    (InvokeStyle::NsFunction, None) => {
                        format!("export function {}{oc_body}", on_return_name(&fdecl.name))
                    }
                    (InvokeStyle::NsFunction, Some(tk)) => {
                        format!("\"{}\": function{oc_body}", on_return_term_key(tk))
                    }
                    (_, None) => format!(
                        "{}: {{ value: function{oc_body} }}",
                        on_return_name(&fdecl.name)
                    ),
                    (_, Some(tk)) => {
                        format!("\"{}\": function{oc_body}", on_return_term_key(tk))
                    }
                });
            }

            let body = em.emit_body_implementation(
                &fdecl.body,
                &param_names,
                &initializers,
                &preconds,
                &refsaves,
                return_complete,
                fmt,
            );

            let body_decl = body.map(|b| {
                let sig = param_names.join(", ");
                match (style, term_key) {
                    (InvokeStyle::NsFunction, None) => {
                        format!("export function {}({sig}) {b}", fdecl.name)
                    }
                    (InvokeStyle::NsFunction, Some(tk)) => {
                        format!("\"{tk}\": function({sig}) {b}")
                    }
                    (_, None) => {
                        format!("{}: {{ value: function({sig}) {b} }}", fdecl.name)
                    }
                    (_, Some(tk)) => format!("\"{tk}\": function({sig}) {b}"),
                }
            });

            LoweredInvoke {
                body_decl,
                on_complete_decl,
            }
        })
    }

    /// Monomorphization loop for a set of invocables: nothing without a
    /// record, once for template-free declarations, once per recorded
    /// tuple otherwise
    fn emit_invoke_decls(
        &mut self,
        fdecls: &[FnDecl],
        lookup: &std::collections::BTreeMap<String, FnInst>,
        style: InvokeStyle,
        taccess: Option<&str>,
        enclosing: Option<&BindingMap>,
        fmt: &mut CodeFormatter,
    ) -> Result<Vec<String>> {
        let mut decls: Vec<String> = Vec::new();

        for fdecl in fdecls {
            let Some(fii) = lookup.get(&fdecl.name) else {
                // no observed use; omitted entirely
                continue;
            };
            self.set_current_file(&fdecl.file);

            match &fii.binds {
                None => {
                    if !fdecl.terms.is_empty() {
                        return Err(EmitError::inconsistent(
                            &fdecl.name,
                            "generic declaration recorded without binding tuples",
                        ));
                    }
                    let lowered =
                        self.emit_invoke(fdecl, style, taccess, enclosing, None, None, fmt);
                    if let Some(oc) = lowered.on_complete_decl {
                        decls.push(oc);
                    }
                    if let Some(b) = lowered.body_decl {
                        decls.push(b);
                    }
                }
                Some(binds) => {
                    if fdecl.terms.is_empty() {
                        return Err(EmitError::inconsistent(
                            &fdecl.name,
                            "template-free declaration recorded with binding tuples",
                        ));
                    }
                    fmt.indent_push();
                    let mut entries: Vec<String> = Vec::new();
                    for bind in binds {
                        let tk = self.term_key_for(&fdecl.name, &fdecl.terms, bind)?;
                        let lowered = self.emit_invoke(
                            fdecl,
                            style,
                            taccess,
                            enclosing,
                            Some(bind),
                            Some(tk.as_str()),
                            fmt,
                        );
                        if let Some(oc) = lowered.on_complete_decl {
                            entries.push(fmt.indent(&oc));
                        }
                        if let Some(b) = lowered.body_decl {
                            entries.push(fmt.indent(&b));
                        }
                    }
                    fmt.indent_pop();

                    if entries.is_empty() {
                        continue;
                    }
                    let table = format!("{{\n{}\n{}", entries.join(",\n"), fmt.indent("}"));
                    decls.push(match style {
                        InvokeStyle::NsFunction => {
                            format!("export const {} = {table};", fdecl.name)
                        }
                        _ => format!("{}: {{ value: {table} }}", fdecl.name),
                    });
                }
            }
        }

        Ok(decls)
    }

    /// Namespace-level functions
    pub(crate) fn emit_ns_function_decls(
        &mut self,
        nsdecl: &NamespaceDecl,
        nsinst: &NamespaceInst,
        fmt: &mut CodeFormatter,
    ) -> Result<Vec<String>> {
        self.emit_invoke_decls(
            &nsdecl.functions,
            &nsinst.functions,
            InvokeStyle::NsFunction,
            None,
            None,
            fmt,
        )
    }

    /// Namespace-level constants, memoized on first read
    pub(crate) fn emit_ns_const_decls(&mut self, nsdecl: &NamespaceDecl) -> Vec<String> {
        let mut decls: Vec<String> = Vec::new();
        for c in &nsdecl.consts {
            self.set_current_file(&c.file);
            let eexp = self.emit_expression(&c.value, true);
            decls.push(format!(
                "export function {name}() {{ return _$memoconstval(_$consts, \"{ns}::{name}\", () => {eexp}); }}",
                name = c.name,
                ns = nsdecl.name
            ));
        }
        decls
    }

    fn emit_type_const_decls(&mut self, tkey: &str, consts: &[ConstDecl]) -> Vec<String> {
        let mut decls: Vec<String> = Vec::new();
        for c in consts {
            let eexp = self.emit_expression(&c.value, true);
            decls.push(format!(
                "{name}: {{ value: () => _$memoconstval(_$consts, \"{tkey}::{name}\", () => {eexp}) }}",
                name = c.name
            ));
        }
        decls
    }

    fn emit_static_invoke_fn() -> String {
        "$scall: { value: function(name, tt, ...args) { return this[name][tt].call(this, ...args); } }"
            .to_string()
    }

    /// One type object for one concrete instantiation
    fn emit_type_instantiation(
        &mut self,
        nsdecl: &NamespaceDecl,
        tdecl: &TypeDecl,
        inst: &TypeInst,
        fmt: &mut CodeFormatter,
    ) -> Result<String> {
        let rcvr_sig = rcvr_signature(&nsdecl.name, tdecl, inst.binds.as_ref());
        let rcvr = RtType::resolve(&rcvr_sig, inst.binds.as_ref());
        let taccess = accessor_for_type(self.current_ns(), &rcvr);

        self.with_mapper(inst.binds.clone(), |em| {
            fmt.indent_push();
            let mut entries: Vec<String> = Vec::new();

            entries.push(format!("$tsym: {{ value: {} }}", type_symbol(&inst.tkey)));

            match &tdecl.kind {
                TypeDeclKind::Enum { variants } => {
                    for v in variants {
                        entries.push(format!("{v}: {{ value: \"{}::{v}\" }}", inst.tkey));
                    }
                }
                _ => {
                    entries.extend(em.emit_member_field_defaults(tdecl));
                    entries.extend(em.emit_invariant_decls(tdecl, &tdecl.invariants));
                    entries.extend(em.emit_validate_decls(tdecl, &tdecl.validates));

                    if em.type_has_constructor(tdecl) {
                        entries.push(em.emit_create(tdecl, &rcvr, fmt));
                        if Self::needs_create_api(tdecl) {
                            entries.push(em.emit_create_api(tdecl, &rcvr, fmt));
                        }
                    }
                }
            }

            entries.extend(em.emit_type_const_decls(&inst.tkey, &tdecl.consts));

            let fdecls = em.emit_invoke_decls(
                &tdecl.functions,
                &inst.function_binds,
                InvokeStyle::TypeFunction,
                Some(taccess.as_str()),
                inst.binds.as_ref(),
                fmt,
            )?;
            entries.extend(fdecls);

            let mdecls = em.emit_invoke_decls(
                &tdecl.methods,
                &inst.method_binds,
                InvokeStyle::Method {
                    boxed: tdecl.is_boxed_repr(),
                },
                Some(taccess.as_str()),
                inst.binds.as_ref(),
                fmt,
            )?;
            entries.extend(mdecls);

            if tdecl.is_boxed_repr() {
                entries.push(Self::emit_static_invoke_fn());
            }

            let body: Vec<String> = entries.iter().map(|e| fmt.indent(e)).collect();
            fmt.indent_pop();

            let proto = if tdecl.is_boxed_repr() {
                "$VRepr"
            } else {
                "Object.prototype"
            };
            Ok(format!(
                "Object.create({proto}, {{\n{}\n{})",
                body.join(",\n"),
                fmt.indent("}")
            ))
        })
    }

    /// Declarations that construct values through `$create`
    fn type_has_constructor(&self, tdecl: &TypeDecl) -> bool {
        matches!(
            tdecl.kind,
            TypeDeclKind::Entity
                | TypeDeclKind::DatatypeMember { .. }
                | TypeDeclKind::Refinement { .. }
                | TypeDeclKind::SomeEntity
                | TypeDeclKind::OkEntity
                | TypeDeclKind::FailEntity
        )
    }

    /// All type declarations of one namespace, plus their supertype-table
    /// entries
    pub(crate) fn emit_ns_type_decls(
        &mut self,
        nsdecl: &NamespaceDecl,
        nsinst: &NamespaceInst,
        fmt: &mut CodeFormatter,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut decls: Vec<String> = Vec::new();
        let mut supers: Vec<String> = Vec::new();

        for tdecl in &nsdecl.typedecls {
            let Some(insts) = nsinst.types.get(&tdecl.name) else {
                continue;
            };
            self.set_current_file(&tdecl.file);

            let multi = !tdecl.terms.is_empty();
            if multi {
                fmt.indent_push();
            }

            let mut ddecls: Vec<String> = Vec::new();
            for inst in insts {
                match (&inst.binds, tdecl.terms.is_empty()) {
                    (None, false) => {
                        return Err(EmitError::inconsistent(
                            &tdecl.name,
                            "generic type instantiation recorded without binds",
                        ));
                    }
                    (Some(_), true) => {
                        return Err(EmitError::inconsistent(
                            &tdecl.name,
                            "template-free type instantiation recorded with binds",
                        ));
                    }
                    _ => {}
                }

                let obj = self.emit_type_instantiation(nsdecl, tdecl, inst, fmt)?;
                if let Some(binds) = inst.binds.as_ref() {
                    let tk = self.term_key_for(&tdecl.name, &tdecl.terms, binds)?;
                    ddecls.push(fmt.indent(&format!("\"{tk}\": {obj}")));
                } else {
                    ddecls.push(format!("export const {} = {obj};", tdecl.name));
                }

                if let Some(entry) =
                    self.emit_subtype_relation(tdecl, &inst.tkey, inst.binds.as_ref())
                {
                    supers.push(entry);
                }
            }

            if multi {
                fmt.indent_pop();
                decls.push(format!(
                    "export const {} = {{\n{}\n{};",
                    tdecl.name,
                    ddecls.join(",\n"),
                    fmt.indent("}")
                ));
            } else {
                decls.extend(ddecls);
            }
        }

        Ok((decls, supers))
    }
}
