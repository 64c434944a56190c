//! Code-lowering backend
//!
//! Consumes a checked assembly plus the instantiation map and emits one
//! JavaScript module per namespace. Single-threaded recursive tree-walk;
//! the only mutable traversal state is the `EmitContext`, manipulated
//! under strict save/restore scoping.

mod assemble;
mod body;
mod contracts;
mod decls;
mod fmt;
mod itest;
mod names;

pub use assemble::{EmitOutput, EmitUnit, emit_assembly};
pub use fmt::CodeFormatter;

use std::collections::BTreeSet;

use crate::ast::{Assembly, Span, TypeDecl, TypeSig};
use crate::binds::{BindingMap, RtType};
use crate::cfg::{EmitMode, EmitProfile};
use crate::diag::{Diagnostic, Diagnostics};
use crate::instmap::InstantiationMap;
use crate::intern::KeyTable;

/// Per-traversal mutable state.
///
/// Every recursive descent into a nested declaration saves the current
/// (namespace, file, mapper) triple through the scoped helpers on
/// `JsEmitter` and restores it on the way out, keeping sibling
/// instantiations isolated.
#[derive(Debug, Default)]
struct EmitContext {
    ns: String,
    file: String,
    mapper: Option<BindingMap>,
    binders: BTreeSet<String>,
    return_complete: Option<String>,
}

/// The lowering engine
pub struct JsEmitter<'a> {
    asm: &'a Assembly,
    instmap: &'a InstantiationMap,
    profile: EmitProfile,
    keys: KeyTable,
    diags: Diagnostics,
    ctx: EmitContext,
}

impl<'a> JsEmitter<'a> {
    pub fn new(asm: &'a Assembly, instmap: &'a InstantiationMap, profile: EmitProfile) -> Self {
        JsEmitter {
            asm,
            instmap,
            profile,
            keys: KeyTable::new(),
            diags: Diagnostics::new(),
            ctx: EmitContext::default(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diags)
    }

    /// Substitute the active binding map into a signature. Every type
    /// lookup during lowering passes through here before any identity
    /// comparison or accessor derivation.
    pub(crate) fn tproc(&self, ty: &TypeSig) -> RtType {
        RtType::resolve(ty, self.ctx.mapper.as_ref())
    }

    /// Run `f` with `mapper` installed, restoring the previous mapper on
    /// every exit path
    pub(crate) fn with_mapper<T>(
        &mut self,
        mapper: Option<BindingMap>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = std::mem::replace(&mut self.ctx.mapper, mapper);
        let out = f(self);
        self.ctx.mapper = saved;
        out
    }

    /// Run `f` with the current namespace and file switched, restoring
    /// both afterwards
    pub(crate) fn with_location<T>(
        &mut self,
        ns: &str,
        file: &str,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved_ns = std::mem::replace(&mut self.ctx.ns, ns.to_string());
        let saved_file = std::mem::replace(&mut self.ctx.file, file.to_string());
        let out = f(self);
        self.ctx.ns = saved_ns;
        self.ctx.file = saved_file;
        out
    }

    pub(crate) fn set_current_file(&mut self, file: &str) {
        self.ctx.file = file.to_string();
    }

    pub(crate) fn current_ns(&self) -> &str {
        &self.ctx.ns
    }

    pub(crate) fn current_mapper(&self) -> Option<&BindingMap> {
        self.ctx.mapper.as_ref()
    }

    /// Quoted namespace key of the current namespace, as embedded in
    /// format-check calls
    pub(crate) fn current_inns(&self) -> String {
        format!("\"{}\"", self.ctx.ns)
    }

    pub(crate) fn register_binder(&mut self, scope_name: &str) {
        self.ctx.binders.insert(scope_name.to_string());
    }

    /// Binder names accumulated while lowering the current body, sorted
    /// for deterministic prologue declarations
    pub(crate) fn take_binders(&mut self) -> Vec<String> {
        let names: Vec<String> = self.ctx.binders.iter().cloned().collect();
        self.ctx.binders.clear();
        names
    }

    pub(crate) fn set_return_complete(&mut self, call: Option<String>) {
        self.ctx.return_complete = call;
    }

    pub(crate) fn return_complete(&self) -> Option<&String> {
        self.ctx.return_complete.as_ref()
    }

    /// Diagnostic payload for an emitted abort/report call: full text in
    /// debug mode, tag-only (or nothing) in release mode
    pub(crate) fn error_info(&self, msg: &str, sinfo: Span, tag: Option<&str>) -> String {
        match self.profile.mode {
            EmitMode::Release => match tag {
                Some(t) => format!("\"{t}\""),
                None => "undefined".to_string(),
            },
            EmitMode::Debug => {
                let file = if self.ctx.file.is_empty() {
                    "[internal]".to_string()
                } else {
                    self.ctx
                        .file
                        .rsplit('/')
                        .next()
                        .unwrap_or("[internal]")
                        .to_string()
                };
                let tagpart = match tag {
                    Some(t) => format!("[{t}]"),
                    None => String::new(),
                };
                format!("\"{msg}{tagpart} @ {file}:{line}\"", line = sinfo.line)
            }
        }
    }

    pub(crate) fn profile(&self) -> EmitProfile {
        self.profile
    }

    pub(crate) fn push_unimplemented(&mut self, feature: &str, sinfo: Span) {
        self.diags
            .push(Diagnostic::unimplemented(feature, &self.ctx.file, sinfo));
    }

    // === type classification ============================================

    pub(crate) fn decl_of(&self, ty: &RtType) -> Option<&'a TypeDecl> {
        self.asm.resolve_nominal(ty.sig())
    }

    /// No runtime subtype ambiguity: every test against this value's type
    /// can fold or compare exact identities
    pub(crate) fn is_unique_for_subtype(&self, ty: &RtType) -> bool {
        match ty.sig() {
            TypeSig::Elist { .. } => true,
            TypeSig::Template { .. } => false,
            TypeSig::Nominal { .. } => self
                .decl_of(ty)
                .map(|d| d.is_unique_for_subtype_checking())
                .unwrap_or(false),
        }
    }

    /// Tagged runtime object; supports member-dispatched helpers
    pub(crate) fn is_boxed_repr(&self, ty: &RtType) -> bool {
        self.decl_of(ty).map(|d| d.is_boxed_repr()).unwrap_or(false)
    }

    pub(crate) fn is_option_type(&self, ty: &RtType) -> bool {
        self.decl_of(ty).map(|d| d.is_option()).unwrap_or(false)
    }

    pub(crate) fn is_none_type(&mut self, ty: &RtType) -> bool {
        self.keys.same(&ty.tkey(), "None")
    }

    pub(crate) fn is_primitive_type(&self, ty: &RtType) -> bool {
        self.decl_of(ty).map(|d| d.is_primitive()).unwrap_or(false)
    }

    /// O(1) identity comparison through the interning table
    pub(crate) fn same_type(&mut self, a: &RtType, b: &RtType) -> bool {
        self.keys.same(&a.tkey(), &b.tkey())
    }

    /// The concrete `Ok`/`Fail` instantiation matching a `Result`-family
    /// scrutinee type
    pub(crate) fn result_side_of(&self, vtype: &RtType, side: &str) -> RtType {
        let args = vtype.term_args().to_vec();
        RtType::resolve(&TypeSig::core(side, args), None)
    }
}
