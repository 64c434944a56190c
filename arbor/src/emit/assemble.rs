//! Namespace assembly
//!
//! Stitches per-declaration fragments into one module per namespace:
//! runtime prelude, cross-namespace imports, declarations, the supertype
//! table, and the `Main` entry-point trailer.

use crate::ast::Assembly;
use crate::cfg::EmitProfile;
use crate::diag::Diagnostics;
use crate::error::Result;
use crate::instmap::InstantiationMap;

use super::JsEmitter;
use super::fmt::CodeFormatter;

/// Fixed runtime import surface of every emitted module
const PRELUDE: &str = "\"use strict\";\n\
let _$consts = new Map();\n\
import { $VRepr, _$supertypes, _$builtin, _$fisSubtype, _$fisNotSubtype, _$fasSubtype, _$fasNotSubtype, _$None, _$not, _$negate, _$add, _$sub, _$mult, _$div, _$fkeq, _$fkeqopt, _$fkneq, _$fkneqopt, _$fkless, _$fnumeq, _$fnumless, _$fnumlesseq, _$exhaustive, _$abort, _$assert, _$formatchk, _$accepts, _$invariant, _$validate, _$precond, _$softprecond, _$postcond, _$softpostcond, _$memoconstval } from \"./runtime.mjs\";\n";

/// One emitted module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitUnit {
    pub ns: String,
    pub contents: String,
}

/// Everything one emission run produces
#[derive(Debug)]
pub struct EmitOutput {
    pub units: Vec<EmitUnit>,
    pub diagnostics: Diagnostics,
}

impl JsEmitter<'_> {
    /// Emit one namespace as a module
    fn emit_namespace_module(
        &mut self,
        ns_name: &str,
        fmt: &mut CodeFormatter,
    ) -> Result<Option<EmitUnit>> {
        let Some(nsdecl) = self.asm.namespace(ns_name) else {
            return Ok(None);
        };
        let Some(nsinst) = self.instmap.namespace(ns_name) else {
            // nothing from this namespace is reachable
            return Ok(None);
        };

        self.with_location(ns_name, &nsdecl.file, |em| {
            let mut decls: Vec<String> = Vec::new();

            decls.extend(em.emit_ns_const_decls(nsdecl));
            decls.extend(em.emit_ns_function_decls(nsdecl, nsinst, fmt)?);

            let (tdecls, supers) = em.emit_ns_type_decls(nsdecl, nsinst, fmt)?;
            decls.extend(tdecls);

            // deterministic import block: every other emitted namespace
            let mut imports = String::new();
            for other in em.asm.namespaces.iter() {
                if other.name != ns_name && em.instmap.namespace(&other.name).is_some() {
                    imports.push_str(&format!(
                        "import * as ${0} from \"./{0}.mjs\";\n",
                        other.name
                    ));
                }
            }
            imports.push('\n');

            let mut contents = String::new();
            contents.push_str(PRELUDE);
            contents.push_str(&imports);
            contents.push_str(&decls.join("\n\n"));

            if !supers.is_empty() {
                contents.push_str("\n\n");
                contents.push_str(&supers.join("\n"));
            }

            if ns_name == "Main" && nsdecl.functions.iter().any(|f| f.name == "main") {
                contents.push_str("\n\ntry { process.stdout.write(`${main()}\\n`); } catch(e) { process.stdout.write(`error -- ${e.$info || e}\\n`); }");
            }

            contents.push('\n');

            Ok(Some(EmitUnit {
                ns: ns_name.to_string(),
                contents,
            }))
        })
    }
}

/// Lower a whole assembly under the given profile.
///
/// Namespaces are emitted in declaration order; two runs over the same
/// inputs produce byte-identical output.
pub fn emit_assembly(
    asm: &Assembly,
    instmap: &InstantiationMap,
    profile: EmitProfile,
) -> Result<EmitOutput> {
    let mut emitter = JsEmitter::new(asm, instmap, profile);
    let mut units: Vec<EmitUnit> = Vec::new();

    let ns_names: Vec<String> = asm.namespaces.iter().map(|n| n.name.clone()).collect();
    for ns in &ns_names {
        let mut fmt = CodeFormatter::new(0);
        if let Some(unit) = emitter.emit_namespace_module(ns, &mut fmt)? {
            units.push(unit);
        }
    }

    Ok(EmitOutput {
        units,
        diagnostics: emitter.take_diagnostics(),
    })
}
