//! Type-pattern test lowering
//!
//! Lowers `is`/`as` tests into either a compile-time boolean literal
//! (when the scrutinee's static type is uniquely decidable) or one of the
//! runtime helper call shapes. Negation always selects the negated helper
//! variant or the flipped literal; a boolean `!` wrapper is never
//! emitted, so `lower(t, isnot)` and `lower(t, !isnot)` are exact
//! complements for every (type, test) pair.

use crate::ast::{ITest, ITestKind, Span, TypeSig};
use crate::binds::RtType;

use super::JsEmitter;
use super::names::type_symbol;

fn fold(value: bool, isnot: bool) -> String {
    if value != isnot { "true" } else { "false" }.to_string()
}

impl JsEmitter<'_> {
    /// Lower a test to boolean-producing code. `vtype` is the scrutinee's
    /// static type before substitution.
    pub(crate) fn emit_itest_as_test(&mut self, val: &str, vtype: &TypeSig, tt: &ITest) -> String {
        let vvtype = self.tproc(vtype);

        match &tt.kind {
            ITestKind::Type(oftype) => {
                let of = self.tproc(oftype);
                self.emit_test_type(val, &vvtype, &of, tt.isnot)
            }
            ITestKind::None => self.emit_test_none(val, &vvtype, tt.isnot),
            ITestKind::Some => self.emit_test_some(val, &vvtype, tt.isnot),
            ITestKind::Ok => self.emit_test_result_side(val, &vvtype, "Ok", tt.isnot),
            ITestKind::Fail => self.emit_test_result_side(val, &vvtype, "Fail", tt.isnot),
        }
    }

    fn emit_test_none(&mut self, val: &str, vtype: &RtType, isnot: bool) -> String {
        if self.is_unique_for_subtype(vtype) {
            fold(self.is_none_type(vtype), isnot)
        } else if isnot {
            format!("{val}._$isNotNone()")
        } else {
            format!("{val}._$isNone()")
        }
    }

    fn emit_test_some(&mut self, val: &str, vtype: &RtType, isnot: bool) -> String {
        if self.is_unique_for_subtype(vtype) {
            let is_some = self
                .decl_of(vtype)
                .map(|d| matches!(d.kind, crate::ast::TypeDeclKind::SomeEntity))
                .unwrap_or(false);
            fold(is_some, isnot)
        } else if isnot {
            format!("{val}._$isNotSome()")
        } else {
            format!("{val}._$isSome()")
        }
    }

    fn emit_test_result_side(&mut self, val: &str, vtype: &RtType, side: &str, isnot: bool) -> String {
        let target = self.result_side_of(vtype, side);

        if self.is_unique_for_subtype(vtype) {
            let hit = self.same_type(vtype, &target);
            fold(hit, isnot)
        } else {
            let op = if isnot { "_$isNot" } else { "_$is" };
            format!("{val}.{op}({})", type_symbol(&target.tkey()))
        }
    }

    fn emit_test_type(&mut self, val: &str, vtype: &RtType, oftype: &RtType, isnot: bool) -> String {
        if vtype.is_elist() {
            // ephemeral products compare by exact key, no subtyping
            if !oftype.is_elist() {
                return fold(false, isnot);
            }
            let hit = self.same_type(vtype, oftype);
            return fold(hit, isnot);
        }

        if self.is_unique_for_subtype(vtype) {
            if self.is_unique_for_subtype(oftype) {
                let hit = self.same_type(vtype, oftype);
                return fold(hit, isnot);
            }

            if self.is_none_type(vtype) {
                return fold(self.is_option_type(oftype), isnot);
            }

            if self.is_boxed_repr(vtype) {
                let op = if isnot { "_$isNotSubtype" } else { "_$isSubtype" };
                return format!("{val}.{op}({})", type_symbol(&oftype.tkey()));
            }

            // unboxed family: identity-key comparison, no dispatch
            let op = if isnot { "_$fisNotSubtype" } else { "_$fisSubtype" };
            return format!(
                "{op}({}, {})",
                type_symbol(&vtype.tkey()),
                type_symbol(&oftype.tkey())
            );
        }

        if self.is_unique_for_subtype(oftype) {
            let op = if isnot { "_$isNot" } else { "_$is" };
            format!("{val}.{op}({})", type_symbol(&oftype.tkey()))
        } else if self.is_option_type(oftype) {
            // optional unwrapping has its own failure semantics
            let op = if isnot {
                "_$isNotOptionSubtype"
            } else {
                "_$isOptionSubtype"
            };
            format!("{val}.{op}({})", type_symbol(&oftype.tkey()))
        } else {
            let op = if isnot { "_$isNotSubtype" } else { "_$isSubtype" };
            format!("{val}.{op}({})", type_symbol(&oftype.tkey()))
        }
    }

    /// Lower a test to convert-or-abort code: the narrowed value on
    /// success, `_$abort` on the failure path
    pub(crate) fn emit_itest_as_convert(
        &mut self,
        sinfo: Span,
        val: &str,
        vtype: &TypeSig,
        tt: &ITest,
        negate: bool,
    ) -> String {
        let vvtype = self.tproc(vtype);

        match &tt.kind {
            ITestKind::Type(oftype) => {
                let of = self.tproc(oftype);
                self.emit_convert_type(sinfo, val, &vvtype, &of, negate)
            }
            ITestKind::None => self.emit_convert_none(sinfo, val, &vvtype, negate),
            ITestKind::Some => self.emit_convert_some(sinfo, val, &vvtype, negate),
            ITestKind::Ok => self.emit_convert_result_side(sinfo, val, &vvtype, "Ok", negate),
            ITestKind::Fail => self.emit_convert_result_side(sinfo, val, &vvtype, "Fail", negate),
        }
    }

    fn convert_fail(&self, sinfo: Span) -> String {
        format!(
            "_$abort({})",
            self.error_info("failed type convert", sinfo, None)
        )
    }

    fn fold_convert(&self, hit: bool, isnot: bool, val: &str, sinfo: Span) -> String {
        if hit != isnot {
            val.to_string()
        } else {
            self.convert_fail(sinfo)
        }
    }

    fn emit_convert_none(&mut self, sinfo: Span, val: &str, vtype: &RtType, isnot: bool) -> String {
        if self.is_unique_for_subtype(vtype) {
            let hit = self.is_none_type(vtype);
            self.fold_convert(hit, isnot, val, sinfo)
        } else {
            let msg = if isnot {
                "expected Some but got None"
            } else {
                "expected None but got Some"
            };
            let info = self.error_info(msg, sinfo, None);
            let op = if isnot { "_$asNotNone" } else { "_$asNone" };
            format!("{val}.{op}({info})")
        }
    }

    fn emit_convert_some(&mut self, sinfo: Span, val: &str, vtype: &RtType, isnot: bool) -> String {
        if self.is_unique_for_subtype(vtype) {
            let hit = self
                .decl_of(vtype)
                .map(|d| matches!(d.kind, crate::ast::TypeDeclKind::SomeEntity))
                .unwrap_or(false);
            self.fold_convert(hit, isnot, val, sinfo)
        } else {
            let msg = if isnot {
                "expected None but got Some"
            } else {
                "expected Some but got None"
            };
            let info = self.error_info(msg, sinfo, None);
            let op = if isnot { "_$asNotSome" } else { "_$asSome" };
            format!("{val}.{op}({info})")
        }
    }

    fn emit_convert_result_side(
        &mut self,
        sinfo: Span,
        val: &str,
        vtype: &RtType,
        side: &str,
        isnot: bool,
    ) -> String {
        let target = self.result_side_of(vtype, side);

        if self.is_unique_for_subtype(vtype) {
            let hit = self.same_type(vtype, &target);
            self.fold_convert(hit, isnot, val, sinfo)
        } else {
            let (msg, op) = match (side, isnot) {
                ("Ok", false) => ("expected Ok but got Fail", "_$asOk"),
                ("Ok", true) => ("expected Fail but got Ok", "_$asNotOk"),
                (_, false) => ("expected Fail but got Ok", "_$asFail"),
                (_, true) => ("expected Ok but got Fail", "_$asNotFail"),
            };
            let info = self.error_info(msg, sinfo, None);
            format!("{val}.{op}({}, {info})", type_symbol(&target.tkey()))
        }
    }

    fn emit_convert_type(
        &mut self,
        sinfo: Span,
        val: &str,
        vtype: &RtType,
        oftype: &RtType,
        isnot: bool,
    ) -> String {
        if vtype.is_elist() {
            if !oftype.is_elist() {
                return self.fold_convert(false, isnot, val, sinfo);
            }
            let hit = self.same_type(vtype, oftype);
            return self.fold_convert(hit, isnot, val, sinfo);
        }

        if self.is_unique_for_subtype(vtype) {
            if self.is_unique_for_subtype(oftype) {
                let hit = self.same_type(vtype, oftype);
                return self.fold_convert(hit, isnot, val, sinfo);
            }

            if self.is_none_type(vtype) {
                let hit = self.is_option_type(oftype);
                return self.fold_convert(hit, isnot, val, sinfo);
            }

            let info = self.error_info("failed type convert", sinfo, None);
            if self.is_boxed_repr(vtype) {
                let op = if isnot { "_$asNotSubtype" } else { "_$asSubtype" };
                return format!("{val}.{op}({}, {info})", type_symbol(&oftype.tkey()));
            }

            let op = if isnot { "_$fasNotSubtype" } else { "_$fasSubtype" };
            return format!(
                "{op}({val}, {}, {}, {info})",
                type_symbol(&vtype.tkey()),
                type_symbol(&oftype.tkey())
            );
        }

        if self.is_unique_for_subtype(oftype) {
            let msg = if isnot {
                format!("expected different type than {}", oftype.tkey())
            } else {
                format!("expected type {}", oftype.tkey())
            };
            let info = self.error_info(&msg, sinfo, None);
            let op = if isnot { "_$asNot" } else { "_$as" };
            format!("{val}.{op}({}, {info})", type_symbol(&oftype.tkey()))
        } else {
            let msg = if isnot {
                format!("expected not subtype of {}", oftype.tkey())
            } else {
                format!("expected subtype of {}", oftype.tkey())
            };
            let info = self.error_info(&msg, sinfo, None);
            if self.is_option_type(oftype) {
                let op = if isnot {
                    "_$asNotOptionSubtype"
                } else {
                    "_$asOptionSubtype"
                };
                format!("{val}.{op}({}, {info})", type_symbol(&oftype.tkey()))
            } else {
                let op = if isnot { "_$asNotSubtype" } else { "_$asSubtype" };
                format!("{val}.{op}({}, {info})", type_symbol(&oftype.tkey()))
            }
        }
    }
}
