//! Native functions that plug into inference and reduction
//!
//! A native is registered once per store and is represented in terms by a
//! `Term::Native` leaf. Its signature is an ordinary function type, so
//! applications of natives go through the same callee resolution,
//! unification and currying as abstractions; only the final call differs.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::context::Context;
use crate::errors::{CoreError, CoreResult};
use crate::eval::{compile, evaluate, is_value};
use crate::infer::infer_type;
use crate::store::Store;
use crate::term::{NativeId, ParamType, Term, TermId};

/// Same shape as the core algorithms: store, context, arguments
pub type NativeFn = fn(&mut Store, &Context<'_>, &[TermId]) -> CoreResult<TermId>;

/// Refines a call's type from its arguments. `None` keeps the declared
/// result, for arguments that are not values yet.
pub type ResultTypeFn = fn(&mut Store, &Context<'_>, &[TermId]) -> CoreResult<Option<TermId>>;

#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    /// Builds the native's type, a function type optionally under `ForAll`
    pub signature: fn(&mut Store) -> TermId,
    /// Refines the type of a saturated call from its unreduced arguments
    pub result_type: Option<ResultTypeFn>,
    /// Performs the call on reduced arguments
    pub call: NativeFn,
    /// Pure natives may be run by `compile`; impure ones stay residual
    pub pure: bool,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("pure", &self.pure)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NativeEntry {
    pub def: NativeFunction,
    pub signature: TermId,
}

/// Natives known to one store. Passed around explicitly so independent
/// compilations never share registrations.
#[derive(Debug, Default)]
pub struct BuiltinRegistry {
    entries: Vec<NativeEntry>,
    names: HashMap<&'static str, NativeId>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, def: NativeFunction, signature: TermId) -> NativeId {
        let id = NativeId(self.entries.len() as u32);
        self.entries.push(NativeEntry { def, signature });
        self.names.insert(def.name, id);
        id
    }

    pub fn get(&self, id: NativeId) -> &NativeEntry {
        &self.entries[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<NativeId> {
        self.names.get(name).copied()
    }
}

pub(crate) fn install_defaults(store: &mut Store) {
    for def in [CAST, PROJECT, CIMPORT, PRINTF] {
        store.register_native(def);
    }
}

/// Build `forall vars. fn(params) -> Top` with one comptime-typed variable
/// per parameter, each parameter typed by its own variable.
fn generic_signature(store: &mut Store, params: &[(&str, bool)]) -> TermId {
    let mut vars = Vec::with_capacity(params.len());
    let mut slots = Vec::with_capacity(params.len());
    for &(name, comptime) in params {
        let var = store.new_variable(true, Some(name));
        vars.push(var);
        let ty = store.variable_term(var);
        slots.push(ParamType::new(ty, comptime));
    }
    let top = store.top_type();
    let function = store.function_type(slots, top);
    store.for_all(vars, function)
}

fn native_error(name: &str, message: impl Into<String>) -> CoreError {
    CoreError::Native {
        name: name.to_string(),
        message: message.into(),
    }
}

fn expect_string(store: &Store, name: &str, term: TermId) -> CoreResult<String> {
    match store.term(term) {
        Term::StringLiteral(s) => Ok(s.to_string()),
        _ => Err(native_error(
            name,
            format!("expected a string literal, found {}", store.show(term)),
        )),
    }
}

// ============================================================================
// cast(comptime target, value)
// ============================================================================

pub const CAST: NativeFunction = NativeFunction {
    name: "cast",
    signature: cast_signature,
    result_type: Some(cast_result_type),
    call: cast_call,
    pure: true,
};

fn cast_signature(store: &mut Store) -> TermId {
    generic_signature(store, &[("Target", true), ("Subject", false)])
}

/// The target, even while it is still a comptime placeholder
fn cast_result_type(
    store: &mut Store,
    ctx: &Context<'_>,
    args: &[TermId],
) -> CoreResult<Option<TermId>> {
    compile(store, ctx, args[0]).map(Some)
}

fn cast_call(store: &mut Store, ctx: &Context<'_>, args: &[TermId]) -> CoreResult<TermId> {
    let cast = store.cast(args[1], args[0]);
    evaluate(store, ctx, cast)
}

// ============================================================================
// project(value, comptime field)
// ============================================================================

pub const PROJECT: NativeFunction = NativeFunction {
    name: "project",
    signature: project_signature,
    result_type: Some(project_result_type),
    call: project_call,
    pure: true,
};

fn project_signature(store: &mut Store) -> TermId {
    generic_signature(store, &[("Product", false), ("Field", true)])
}

fn project_result_type(
    store: &mut Store,
    ctx: &Context<'_>,
    args: &[TermId],
) -> CoreResult<Option<TermId>> {
    let field = compile(store, ctx, args[1])?;
    if !is_value(store, field) {
        return Ok(None);
    }
    let field = expect_string(store, "project", field)?;
    let projection = store.project(args[0], &field);
    infer_type(store, ctx, projection).map(Some)
}

fn project_call(store: &mut Store, ctx: &Context<'_>, args: &[TermId]) -> CoreResult<TermId> {
    let field = expect_string(store, "project", args[1])?;
    let projection = store.project(args[0], &field);
    evaluate(store, ctx, projection)
}

// ============================================================================
// cimport(comptime header)
// ============================================================================

pub const CIMPORT: NativeFunction = NativeFunction {
    name: "cimport",
    signature: cimport_signature,
    result_type: Some(cimport_result_type),
    call: cimport_call,
    pure: true,
};

fn cimport_signature(store: &mut Store) -> TermId {
    generic_signature(store, &[("Header", true)])
}

fn cimport_result_type(
    store: &mut Store,
    ctx: &Context<'_>,
    args: &[TermId],
) -> CoreResult<Option<TermId>> {
    let header = compile(store, ctx, args[0])?;
    if !is_value(store, header) {
        return Ok(None);
    }
    let module = import_header(store, header)?;
    infer_type(store, ctx, module).map(Some)
}

fn cimport_call(store: &mut Store, _ctx: &Context<'_>, args: &[TermId]) -> CoreResult<TermId> {
    import_header(store, args[0])
}

/// `#include <stdio>`, `#include <stdio.h>` or `#include "stdio.h"` -> `stdio`
fn header_name(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix("#include")?.trim();
    let inner = rest
        .strip_prefix('<')
        .and_then(|r| r.strip_suffix('>'))
        .or_else(|| rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')))?;
    let inner = inner.trim();
    Some(inner.strip_suffix(".h").unwrap_or(inner))
}

/// The product of natives a header exposes
fn import_header(store: &mut Store, header: TermId) -> CoreResult<TermId> {
    let text = expect_string(store, "cimport", header)?;
    let name = header_name(&text)
        .ok_or_else(|| native_error("cimport", format!("malformed include `{}`", text)))?;

    let exports: &[&str] = match name {
        "stdio" => &["printf"],
        other => {
            return Err(native_error(
                "cimport",
                format!("unknown header `{}`", other),
            ))
        }
    };

    debug!("cimport {} exposes {:?}", name, exports);
    let mut members = Vec::with_capacity(exports.len());
    let mut fields = Vec::with_capacity(exports.len());
    for &export in exports {
        let leaf = store
            .builtin(export)
            .ok_or_else(|| native_error("cimport", format!("`{}` is not registered", export)))?;
        let signature = match store.term(leaf) {
            Term::Native(id) => store.native(*id).signature,
            _ => return Err(native_error("cimport", "registry returned a non-native")),
        };
        members.push((export, signature));
        fields.push((export, leaf));
    }
    let ty = store.product_type(members);
    Ok(store.product_value(ty, fields))
}

// ============================================================================
// printf(format)
// ============================================================================

pub const PRINTF: NativeFunction = NativeFunction {
    name: "printf",
    signature: printf_signature,
    result_type: Some(printf_result_type),
    call: printf_call,
    pure: false,
};

fn printf_signature(store: &mut Store) -> TermId {
    generic_signature(store, &[("Format", false)])
}

/// The byte count when the format is known
fn printf_result_type(
    store: &mut Store,
    ctx: &Context<'_>,
    args: &[TermId],
) -> CoreResult<Option<TermId>> {
    let format = compile(store, ctx, args[0])?;
    match store.term(format) {
        Term::StringLiteral(s) => {
            let len = s.len() as i64;
            Ok(Some(store.numeric_type(len)))
        }
        _ => Ok(None),
    }
}

fn printf_call(store: &mut Store, _ctx: &Context<'_>, args: &[TermId]) -> CoreResult<TermId> {
    let format = expect_string(store, "printf", args[0])?;
    let written = store.write_output(&format)?;
    Ok(store.numeric(written as i64))
}
