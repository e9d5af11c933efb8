//! Reduction of terms: full evaluation and staged compilation
//!
//! [`evaluate`] and [`compile`] share one recursive walk. They differ only
//! where a value may be missing: evaluation fails on a deferred value,
//! while compilation leaves a residual term behind and keeps going.

use log::debug;

use crate::context::Context;
use crate::errors::{find_similar, CoreError, CoreResult};
use crate::infer::{infer_type, member_type, resolve_callee, ResolvedCallee};
use crate::store::Store;
use crate::term::{Availability, Binding, Param, Term, TermId, VarId};

/// Reduction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every free variable must be bound to a value
    Evaluate,
    /// Variables bound to deferred values stay in the output
    Compile,
}

/// Fully reduce `term`. Fails if a value it needs is not available.
pub fn evaluate(store: &mut Store, ctx: &Context<'_>, term: TermId) -> CoreResult<TermId> {
    reduce(store, ctx, term, Mode::Evaluate)
}

/// Reduce `term` as far as the values in `ctx` allow
pub fn compile(store: &mut Store, ctx: &Context<'_>, term: TermId) -> CoreResult<TermId> {
    reduce(store, ctx, term, Mode::Compile)
}

pub fn reduce(store: &mut Store, ctx: &Context<'_>, term: TermId, mode: Mode) -> CoreResult<TermId> {
    store.nested(|store| reduce_term(store, ctx, term, mode))
}

fn reduce_term(store: &mut Store, ctx: &Context<'_>, term: TermId, mode: Mode) -> CoreResult<TermId> {
    match store.term(term).clone() {
        Term::Variable(var) => {
            let value = ctx.get(var).ok_or_else(|| CoreError::UnboundVariable {
                name: store.variable_name(var).to_string(),
            })?;
            match store.term(value) {
                Term::Deferred { .. } => match mode {
                    Mode::Compile => Ok(term),
                    Mode::Evaluate => Err(CoreError::ValueNotAvailable {
                        name: store.variable_name(var).to_string(),
                    }),
                },
                Term::Variable(other) if *other != var => reduce(store, ctx, value, mode),
                _ => Ok(value),
            }
        }

        Term::Deferred { .. } => match mode {
            Mode::Compile => Ok(term),
            Mode::Evaluate => Err(CoreError::ValueNotAvailable {
                name: store.show(term),
            }),
        },

        Term::StringLiteral(_)
        | Term::NumericLiteral(_)
        | Term::Native(_)
        | Term::TypeOfTypes
        | Term::UnitType
        | Term::BottomType
        | Term::TopType
        | Term::StringLiteralType(_)
        | Term::NumericLiteralType(_)
        | Term::NamedType { .. } => Ok(term),

        Term::UnitValue { ty } => {
            let ty = reduce(store, ctx, ty, mode)?;
            Ok(store.unit_value(ty))
        }

        Term::ProductValue { ty, mut fields } => {
            let ty = reduce(store, ctx, ty, mode)?;
            for field in &mut fields {
                field.value = reduce(store, ctx, field.value, mode)?;
            }
            Ok(store.canonicalize(Term::ProductValue { ty, fields }))
        }

        Term::FunctionType { mut params, result } => {
            for param in &mut params {
                param.ty = reduce(store, ctx, param.ty, mode)?;
            }
            let result = reduce(store, ctx, result, mode)?;
            Ok(store.function_type(params, result))
        }

        Term::ProductType { mut members } => {
            for member in &mut members {
                member.ty = reduce(store, ctx, member.ty, mode)?;
            }
            Ok(store.canonicalize(Term::ProductType { members }))
        }

        Term::Projection { domain, field } => {
            let domain = reduce(store, ctx, domain, mode)?;
            match store.term(domain).clone() {
                Term::ProductValue { fields, .. } => fields
                    .iter()
                    .find(|f| f.name == field)
                    .map(|f| f.value)
                    .ok_or_else(|| CoreError::MissingField {
                        field: field.to_string(),
                        suggestions: find_similar(&field, fields.iter().map(|f| &*f.name), 2),
                    }),
                _ if mode == Mode::Compile && !is_value(store, domain) => {
                    let domain_ty = infer_type(store, ctx, domain)?;
                    member_type(store, domain_ty, &field)?;
                    Ok(store.project(domain, &field))
                }
                _ => Err(CoreError::NotAProduct {
                    found: store.show(domain),
                }),
            }
        }

        Term::Cast { subject, target } => {
            let subject = reduce(store, ctx, subject, mode)?;
            let target = reduce(store, ctx, target, mode)?;
            let subject_ty = infer_type(store, ctx, subject)?;
            if subject_ty == target {
                return Ok(subject);
            }
            if mode == Mode::Compile && !(store.is_concrete(subject_ty) && store.is_concrete(target)) {
                return Ok(store.cast(subject, target));
            }
            Err(CoreError::UncastableTypes {
                from: store.show(subject_ty),
                to: store.show(target),
            })
        }

        Term::ForAll { vars, body } => {
            let mut inner = Context::child(ctx);
            let sentinel = store.comptime_type();
            for &var in &vars {
                inner.bind(store, var, sentinel)?;
            }
            let body = compile(store, &inner, body)?;
            let free = store.free_variables_of(body);
            let kept = vars.into_iter().filter(|&v| free.contains(v)).collect();
            let function = store.for_all(kept, body);
            if mode == Mode::Evaluate {
                ensure_available(store, ctx, function)?;
            }
            Ok(function)
        }

        Term::Abstraction {
            bindings,
            params,
            body,
        } => {
            let mut inner = Context::child(ctx);
            let mut residual = Vec::new();
            bind_sequence(store, &mut inner, &bindings, mode, &mut residual)?;

            if params.is_empty() {
                let value = reduce(store, &inner, body, mode)?;
                return Ok(wrap_residual(store, residual, value));
            }

            // The body of a function is staged: its parameters are placeholders
            let mut reduced = Vec::with_capacity(params.len());
            for param in &params {
                let ty = compile(store, &inner, param.ty)?;
                let comptime = store.is_comptime(param.var);
                let placeholder = store.deferred(ty, Availability::from_comptime(comptime));
                inner.bind(store, param.var, placeholder)?;
                reduced.push(Param { var: param.var, ty });
            }
            let body = compile(store, &inner, body)?;
            let function = store.abstraction(residual, reduced, body);
            if mode == Mode::Evaluate {
                ensure_available(store, &inner, function)?;
            }
            Ok(function)
        }

        Term::Application { callee, args } => {
            let resolved = resolve_callee(store, ctx, callee, &args)?;

            let mut values = Vec::with_capacity(args.len());
            for (&arg, &param_ty) in args.iter().zip(&resolved.bound_params) {
                let value = reduce(store, ctx, arg, mode)?;
                let value_ty = infer_type(store, ctx, value)?;
                let value = if value_ty == param_ty {
                    value
                } else {
                    let cast = store.cast(value, param_ty);
                    reduce(store, ctx, cast, mode)?
                };
                values.push(value);
            }

            let callee = reduce(store, ctx, callee, mode)?;
            if resolved.is_saturated() {
                call(store, ctx, callee, &values, &resolved, mode)
            } else {
                curry(store, ctx, callee, values, &resolved, mode)
            }
        }
    }
}

/// Bind `bindings` in order into `inner`. In compile mode a value that
/// could not be reduced to something concrete is kept as a residual binding
/// and its variable is bound to a placeholder instead.
fn bind_sequence(
    store: &mut Store,
    inner: &mut Context<'_>,
    bindings: &[Binding],
    mode: Mode,
    residual: &mut Vec<Binding>,
) -> CoreResult<()> {
    for binding in bindings {
        let value = reduce(store, inner, binding.value, mode)?;
        if mode == Mode::Compile && !inlinable(store, value) {
            debug!("keeping binding {} residual", store.variable_name(binding.var));
            let ty = infer_type(store, inner, value)?;
            let placeholder = store.deferred(ty, Availability::Runtime);
            inner.bind(store, binding.var, placeholder)?;
            residual.push(Binding {
                var: binding.var,
                value,
            });
        } else {
            inner.bind(store, binding.var, value)?;
        }
    }
    Ok(())
}

/// An evaluated function may only capture variables that have values
fn ensure_available(store: &mut Store, ctx: &Context<'_>, function: TermId) -> CoreResult<()> {
    let free = store.free_variables_of(function);
    for var in free.vars() {
        let deferred = ctx.get(var).map_or(false, |value| store.term(value).is_deferred());
        if deferred {
            return Err(CoreError::ValueNotAvailable {
                name: store.variable_name(var).to_string(),
            });
        }
    }
    Ok(())
}

/// Closed, fully reduced, and free of pending calls. A residual call is
/// closed too, but running or copying it would repeat its effects.
pub(crate) fn is_value(store: &mut Store, term: TermId) -> bool {
    store.is_concrete(term) && !has_pending_work(store, term)
}

fn has_pending_work(store: &Store, term: TermId) -> bool {
    match store.term(term) {
        Term::Application { .. } | Term::Projection { .. } | Term::Cast { .. } => true,
        Term::Abstraction { params, .. } => params.is_empty(),
        Term::ProductValue { fields, .. } => fields.iter().any(|f| has_pending_work(store, f.value)),
        _ => false,
    }
}

/// Values and plain variables can be substituted without duplicating work
fn inlinable(store: &mut Store, value: TermId) -> bool {
    matches!(store.term(value), Term::Variable(_)) || is_value(store, value)
}

fn wrap_residual(store: &mut Store, residual: Vec<Binding>, value: TermId) -> TermId {
    if residual.is_empty() {
        value
    } else {
        store.abstraction(residual, vec![], value)
    }
}

/// Call a reduced callee with all of its arguments
fn call(
    store: &mut Store,
    ctx: &Context<'_>,
    callee: TermId,
    args: &[TermId],
    resolved: &ResolvedCallee,
    mode: Mode,
) -> CoreResult<TermId> {
    match store.term(callee).clone() {
        Term::Native(id) => {
            let entry = *store.native(id);
            if mode == Mode::Compile {
                let ready = args.iter().all(|&arg| is_value(store, arg));
                if !entry.def.pure || !ready {
                    debug!("leaving call to {} residual", entry.def.name);
                    return Ok(store.apply(callee, args.to_vec()));
                }
            }
            debug!("calling native {}", entry.def.name);
            (entry.def.call)(store, ctx, args)
        }

        Term::ForAll { vars, body } => {
            let mut inner = Context::child(ctx);
            let sentinel = store.comptime_type();
            for var in vars {
                let value = resolved
                    .resolutions
                    .iter()
                    .find(|(v, _)| *v == var)
                    .map(|&(_, value)| value)
                    .unwrap_or(sentinel);
                inner.bind(store, var, value)?;
            }
            call(store, &inner, body, args, resolved, mode)
        }

        Term::Abstraction {
            bindings,
            params,
            body,
        } if !params.is_empty() => {
            if args.len() != params.len() {
                return Err(CoreError::ArityMismatch {
                    expected: params.len(),
                    found: args.len(),
                });
            }
            let mut inner = Context::child(ctx);
            let mut residual = Vec::new();
            bind_sequence(store, &mut inner, &bindings, mode, &mut residual)?;

            for (param, &arg) in params.iter().zip(args) {
                if mode == Mode::Evaluate || inlinable(store, arg) {
                    inner.bind(store, param.var, arg)?;
                    continue;
                }
                // Keep the argument once, under a fresh name, rather than
                // copying it into every use of the parameter
                let comptime = store.is_comptime(param.var);
                let name = store.variable_name(param.var).to_string();
                let fresh = store.new_variable(comptime, Some(&name));
                let fresh_term = store.variable_term(fresh);
                let ty = infer_type(store, ctx, arg)?;
                let placeholder = store.deferred(ty, Availability::from_comptime(comptime));
                inner.bind(store, fresh, placeholder)?;
                inner.bind(store, param.var, fresh_term)?;
                residual.push(Binding { var: fresh, value: arg });
            }

            let value = reduce(store, &inner, body, mode)?;
            Ok(wrap_residual(store, residual, value))
        }

        _ if mode == Mode::Compile && !is_value(store, callee) => {
            Ok(store.apply(callee, args.to_vec()))
        }

        _ => Err(CoreError::NotAFunction {
            found: store.show(callee),
        }),
    }
}

/// Partial application: a function over the remaining parameters that
/// calls `callee` with the supplied arguments followed by its own
fn curry(
    store: &mut Store,
    ctx: &Context<'_>,
    callee: TermId,
    mut args: Vec<TermId>,
    resolved: &ResolvedCallee,
    mode: Mode,
) -> CoreResult<TermId> {
    let dependent = |var: &VarId| {
        resolved
            .remaining
            .iter()
            .any(|slot| slot.binds == Some(*var))
    };
    // Open variables stay symbolic; dependent ones are renamed to the fresh
    // parameter that now supplies them
    let mut renamed = Context::child(ctx);
    let sentinel = store.comptime_type();
    for var in resolved.open.iter().filter(|v| !dependent(v)) {
        renamed.bind(store, *var, sentinel)?;
    }

    let mut params = Vec::with_capacity(resolved.remaining.len());
    for slot in &resolved.remaining {
        let ty = compile(store, &renamed, slot.ty)?;
        let var = store.new_variable(slot.comptime, None);
        let var_term = store.variable_term(var);
        if let Some(supplied) = slot.binds.filter(|v| resolved.open.contains(v)) {
            let placeholder = store.deferred(ty, Availability::Comptime);
            renamed.bind(store, var, placeholder)?;
            renamed.bind(store, supplied, var_term)?;
        }
        params.push(Param { var, ty });
        args.push(var_term);
    }
    let body = store.apply(callee, args);
    let function = store.abstraction(vec![], params, body);

    let free = store.free_variables_of(function);
    let open = resolved
        .open
        .iter()
        .copied()
        .filter(|&v| free.contains(v))
        .collect();
    let function = store.for_all(open, function);
    debug!("curried {} into {}", store.show(callee), store.show(function));
    reduce(store, ctx, function, mode)
}
