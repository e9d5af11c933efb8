//! Type inference and callee-type resolution
//!
//! Inference is memoized by the store under the context bindings a term can
//! observe. Applications go through [`resolve_callee`], which is also what
//! the evaluator uses to decide between a full call and currying.

use log::debug;

use crate::context::Context;
use crate::errors::{find_similar, CoreError, CoreResult};
use crate::eval::{compile, is_value};
use crate::store::Store;
use crate::term::{Availability, NativeId, ParamType, Term, TermId, VarId};
use crate::unify::unify_expected_to_arg;

/// Type of `term` under `ctx`
pub fn infer_type(store: &mut Store, ctx: &Context<'_>, term: TermId) -> CoreResult<TermId> {
    store.nested(|store| {
        let bindings = ctx.restrict(store, term, |store, value| infer_type(store, ctx, value))?;
        store.type_of_in_context(term, bindings, |store| infer_uncached(store, ctx, term))
    })
}

fn infer_uncached(store: &mut Store, ctx: &Context<'_>, term: TermId) -> CoreResult<TermId> {
    match store.term(term).clone() {
        Term::Variable(var) => match ctx.get(var) {
            Some(value) => infer_type(store, ctx, value),
            None => Err(CoreError::UnboundVariable {
                name: store.variable_name(var).to_string(),
            }),
        },

        Term::Abstraction {
            bindings,
            params,
            body,
        } => {
            let mut inner = Context::child(ctx);
            for binding in &bindings {
                let value = compile(store, &inner, binding.value)?;
                inner.bind(store, binding.var, value)?;
            }

            let mut slots = Vec::with_capacity(params.len());
            for param in &params {
                let ty = compile(store, &inner, param.ty)?;
                let comptime = store.is_comptime(param.var);
                let placeholder = store.deferred(ty, Availability::from_comptime(comptime));
                inner.bind(store, param.var, placeholder)?;
                slots.push(ParamType::new(ty, comptime));
            }

            let body_ty = infer_type(store, &inner, body)?;
            if slots.is_empty() {
                return Ok(body_ty);
            }

            // Later parameter types may mention earlier comptime parameters
            let plain = store.function_type(slots.clone(), body_ty);
            let free = store.free_variables_of(plain);
            let mut dependent = Vec::new();
            for (slot, param) in slots.iter_mut().zip(&params) {
                if slot.comptime && free.contains(param.var) {
                    slot.binds = Some(param.var);
                    dependent.push(param.var);
                }
            }
            let function = store.function_type(slots, body_ty);
            Ok(store.for_all(dependent, function))
        }

        Term::ForAll { vars, body } => {
            let mut inner = Context::child(ctx);
            let sentinel = store.comptime_type();
            for &var in &vars {
                inner.bind(store, var, sentinel)?;
            }
            let body_ty = infer_type(store, &inner, body)?;
            let free = store.free_variables_of(body_ty);
            let kept = vars.into_iter().filter(|&v| free.contains(v)).collect();
            Ok(store.for_all(kept, body_ty))
        }

        Term::Application { callee, args } => {
            let resolved = resolve_callee(store, ctx, callee, &args)?;
            if resolved.is_saturated() {
                if let Some(id) = native_callee(store, ctx, callee)? {
                    let hook = store.native(id).def.result_type;
                    if let Some(hook) = hook {
                        if let Some(refined) = hook(store, ctx, &args)? {
                            return Ok(refined);
                        }
                    }
                }
                return Ok(resolved.result);
            }

            let function = store.function_type(resolved.remaining, resolved.result);
            let free = store.free_variables_of(function);
            let open = resolved
                .open
                .into_iter()
                .filter(|&v| free.contains(v))
                .collect();
            Ok(store.for_all(open, function))
        }

        Term::Projection { domain, field } => {
            let domain_ty = infer_type(store, ctx, domain)?;
            member_type(store, domain_ty, &field)
        }

        // Castability is checked when the cast is reduced
        Term::Cast { target, .. } => compile(store, ctx, target),

        Term::StringLiteral(value) => Ok(store.canonicalize(Term::StringLiteralType(value))),
        Term::NumericLiteral(value) => Ok(store.canonicalize(Term::NumericLiteralType(value))),

        Term::UnitValue { ty } | Term::ProductValue { ty, .. } | Term::Deferred { ty, .. } => {
            compile(store, ctx, ty)
        }

        Term::Native(id) => Ok(store.native(id).signature),

        Term::TypeOfTypes
        | Term::UnitType
        | Term::BottomType
        | Term::TopType
        | Term::FunctionType { .. }
        | Term::ProductType { .. }
        | Term::StringLiteralType(_)
        | Term::NumericLiteralType(_)
        | Term::NamedType { .. } => Ok(store.type_of_types()),
    }
}

/// Type of member `field` of the product type `ty`
pub fn member_type(store: &Store, ty: TermId, field: &str) -> CoreResult<TermId> {
    match store.term(ty) {
        Term::ProductType { members } => members
            .iter()
            .find(|m| &*m.name == field)
            .map(|m| m.ty)
            .ok_or_else(|| CoreError::MissingField {
                field: field.to_string(),
                suggestions: find_similar(field, members.iter().map(|m| &*m.name), 2),
            }),
        _ => Err(CoreError::NotAProduct {
            found: store.show(ty),
        }),
    }
}

/// The native a callee reduces to, if any. Abstractions never do, so they
/// are not compiled here.
fn native_callee(
    store: &mut Store,
    ctx: &Context<'_>,
    callee: TermId,
) -> CoreResult<Option<NativeId>> {
    let callee = match store.term(callee) {
        Term::Native(id) => return Ok(Some(*id)),
        Term::Abstraction { .. } | Term::ForAll { .. } => return Ok(None),
        _ => compile(store, ctx, callee)?,
    };
    match store.term(callee) {
        Term::Native(id) => Ok(Some(*id)),
        _ => Ok(None),
    }
}

// ============================================================================
// Callee-type resolution
// ============================================================================

/// A value, or a comptime placeholder that will be one before run time
fn known_at_compile_time(store: &mut Store, ctx: &Context<'_>, value: TermId) -> bool {
    if is_value(store, value) {
        return true;
    }
    match store.term(value) {
        Term::Variable(var) => ctx.get(*var).map_or(false, |bound| {
            matches!(
                store.term(bound),
                Term::Deferred {
                    availability: Availability::Comptime,
                    ..
                }
            )
        }),
        _ => false,
    }
}

/// What applying a callee to some arguments resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCallee {
    /// Parameter types of the supplied arguments, after resolution
    pub bound_params: Vec<TermId>,
    /// Quantified variables no argument determined
    pub open: Vec<VarId>,
    /// Quantified variables some argument determined, with their values
    pub resolutions: Vec<(VarId, TermId)>,
    /// Parameter slots still to be supplied
    pub remaining: Vec<ParamType>,
    pub result: TermId,
}

impl ResolvedCallee {
    /// No parameters remain
    pub fn is_saturated(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Match `args` against the type of `callee`.
///
/// The callee's type must be a function type, optionally under one
/// `ForAll`. Supplying fewer arguments than parameters is allowed and
/// leaves the rest in [`ResolvedCallee::remaining`]; supplying more fails.
pub fn resolve_callee(
    store: &mut Store,
    ctx: &Context<'_>,
    callee: TermId,
    args: &[TermId],
) -> CoreResult<ResolvedCallee> {
    let callee_ty = infer_type(store, ctx, callee)?;
    let (forall_vars, function) = match store.term(callee_ty) {
        Term::ForAll { vars, body } => (vars.clone(), *body),
        _ => (Vec::new(), callee_ty),
    };
    let (params, result) = match store.term(function) {
        Term::FunctionType { params, result } => (params.clone(), *result),
        _ => {
            return Err(CoreError::NotAFunction {
                found: store.show(function),
            })
        }
    };
    if args.len() > params.len() {
        return Err(CoreError::ArityMismatch {
            expected: params.len(),
            found: args.len(),
        });
    }

    let mut quantified = Context::child(ctx);
    let sentinel = store.comptime_type();
    for &var in &forall_vars {
        quantified.bind(store, var, sentinel)?;
    }
    let mut resolved = Context::child(&quantified);
    let mut open = forall_vars.clone();

    let mut bound_params = Vec::with_capacity(args.len());
    for (index, (&arg, param)) in args.iter().zip(&params).enumerate() {
        if param.comptime {
            let value = compile(store, ctx, arg)?;
            if !known_at_compile_time(store, ctx, value) {
                return Err(CoreError::ComptimeArgumentUnavailable { index });
            }
            // A dependent slot is decided by the value passed, not by types
            if let Some(var) = param.binds.filter(|v| open.contains(v)) {
                debug!("resolved {} := {}", store.variable_name(var), store.show(value));
                resolved.bind(store, var, value)?;
                open.retain(|&v| v != var);
            }
        }
        let arg_ty = infer_type(store, ctx, arg)?;
        let expected = compile(store, &resolved, param.ty)?;
        unify_expected_to_arg(store, expected, arg_ty, &mut open, &mut resolved)?;
        bound_params.push(compile(store, &resolved, param.ty)?);
    }

    let mut remaining = Vec::with_capacity(params.len() - args.len());
    for param in &params[args.len()..] {
        remaining.push(ParamType {
            ty: compile(store, &resolved, param.ty)?,
            ..param.clone()
        });
    }
    let result = compile(store, &resolved, result)?;

    let resolutions = forall_vars
        .iter()
        .filter(|v| !open.contains(v))
        .filter_map(|&v| resolved.get(v).map(|value| (v, value)))
        .collect();

    Ok(ResolvedCallee {
        bound_params,
        open,
        resolutions,
        remaining,
        result,
    })
}
