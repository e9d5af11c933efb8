//! Matching an expected parameter type against an argument's type
//!
//! Both sides are already reduced except for references to the quantified
//! variables being resolved. A quantified variable is bound the first time
//! it is met and removed from the open set; later occurrences must agree.

use log::debug;

use crate::context::Context;
use crate::errors::{CoreError, CoreResult};
use crate::store::Store;
use crate::term::{Term, TermId, VarId};

/// Unify `expected` against `arg`, binding members of `forall_vars` in `ctx`.
///
/// There is no subtyping: apart from quantified variables, the two sides
/// must agree exactly in shape, names and literal values.
pub fn unify_expected_to_arg(
    store: &mut Store,
    expected: TermId,
    arg: TermId,
    forall_vars: &mut Vec<VarId>,
    ctx: &mut Context<'_>,
) -> CoreResult<()> {
    store.nested(|store| unify_terms(store, expected, arg, forall_vars, ctx))
}

fn mismatch(store: &Store, expected: TermId, arg: TermId) -> CoreError {
    CoreError::UnificationFailure {
        expected: store.show(expected),
        found: store.show(arg),
    }
}

fn unify_terms(
    store: &mut Store,
    expected: TermId,
    arg: TermId,
    forall_vars: &mut Vec<VarId>,
    ctx: &mut Context<'_>,
) -> CoreResult<()> {
    if expected == arg {
        return Ok(());
    }

    match store.term(expected).clone() {
        Term::Variable(var) if forall_vars.contains(&var) => {
            debug!(
                "resolved {} := {}",
                store.variable_name(var),
                store.show(arg)
            );
            ctx.bind(store, var, arg)?;
            forall_vars.retain(|&v| v != var);
            Ok(())
        }

        // Already resolved by an earlier occurrence
        Term::Variable(var) => match ctx.get(var) {
            Some(value) if value != expected && !store.term(value).is_deferred() => {
                unify_expected_to_arg(store, value, arg, forall_vars, ctx)
            }
            _ => Err(mismatch(store, expected, arg)),
        },

        Term::StringLiteralType(value) => match store.term(arg) {
            Term::StringLiteralType(other) if *other == value => Ok(()),
            _ => Err(mismatch(store, expected, arg)),
        },

        Term::NumericLiteralType(value) => match store.term(arg) {
            Term::NumericLiteralType(other) if *other == value => Ok(()),
            _ => Err(mismatch(store, expected, arg)),
        },

        Term::ProductValue { ty, fields } => {
            let (arg_ty, arg_fields) = match store.term(arg) {
                Term::ProductValue { ty, fields } => (*ty, fields.clone()),
                _ => return Err(mismatch(store, expected, arg)),
            };
            unify_expected_to_arg(store, ty, arg_ty, forall_vars, ctx)?;
            if fields.len() != arg_fields.len() {
                return Err(CoreError::ArityMismatch {
                    expected: fields.len(),
                    found: arg_fields.len(),
                });
            }
            for (want, have) in fields.iter().zip(&arg_fields) {
                if want.name != have.name {
                    return Err(field_mismatch(&want.name, &have.name));
                }
                unify_expected_to_arg(store, want.value, have.value, forall_vars, ctx)?;
            }
            Ok(())
        }

        Term::ProductType { members } => {
            let arg_members = match store.term(arg) {
                Term::ProductType { members } => members.clone(),
                _ => return Err(mismatch(store, expected, arg)),
            };
            if members.len() != arg_members.len() {
                return Err(CoreError::ArityMismatch {
                    expected: members.len(),
                    found: arg_members.len(),
                });
            }
            for (want, have) in members.iter().zip(&arg_members) {
                if want.name != have.name {
                    return Err(field_mismatch(&want.name, &have.name));
                }
                unify_expected_to_arg(store, want.ty, have.ty, forall_vars, ctx)?;
            }
            Ok(())
        }

        Term::FunctionType { params, result } => {
            let (arg_params, arg_result) = match store.term(arg) {
                Term::FunctionType { params, result } => (params.clone(), *result),
                _ => return Err(mismatch(store, expected, arg)),
            };
            if params.len() != arg_params.len() {
                return Err(CoreError::ArityMismatch {
                    expected: params.len(),
                    found: arg_params.len(),
                });
            }
            for (want, have) in params.iter().zip(&arg_params) {
                // A function needing a comptime argument cannot stand in for
                // one that is called with runtime values
                if have.comptime && !want.comptime {
                    return Err(mismatch(store, expected, arg));
                }
                unify_expected_to_arg(store, want.ty, have.ty, forall_vars, ctx)?;
            }
            unify_expected_to_arg(store, result, arg_result, forall_vars, ctx)
        }

        // Nominal and base types are equal only to themselves
        Term::NamedType { .. }
        | Term::TypeOfTypes
        | Term::UnitType
        | Term::BottomType
        | Term::TopType
        | Term::Abstraction { .. }
        | Term::ForAll { .. }
        | Term::Application { .. }
        | Term::Projection { .. }
        | Term::Cast { .. }
        | Term::StringLiteral(_)
        | Term::NumericLiteral(_)
        | Term::UnitValue { .. }
        | Term::Deferred { .. }
        | Term::Native(_) => Err(mismatch(store, expected, arg)),
    }
}

fn field_mismatch(want: &str, have: &str) -> CoreError {
    CoreError::UnificationFailure {
        expected: format!("field `{}`", want),
        found: format!("field `{}`", have),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::ParamType;

    fn unify(
        store: &mut Store,
        expected: TermId,
        arg: TermId,
        vars: &mut Vec<VarId>,
    ) -> (CoreResult<()>, Vec<(VarId, Option<TermId>)>) {
        let root = Context::new();
        let mut ctx = Context::child(&root);
        let watched = vars.clone();
        let result = unify_expected_to_arg(store, expected, arg, vars, &mut ctx);
        let bound = watched.into_iter().map(|v| (v, ctx.get(v))).collect();
        (result, bound)
    }

    #[test]
    fn test_binds_quantified_variable() {
        let mut store = Store::new();
        let t = store.new_variable(true, Some("T"));
        let t_term = store.variable_term(t);
        let lit = store.string_type("a");
        let mut vars = vec![t];

        let (result, bound) = unify(&mut store, t_term, lit, &mut vars);
        assert_eq!(result, Ok(()));
        assert!(vars.is_empty());
        assert_eq!(bound, vec![(t, Some(lit))]);
    }

    #[test]
    fn test_free_variable_outside_set_is_not_bound() {
        let mut store = Store::new();
        let t = store.new_variable(true, Some("T"));
        let t_term = store.variable_term(t);
        let lit = store.string_type("a");
        let mut vars = vec![];
        let (result, _) = unify(&mut store, t_term, lit, &mut vars);
        assert!(matches!(result, Err(CoreError::UnificationFailure { .. })));
    }

    #[test]
    fn test_literal_values_must_match() {
        let mut store = Store::new();
        let three = store.numeric_type(3);
        let four = store.numeric_type(4);
        let mut vars = vec![];
        assert_eq!(unify(&mut store, three, three, &mut vars).0, Ok(()));
        assert!(unify(&mut store, three, four, &mut vars).0.is_err());

        let text = store.string_type("3");
        assert!(unify(&mut store, three, text, &mut vars).0.is_err());
    }

    #[test]
    fn test_repeated_variable_must_agree() {
        let mut store = Store::new();
        let t = store.new_variable(true, Some("T"));
        let t_term = store.variable_term(t);
        let expected = store.product_type(vec![("a", t_term), ("b", t_term)]);
        let one = store.numeric_type(1);
        let two = store.numeric_type(2);

        let same = store.product_type(vec![("a", one), ("b", one)]);
        let mut vars = vec![t];
        assert_eq!(unify(&mut store, expected, same, &mut vars).0, Ok(()));

        let different = store.product_type(vec![("a", one), ("b", two)]);
        let mut vars = vec![t];
        assert!(unify(&mut store, expected, different, &mut vars).0.is_err());
    }

    #[test]
    fn test_product_shape_mismatches() {
        let mut store = Store::new();
        let top = store.top_type();
        let xy = store.product_type(vec![("x", top), ("y", top)]);
        let x = store.product_type(vec![("x", top)]);
        let xz = store.product_type(vec![("x", top), ("z", top)]);
        let mut vars = vec![];

        assert_eq!(
            unify(&mut store, xy, x, &mut vars).0,
            Err(CoreError::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            unify(&mut store, xy, xz, &mut vars).0,
            Err(CoreError::UnificationFailure {
                expected: "field `y`".to_string(),
                found: "field `z`".to_string(),
            })
        );
    }

    #[test]
    fn test_function_comptime_params() {
        let mut store = Store::new();
        let top = store.top_type();
        let runtime = store.function_type(
            vec![ParamType::new(top, false)],
            top,
        );
        let comptime = store.function_type(
            vec![ParamType::new(top, true)],
            top,
        );
        let mut vars = vec![];
        // a runtime-parameter function may be used where a comptime one is expected
        assert_eq!(unify(&mut store, comptime, runtime, &mut vars).0, Ok(()));
        assert!(unify(&mut store, runtime, comptime, &mut vars).0.is_err());
    }

    #[test]
    fn test_named_types_are_nominal() {
        let mut store = Store::new();
        let a = store.new_named_type("Meters");
        let b = store.new_named_type("Meters");
        let mut vars = vec![];
        assert_eq!(unify(&mut store, a, a, &mut vars).0, Ok(()));
        assert!(unify(&mut store, a, b, &mut vars).0.is_err());
    }
}
