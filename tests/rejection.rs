//! Rejection tests
//!
//! Every failure is an ordinary error value. These tests check that ill-formed
//! terms are rejected with the right variant and a readable message.
//!
//! Categories:
//! 1. Scope - unbound and unavailable variables
//! 2. Application - arity, non-functions, comptime arguments, unification
//! 3. Products - missing fields and non-products
//! 4. Limits - recursion depth

use schist::term::{Param, ParamType};
use schist::test_support::{identity_function, pair_function, point_value};
use schist::{
    compile, evaluate, infer_type, Availability, Context, CoreConfig, CoreError, Store,
};

// ============================================================================
// Scope
// ============================================================================

mod scope {
    use super::*;

    #[test]
    fn unbound_variable_in_inference_and_evaluation() {
        let mut store = Store::new();
        let ctx = Context::new();
        let ghost = store.new_variable(false, Some("ghost"));
        let ghost_term = store.variable_term(ghost);

        let expected = CoreError::UnboundVariable {
            name: "ghost".to_string(),
        };
        assert_eq!(infer_type(&mut store, &ctx, ghost_term), Err(expected.clone()));
        assert_eq!(evaluate(&mut store, &ctx, ghost_term), Err(expected.clone()));
        assert_eq!(compile(&mut store, &ctx, ghost_term), Err(expected));
    }

    #[test]
    fn evaluate_refuses_a_runtime_placeholder() {
        let mut store = Store::new();
        let n = store.new_variable(false, Some("n"));
        let n_term = store.variable_term(n);
        let top = store.top_type();
        let placeholder = store.deferred(top, Availability::Runtime);
        let mut ctx = Context::new();
        ctx.bind(&store, n, placeholder).unwrap();

        let err = evaluate(&mut store, &ctx, n_term).unwrap_err();
        assert_eq!(err.to_string(), "value of `n` is not available yet");
        assert_eq!(compile(&mut store, &ctx, n_term), Ok(n_term));
    }

    #[test]
    fn evaluate_refuses_a_function_capturing_a_runtime_placeholder() {
        let mut store = Store::new();
        let top = store.top_type();
        let y = store.new_variable(false, Some("y"));
        let y_term = store.variable_term(y);
        let p = store.new_variable(false, Some("p"));
        let function = store.abstraction(vec![], vec![Param { var: p, ty: top }], y_term);
        let placeholder = store.deferred(top, Availability::Runtime);
        let mut ctx = Context::new();
        ctx.bind(&store, y, placeholder).unwrap();

        assert_eq!(
            evaluate(&mut store, &ctx, function),
            Err(CoreError::ValueNotAvailable {
                name: "y".to_string()
            })
        );
        // staging may close over it
        assert_eq!(compile(&mut store, &ctx, function), Ok(function));
    }

    #[test]
    fn double_binding_in_one_frame() {
        let mut store = Store::new();
        let x = store.new_variable(false, Some("x"));
        let one = store.numeric(1);
        let two = store.numeric(2);
        let mut ctx = Context::new();
        ctx.bind(&store, x, one).unwrap();
        assert_eq!(
            ctx.bind(&store, x, two),
            Err(CoreError::AlreadyBound {
                name: "x".to_string()
            })
        );
        assert_eq!(ctx.get(x), Some(one));
    }
}

// ============================================================================
// Application
// ============================================================================

mod application {
    use super::*;

    #[test]
    fn too_many_arguments() {
        let mut store = Store::new();
        let ctx = Context::new();
        let pair = pair_function(&mut store);
        let one = store.numeric(1);
        let call = store.apply(pair, vec![one, one, one]);
        let err = evaluate(&mut store, &ctx, call).unwrap_err();
        assert_eq!(
            err.to_string(),
            "arity mismatch: expected at most 2, found 3"
        );
    }

    #[test]
    fn calling_a_literal() {
        let mut store = Store::new();
        let ctx = Context::new();
        let text = store.string("not a function");
        let one = store.numeric(1);
        let call = store.apply(text, vec![one]);
        let err = infer_type(&mut store, &ctx, call).unwrap_err();
        assert!(matches!(err, CoreError::NotAFunction { .. }));
    }

    #[test]
    fn argument_of_the_wrong_literal_type() {
        let mut store = Store::new();
        let ctx = Context::new();
        let three_ty = store.numeric_type(3);
        let x = store.new_variable(false, Some("x"));
        let x_term = store.variable_term(x);
        let only_three = store.abstraction(vec![], vec![Param { var: x, ty: three_ty }], x_term);

        let three = store.numeric(3);
        let ok = store.apply(only_three, vec![three]);
        assert_eq!(evaluate(&mut store, &ctx, ok), Ok(three));

        let four = store.numeric(4);
        let bad = store.apply(only_three, vec![four]);
        let err = evaluate(&mut store, &ctx, bad).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnificationFailure {
                expected: "literal 3".to_string(),
                found: "literal 4".to_string(),
            }
        );
    }

    #[test]
    fn dependent_comptime_parameter_fixes_the_later_type() {
        let mut store = Store::new();
        let ctx = Context::new();
        // fn(comptime T: Type, x: T) => x
        let t = store.new_variable(true, Some("T"));
        let x = store.new_variable(false, Some("x"));
        let t_term = store.variable_term(t);
        let x_term = store.variable_term(x);
        let type_of_types = store.type_of_types();
        let params = vec![
            Param { var: t, ty: type_of_types },
            Param { var: x, ty: t_term },
        ];
        let function = store.abstraction(vec![], params, x_term);

        let three_ty = store.numeric_type(3);
        let four_ty = store.numeric_type(4);
        let four = store.numeric(4);

        let good = store.apply(function, vec![four_ty, four]);
        assert_eq!(infer_type(&mut store, &ctx, good), Ok(four_ty));
        assert_eq!(evaluate(&mut store, &ctx, good), Ok(four));

        let bad = store.apply(function, vec![three_ty, four]);
        let expected = CoreError::UnificationFailure {
            expected: "literal 3".to_string(),
            found: "literal 4".to_string(),
        };
        assert_eq!(infer_type(&mut store, &ctx, bad), Err(expected.clone()));
        assert_eq!(evaluate(&mut store, &ctx, bad), Err(expected));
    }

    #[test]
    fn comptime_argument_from_a_runtime_parameter() {
        let mut store = Store::new();
        let ctx = Context::new();
        let cimport = store.builtin("cimport").unwrap();
        let header = store.new_variable(false, Some("header"));
        let header_term = store.variable_term(header);
        let top = store.top_type();
        let body = store.apply(cimport, vec![header_term]);
        let function = store.abstraction(vec![], vec![Param { var: header, ty: top }], body);

        let err = compile(&mut store, &ctx, function).unwrap_err();
        assert_eq!(err, CoreError::ComptimeArgumentUnavailable { index: 0 });
    }

    #[test]
    fn generic_function_rejects_a_mismatched_second_use() {
        let mut store = Store::new();
        let ctx = Context::new();
        let (identity, _) = identity_function(&mut store);
        // forall U. fn(f: fn(U) -> U, x: U) => f(x), applied to identity and a string
        let t = store.new_variable(true, Some("U"));
        let f = store.new_variable(false, Some("f"));
        let x = store.new_variable(false, Some("x"));
        let t_term = store.variable_term(t);
        let f_term = store.variable_term(f);
        let x_term = store.variable_term(x);
        let call_f = store.apply(f_term, vec![x_term]);
        let f_ty = store.function_type(
            vec![ParamType::new(t_term, false)],
            t_term,
        );
        let apply_fn = store.abstraction(
            vec![],
            vec![Param { var: f, ty: f_ty }, Param { var: x, ty: t_term }],
            call_f,
        );
        let apply_fn = store.for_all(vec![t], apply_fn);

        let text = store.string("s");
        let call = store.apply(apply_fn, vec![identity, text]);
        // identity's type is quantified, so it is not a plain fn(U) -> U
        let err = infer_type(&mut store, &ctx, call).unwrap_err();
        assert!(matches!(err, CoreError::UnificationFailure { .. }));
    }
}

// ============================================================================
// Products
// ============================================================================

mod products {
    use super::*;

    #[test]
    fn missing_field_suggests_close_names() {
        let mut store = Store::new();
        let ctx = Context::new();
        let cimport = store.builtin("cimport").unwrap();
        let header = store.string("#include <stdio>");
        let module = store.apply(cimport, vec![header]);
        let typo = store.project(module, "prinft");

        let err = infer_type(&mut store, &ctx, typo).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no field `prinft` (did you mean `printf`?)"
        );
    }

    #[test]
    fn projecting_from_a_literal() {
        let mut store = Store::new();
        let ctx = Context::new();
        let five = store.numeric(5);
        let projection = store.project(five, "x");
        assert!(matches!(
            evaluate(&mut store, &ctx, projection),
            Err(CoreError::NotAProduct { .. })
        ));
        assert!(matches!(
            infer_type(&mut store, &ctx, projection),
            Err(CoreError::NotAProduct { .. })
        ));
    }

    #[test]
    fn missing_field_without_suggestions() {
        let mut store = Store::new();
        let ctx = Context::new();
        let point = point_value(&mut store, 1, 2);
        let projection = store.project(point, "longitude");
        let err = evaluate(&mut store, &ctx, projection).unwrap_err();
        assert_eq!(err.to_string(), "no field `longitude`");
    }
}

// ============================================================================
// Limits
// ============================================================================

mod limits {
    use super::*;

    #[test]
    fn deep_terms_hit_the_configured_limit() {
        let mut store = Store::with_config(CoreConfig::new().with_max_depth(16));
        let ctx = Context::new();
        let top = store.top_type();
        let mut term = store.numeric(0);
        for _ in 0..64 {
            term = store.product_value(top, vec![("next", term)]);
        }
        assert_eq!(
            evaluate(&mut store, &ctx, term),
            Err(CoreError::DepthExceeded { limit: 16 })
        );
    }

    #[test]
    fn depth_failures_are_not_cached() {
        let mut store = Store::with_config(CoreConfig::new().with_max_depth(8));
        let ctx = Context::new();
        let mut ty = store.top_type();
        for _ in 0..16 {
            ty = store.product_type(vec![("next", ty)]);
        }
        let placeholder = store.deferred(ty, Availability::Runtime);
        let before = store.type_cache_len();
        assert!(infer_type(&mut store, &ctx, placeholder).is_err());
        assert_eq!(store.type_cache_len(), before);
    }
}
