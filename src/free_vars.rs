//! Free-variable analysis over term shapes
//!
//! Results are computed bottom-up and interned by the store, so every term
//! is analysed once and equal sets share one allocation.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::store::Store;
use crate::term::{Term, TermId, Usage, VarId};

/// Open variables of a term, each tagged with how it is used
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FreeVariables {
    vars: BTreeMap<VarId, Usage>,
}

impl FreeVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `var`, merging with an existing tag
    pub fn insert(&mut self, var: VarId, usage: Usage) {
        self.vars
            .entry(var)
            .and_modify(|u| *u = u.merge(usage))
            .or_insert(usage);
    }

    pub fn remove(&mut self, var: VarId) {
        self.vars.remove(&var);
    }

    pub fn union_with(&mut self, other: &FreeVariables) {
        for (&var, &usage) in &other.vars {
            self.insert(var, usage);
        }
    }

    /// Union, with every incoming variable tagged `FlowsIntoType`
    pub fn union_as_type(&mut self, other: &FreeVariables) {
        for &var in other.vars.keys() {
            self.insert(var, Usage::FlowsIntoType);
        }
    }

    pub fn contains(&self, var: VarId) -> bool {
        self.vars.contains_key(&var)
    }

    pub fn usage(&self, var: VarId) -> Option<Usage> {
        self.vars.get(&var).copied()
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.vars.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, Usage)> + '_ {
        self.vars.iter().map(|(&v, &u)| (v, u))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Compute the free variables of `term` from those of its children.
/// Called by the store on a cache miss; children go through the cache.
pub(crate) fn compute(store: &mut Store, term: TermId) -> FreeVariables {
    let mut fv = FreeVariables::new();

    match store.term(term).clone() {
        Term::Variable(var) => fv.insert(var, Usage::FlowsIntoValue),

        Term::Abstraction {
            bindings,
            params,
            body,
        } => {
            fv.union_with(&store.free_variables_of(body));
            for param in &params {
                fv.union_as_type(&store.free_variables_of(param.ty));
            }
            for param in &params {
                fv.remove(param.var);
            }
            // Sequential `let`: a binding's value sees only earlier bindings
            for binding in bindings.iter().rev() {
                fv.remove(binding.var);
                fv.union_with(&store.free_variables_of(binding.value));
            }
        }

        Term::ForAll { vars, body } => {
            fv.union_with(&store.free_variables_of(body));
            for var in vars {
                fv.remove(var);
            }
        }

        Term::Application { callee, args } => {
            fv.union_with(&store.free_variables_of(callee));
            for arg in args {
                fv.union_with(&store.free_variables_of(arg));
            }
        }

        Term::Projection { domain, .. } => fv.union_with(&store.free_variables_of(domain)),

        Term::Cast { subject, target } => {
            fv.union_with(&store.free_variables_of(subject));
            fv.union_as_type(&store.free_variables_of(target));
        }

        Term::UnitValue { ty } | Term::Deferred { ty, .. } => {
            fv.union_as_type(&store.free_variables_of(ty));
        }

        Term::ProductValue { ty, fields } => {
            fv.union_as_type(&store.free_variables_of(ty));
            for field in fields {
                fv.union_with(&store.free_variables_of(field.value));
            }
        }

        Term::FunctionType { params, result } => {
            for param in params {
                fv.union_as_type(&store.free_variables_of(param.ty));
            }
            fv.union_as_type(&store.free_variables_of(result));
        }

        Term::ProductType { members } => {
            for member in members {
                fv.union_as_type(&store.free_variables_of(member.ty));
            }
        }

        Term::StringLiteral(_)
        | Term::NumericLiteral(_)
        | Term::Native(_)
        | Term::TypeOfTypes
        | Term::UnitType
        | Term::BottomType
        | Term::TopType
        | Term::StringLiteralType(_)
        | Term::NumericLiteralType(_)
        | Term::NamedType { .. } => {}
    }

    fv
}

/// Shared empty set for closed terms
pub(crate) fn empty() -> Rc<FreeVariables> {
    Rc::new(FreeVariables::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Param;

    #[test]
    fn test_literals_are_closed() {
        let mut store = Store::new();
        let lit = store.string("hello");
        let num = store.numeric(7);
        let ty = store.type_of_types();
        assert!(store.free_variables_of(lit).is_empty());
        assert!(store.free_variables_of(num).is_empty());
        assert!(store.free_variables_of(ty).is_empty());
    }

    #[test]
    fn test_parameter_is_not_free() {
        let mut store = Store::new();
        let p = store.new_variable(false, Some("p"));
        let q = store.new_variable(false, Some("q"));
        let p_term = store.variable_term(p);
        let q_term = store.variable_term(q);
        let top = store.top_type();
        let body = store.product_value(top, vec![("a", p_term), ("b", q_term)]);
        let abs = store.abstraction(vec![], vec![Param { var: p, ty: top }], body);

        let fv = store.free_variables_of(abs);
        assert!(!fv.contains(p));
        assert!(fv.contains(q));
        assert_eq!(fv.usage(q), Some(Usage::FlowsIntoValue));
    }

    #[test]
    fn test_param_type_flows_into_type() {
        let mut store = Store::new();
        let t = store.new_variable(true, Some("T"));
        let x = store.new_variable(false, Some("x"));
        let t_term = store.variable_term(t);
        let x_term = store.variable_term(x);
        let abs = store.abstraction(vec![], vec![Param { var: x, ty: t_term }], x_term);

        let fv = store.free_variables_of(abs);
        assert_eq!(fv.usage(t), Some(Usage::FlowsIntoType));

        let quantified = store.for_all(vec![t], abs);
        assert!(store.free_variables_of(quantified).is_empty());
    }

    #[test]
    fn test_bindings_are_sequential() {
        let mut store = Store::new();
        let a = store.new_variable(false, Some("a"));
        let b = store.new_variable(false, Some("b"));
        let outer = store.new_variable(false, Some("outer"));
        let a_term = store.variable_term(a);
        let b_term = store.variable_term(b);
        let outer_term = store.variable_term(outer);

        // let a = outer; let b = a in b
        let abs = store.let_in(vec![(a, outer_term), (b, a_term)], b_term);
        let fv = store.free_variables_of(abs);
        assert_eq!(fv.vars().collect::<Vec<_>>(), vec![outer]);
    }

    #[test]
    fn test_variable_used_as_type_dominates() {
        let mut store = Store::new();
        let t = store.new_variable(true, Some("T"));
        let t_term = store.variable_term(t);
        let cast = store.cast(t_term, t_term);
        assert_eq!(
            store.free_variables_of(cast).usage(t),
            Some(Usage::FlowsIntoType)
        );
    }

    #[test]
    fn test_equal_sets_are_shared() {
        let mut store = Store::new();
        let x = store.new_variable(false, Some("x"));
        let x_term = store.variable_term(x);
        let top = store.top_type();
        let first = store.product_value(top, vec![("a", x_term)]);
        let second = store.product_value(top, vec![("b", x_term)]);
        let fv1 = store.free_variables_of(first);
        let fv2 = store.free_variables_of(second);
        assert!(Rc::ptr_eq(&fv1, &fv2));
    }
}
