//! Lexical environments: a frame of bindings with a borrowed parent
//!
//! Frames are created per recursive call and dropped when it returns. The
//! parent link is a plain borrow, so a child can never outlive its parent.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::{CoreError, CoreResult};
use crate::eval::is_value;
use crate::store::Store;
use crate::term::{TermId, Usage, VarId};

/// What a memoized result may depend on for one variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observed {
    Unbound,
    /// The bound term itself
    Bound(TermId),
    /// Only the type of the bound value. Used for runtime variables that
    /// never flow into a type and are bound to a value.
    Typed(TermId),
}

/// Observations of the free variables a cached result depends on, sorted
/// by variable
pub type Restriction = Vec<(VarId, Observed)>;

#[derive(Debug, Default)]
pub struct Context<'p> {
    bindings: HashMap<VarId, TermId>,
    parent: Option<&'p Context<'p>>,
}

impl<'p> Context<'p> {
    /// An empty root frame
    pub fn new() -> Context<'static> {
        Context {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    pub fn child(parent: &'p Context<'p>) -> Context<'p> {
        Context {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Bind `var` in this frame. Each variable is bound at most once per frame;
    /// shadowing a binding from a parent frame is allowed.
    pub fn bind(&mut self, store: &Store, var: VarId, value: TermId) -> CoreResult<()> {
        if self.bindings.contains_key(&var) {
            return Err(CoreError::AlreadyBound {
                name: store.variable_name(var).to_string(),
            });
        }
        self.bindings.insert(var, value);
        Ok(())
    }

    /// Walks parent frames up to the root
    pub fn get(&self, var: VarId) -> Option<TermId> {
        let mut frame = Some(self);
        while let Some(ctx) = frame {
            if let Some(&value) = ctx.bindings.get(&var) {
                return Some(value);
            }
            frame = ctx.parent;
        }
        None
    }

    /// The bindings `term` can observe: its free variables and, transitively,
    /// the free variables of the terms they are bound to.
    ///
    /// Comptime variables and variables that flow into a type are observed by
    /// their bound term. A runtime variable used only as a value is observed
    /// by the type of its value, as given by `type_of`, so inference under
    /// different runtime values of one type shares a cache entry.
    pub fn restrict(
        &self,
        store: &mut Store,
        term: TermId,
        mut type_of: impl FnMut(&mut Store, TermId) -> CoreResult<TermId>,
    ) -> CoreResult<Restriction> {
        let mut seen: HashSet<VarId> = HashSet::new();
        let mut found: BTreeMap<VarId, Observed> = BTreeMap::new();
        let mut pending: Vec<(VarId, Usage)> = store.free_variables_of(term).iter().collect();

        while let Some((var, usage)) = pending.pop() {
            if !seen.insert(var) {
                continue;
            }
            let observed = match self.get(var) {
                None => Observed::Unbound,
                Some(value)
                    if usage == Usage::FlowsIntoValue
                        && !store.is_comptime(var)
                        && is_value(store, value) =>
                {
                    Observed::Typed(type_of(store, value)?)
                }
                Some(value) => {
                    pending.extend(store.free_variables_of(value).iter());
                    Observed::Bound(value)
                }
            };
            found.insert(var, observed);
        }

        Ok(found.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer_type;
    use crate::term::Availability;

    #[test]
    fn test_lookup_walks_parents() {
        let mut store = Store::new();
        let x = store.new_variable(false, Some("x"));
        let y = store.new_variable(false, Some("y"));
        let one = store.numeric(1);
        let two = store.numeric(2);

        let mut root = Context::new();
        root.bind(&store, x, one).unwrap();
        let mut child = Context::child(&root);
        child.bind(&store, y, two).unwrap();

        assert_eq!(child.get(x), Some(one));
        assert_eq!(child.get(y), Some(two));
        assert_eq!(root.get(y), None);
    }

    #[test]
    fn test_child_shadows_parent() {
        let mut store = Store::new();
        let x = store.new_variable(false, Some("x"));
        let one = store.numeric(1);
        let two = store.numeric(2);

        let mut root = Context::new();
        root.bind(&store, x, one).unwrap();
        let mut child = Context::child(&root);
        child.bind(&store, x, two).unwrap();
        assert_eq!(child.get(x), Some(two));
    }

    #[test]
    fn test_rebinding_in_same_frame_fails() {
        let mut store = Store::new();
        let x = store.new_variable(false, Some("x"));
        let one = store.numeric(1);

        let mut ctx = Context::new();
        ctx.bind(&store, x, one).unwrap();
        let err = ctx.bind(&store, x, one).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyBound { name } if name == "x"));
    }

    #[test]
    fn test_restrict_follows_bound_values() {
        let mut store = Store::new();
        let x = store.new_variable(false, Some("x"));
        let y = store.new_variable(false, Some("y"));
        let unrelated = store.new_variable(false, Some("z"));
        let x_term = store.variable_term(x);
        let y_term = store.variable_term(y);
        let three = store.numeric(3);

        let mut ctx = Context::new();
        ctx.bind(&store, x, y_term).unwrap();
        ctx.bind(&store, y, three).unwrap();
        ctx.bind(&store, unrelated, three).unwrap();

        let restriction = ctx
            .restrict(&mut store, x_term, |store, value| infer_type(store, &ctx, value))
            .unwrap();
        let three_ty = store.numeric_type(3);
        assert_eq!(
            restriction,
            vec![(x, Observed::Bound(y_term)), (y, Observed::Typed(three_ty))]
        );
    }

    #[test]
    fn test_restrict_keeps_comptime_values() {
        let mut store = Store::new();
        let t = store.new_variable(true, Some("T"));
        let t_term = store.variable_term(t);
        let three = store.numeric(3);

        let mut ctx = Context::new();
        ctx.bind(&store, t, three).unwrap();
        let restriction = ctx
            .restrict(&mut store, t_term, |store, value| infer_type(store, &ctx, value))
            .unwrap();
        assert_eq!(restriction, vec![(t, Observed::Bound(three))]);
    }

    #[test]
    fn test_restrict_keeps_placeholders() {
        let mut store = Store::new();
        let x = store.new_variable(false, Some("x"));
        let x_term = store.variable_term(x);
        let top = store.top_type();
        let placeholder = store.deferred(top, Availability::Runtime);

        let mut ctx = Context::new();
        ctx.bind(&store, x, placeholder).unwrap();
        let restriction = ctx
            .restrict(&mut store, x_term, |store, value| infer_type(store, &ctx, value))
            .unwrap();
        assert_eq!(restriction, vec![(x, Observed::Bound(placeholder))]);
    }
}
