//! The term store: owner of every term in a compilation
//!
//! The store hash-conses terms so that structurally equal shapes share one
//! id, allocates fresh variables, keeps the canonical builtin types, and
//! memoizes free-variable sets and inferred types. All caches are
//! append-only for the lifetime of the store.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info, trace};
use num::{BigInt, BigRational};

use crate::builtins::{self, BuiltinRegistry, NativeEntry, NativeFunction};
use crate::config::CoreConfig;
use crate::context::Restriction;
use crate::errors::{CoreError, CoreResult};
use crate::free_vars::{self, FreeVariables};
use crate::term::{
    Availability, Binding, Field, Member, Name, NativeId, Param, ParamType, Term, TermId, VarId,
};

#[derive(Debug, Clone)]
struct VariableInfo {
    name: Name,
    comptime: bool,
}

/// Canonical instances created when the store is built
#[derive(Debug, Clone, Copy, Default)]
struct Singletons {
    type_of_types: TermId,
    unit_type: TermId,
    bottom_type: TermId,
    top_type: TermId,
    /// `Deferred { ty: TypeOfTypes, Comptime }`: some type known at compile time
    comptime_type: TermId,
}

/// Memo key for type inference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TypeKey {
    term: TermId,
    bindings: Restriction,
}

pub struct Store {
    terms: Vec<Term>,
    index: HashMap<Term, TermId>,
    variables: Vec<VariableInfo>,
    next_named_type: u32,
    singletons: Singletons,
    free_vars: HashMap<TermId, Rc<FreeVariables>>,
    free_var_sets: HashSet<Rc<FreeVariables>>,
    empty_free_vars: Rc<FreeVariables>,
    type_cache: HashMap<TypeKey, CoreResult<TermId>>,
    registry: BuiltinRegistry,
    config: CoreConfig,
    depth: usize,
    output: Box<dyn Write>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        let empty_free_vars = free_vars::empty();
        let mut free_var_sets = HashSet::new();
        free_var_sets.insert(empty_free_vars.clone());

        let mut store = Store {
            terms: Vec::new(),
            index: HashMap::new(),
            variables: Vec::new(),
            next_named_type: 0,
            singletons: Singletons::default(),
            free_vars: HashMap::new(),
            free_var_sets,
            empty_free_vars,
            type_cache: HashMap::new(),
            registry: BuiltinRegistry::new(),
            config,
            depth: 0,
            output: Box::new(io::stdout()),
        };

        // TypeOfTypes is typed by itself, so it has to exist before any other
        // type can mention it: allocate it first, then everything that points at it.
        let type_of_types = store.canonicalize(Term::TypeOfTypes);
        store.singletons.type_of_types = type_of_types;
        store.singletons.unit_type = store.canonicalize(Term::UnitType);
        store.singletons.bottom_type = store.canonicalize(Term::BottomType);
        store.singletons.top_type = store.canonicalize(Term::TopType);
        store.singletons.comptime_type = store.canonicalize(Term::Deferred {
            ty: type_of_types,
            availability: Availability::Comptime,
        });

        builtins::install_defaults(&mut store);
        store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // ========================================================================
    // Canonicalization
    // ========================================================================

    /// Return the canonical id for `term`, inserting it if no structurally
    /// equal term exists yet. A `ForAll` over no variables is its body.
    pub fn canonicalize(&mut self, term: Term) -> TermId {
        if let Term::ForAll { vars, body } = &term {
            if vars.is_empty() {
                return *body;
            }
        }
        if let Some(&id) = self.index.get(&term) {
            return id;
        }
        let id = TermId(self.terms.len() as u32);
        trace!("canonical {} {}", term.kind_name(), id);
        self.terms.push(term.clone());
        self.index.insert(term, id);
        id
    }

    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id.index()]
    }

    // ========================================================================
    // Variables
    // ========================================================================

    /// Allocate a variable that is distinct from every other one, whatever
    /// its name. Unnamed variables are called `GV#<n>`.
    pub fn new_variable(&mut self, comptime: bool, name: Option<&str>) -> VarId {
        let id = VarId(self.variables.len() as u32);
        let name: Name = match name {
            Some(name) => name.into(),
            None => format!("GV#{}", id.0).into(),
        };
        self.variables.push(VariableInfo { name, comptime });
        id
    }

    pub fn variable_term(&mut self, var: VarId) -> TermId {
        self.canonicalize(Term::Variable(var))
    }

    pub fn variable_name(&self, var: VarId) -> &str {
        &self.variables[var.index()].name
    }

    pub fn is_comptime(&self, var: VarId) -> bool {
        self.variables[var.index()].comptime
    }

    /// A nominal type distinct from every other named type
    pub fn new_named_type(&mut self, name: &str) -> TermId {
        let id = self.next_named_type;
        self.next_named_type += 1;
        self.canonicalize(Term::NamedType {
            name: name.into(),
            id,
        })
    }

    // ========================================================================
    // Canonical singletons
    // ========================================================================

    pub fn type_of_types(&self) -> TermId {
        self.singletons.type_of_types
    }

    pub fn unit_type(&self) -> TermId {
        self.singletons.unit_type
    }

    pub fn bottom_type(&self) -> TermId {
        self.singletons.bottom_type
    }

    pub fn top_type(&self) -> TermId {
        self.singletons.top_type
    }

    /// Stand-in bound to quantified variables: a comptime value whose type
    /// is `TypeOfTypes`
    pub fn comptime_type(&self) -> TermId {
        self.singletons.comptime_type
    }

    // ========================================================================
    // Builders
    // ========================================================================

    pub fn string(&mut self, value: &str) -> TermId {
        self.canonicalize(Term::StringLiteral(value.into()))
    }

    pub fn numeric(&mut self, value: i64) -> TermId {
        self.rational(BigRational::from_integer(BigInt::from(value)))
    }

    pub fn rational(&mut self, value: BigRational) -> TermId {
        self.canonicalize(Term::NumericLiteral(value))
    }

    pub fn string_type(&mut self, value: &str) -> TermId {
        self.canonicalize(Term::StringLiteralType(value.into()))
    }

    pub fn numeric_type(&mut self, value: i64) -> TermId {
        self.canonicalize(Term::NumericLiteralType(BigRational::from_integer(
            BigInt::from(value),
        )))
    }

    pub fn unit_value(&mut self, ty: TermId) -> TermId {
        self.canonicalize(Term::UnitValue { ty })
    }

    pub fn product_value(&mut self, ty: TermId, fields: Vec<(&str, TermId)>) -> TermId {
        let fields = fields
            .into_iter()
            .map(|(name, value)| Field {
                name: name.into(),
                value,
            })
            .collect();
        self.canonicalize(Term::ProductValue { ty, fields })
    }

    /// Product with positional fields, named `"0"`, `"1"`, ...
    pub fn tuple(&mut self, ty: TermId, values: Vec<TermId>) -> TermId {
        let fields = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Field {
                name: i.to_string().into(),
                value,
            })
            .collect();
        self.canonicalize(Term::ProductValue { ty, fields })
    }

    pub fn product_type(&mut self, members: Vec<(&str, TermId)>) -> TermId {
        let members = members
            .into_iter()
            .map(|(name, ty)| Member {
                name: name.into(),
                ty,
            })
            .collect();
        self.canonicalize(Term::ProductType { members })
    }

    pub fn function_type(&mut self, params: Vec<ParamType>, result: TermId) -> TermId {
        self.canonicalize(Term::FunctionType { params, result })
    }

    pub fn abstraction(&mut self, bindings: Vec<Binding>, params: Vec<Param>, body: TermId) -> TermId {
        self.canonicalize(Term::Abstraction {
            bindings,
            params,
            body,
        })
    }

    /// `let v1 = e1; ...; vn = en in body`, as a parameterless abstraction
    pub fn let_in(&mut self, bindings: Vec<(VarId, TermId)>, body: TermId) -> TermId {
        let bindings = bindings
            .into_iter()
            .map(|(var, value)| Binding { var, value })
            .collect();
        self.abstraction(bindings, vec![], body)
    }

    pub fn for_all(&mut self, vars: Vec<VarId>, body: TermId) -> TermId {
        self.canonicalize(Term::ForAll { vars, body })
    }

    pub fn apply(&mut self, callee: TermId, args: Vec<TermId>) -> TermId {
        self.canonicalize(Term::Application { callee, args })
    }

    pub fn project(&mut self, domain: TermId, field: &str) -> TermId {
        self.canonicalize(Term::Projection {
            domain,
            field: field.into(),
        })
    }

    pub fn cast(&mut self, subject: TermId, target: TermId) -> TermId {
        self.canonicalize(Term::Cast { subject, target })
    }

    pub fn deferred(&mut self, ty: TermId, availability: Availability) -> TermId {
        self.canonicalize(Term::Deferred { ty, availability })
    }

    // ========================================================================
    // Derived facts
    // ========================================================================

    /// Free variables of `term`, computed once and interned
    pub fn free_variables_of(&mut self, term: TermId) -> Rc<FreeVariables> {
        if let Some(fv) = self.free_vars.get(&term) {
            return fv.clone();
        }
        let computed = free_vars::compute(self, term);
        let interned = if computed.is_empty() {
            self.empty_free_vars.clone()
        } else if let Some(existing) = self.free_var_sets.get(&computed) {
            existing.clone()
        } else {
            let fresh = Rc::new(computed);
            self.free_var_sets.insert(fresh.clone());
            fresh
        };
        self.free_vars.insert(term, interned.clone());
        interned
    }

    /// Closed and not a placeholder: usable wherever a comptime value is needed
    pub fn is_concrete(&mut self, term: TermId) -> bool {
        !self.term(term).is_deferred() && self.free_variables_of(term).is_empty()
    }

    /// Memoized type of `term` under the context restriction `bindings`.
    /// `compute` runs only on a miss and may recurse into the store.
    pub fn type_of_in_context(
        &mut self,
        term: TermId,
        bindings: Restriction,
        compute: impl FnOnce(&mut Store) -> CoreResult<TermId>,
    ) -> CoreResult<TermId> {
        let key = TypeKey { term, bindings };
        if let Some(cached) = self.type_cache.get(&key) {
            return cached.clone();
        }
        debug!("type cache miss for {} {}", self.term(term).kind_name(), term);
        let result = compute(self);
        // Depth failures depend on where the query was made, not on the term
        if !matches!(result, Err(CoreError::DepthExceeded { .. })) {
            self.type_cache.insert(key, result.clone());
        }
        result
    }

    pub fn type_cache_len(&self) -> usize {
        self.type_cache.len()
    }

    /// Run `f` one level deeper, failing once the configured limit is hit
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Store) -> CoreResult<T>,
    ) -> CoreResult<T> {
        if self.depth >= self.config.max_depth {
            return Err(CoreError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ========================================================================
    // Natives
    // ========================================================================

    /// Register a native function and return the leaf term standing for it
    pub fn register_native(&mut self, def: NativeFunction) -> TermId {
        let signature = (def.signature)(self);
        let id = self.registry.insert(def, signature);
        self.canonicalize(Term::Native(id))
    }

    pub fn native(&self, id: NativeId) -> &NativeEntry {
        self.registry.get(id)
    }

    /// Leaf term of a registered native, by name
    pub fn builtin(&mut self, name: &str) -> Option<TermId> {
        let id = self.registry.lookup(name)?;
        Some(self.canonicalize(Term::Native(id)))
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Where natives write their output
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    /// Write `text` for a native, returning the number of bytes written
    pub fn write_output(&mut self, text: &str) -> CoreResult<usize> {
        let io_error = |e: io::Error| CoreError::Native {
            name: "output".into(),
            message: e.to_string(),
        };
        self.output.write_all(text.as_bytes()).map_err(io_error)?;
        self.output.flush().map_err(io_error)?;
        if self.config.echo_native_output {
            info!("native output: {:?}", text);
        }
        Ok(text.len())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
