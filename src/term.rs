//! Term representation shared by every stage of the core
//!
//! Terms are immutable and only ever created through the [`Store`], which
//! hands out [`TermId`]s. Children of a term are themselves canonical ids,
//! so deriving `Eq`/`Hash` on [`Term`] gives exactly the structural
//! equality the store needs for hash-consing.
//!
//! [`Store`]: crate::store::Store

use std::fmt;
use std::rc::Rc;

use num::{BigInt, BigRational, Zero};

use crate::errors::{CoreError, CoreResult};

/// Field, member and variable names
pub type Name = Rc<str>;

/// Handle to a canonical term owned by a `Store`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

impl TermId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a variable. Two allocations never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Key of a native function in the builtin registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeId(pub(crate) u32);

impl NativeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// When a deferred value becomes available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    Comptime,
    Runtime,
}

impl Availability {
    pub fn from_comptime(comptime: bool) -> Self {
        if comptime {
            Availability::Comptime
        } else {
            Availability::Runtime
        }
    }
}

/// How a free variable is used by the term that mentions it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Usage {
    FlowsIntoType,
    FlowsIntoValue,
}

impl Usage {
    /// `FlowsIntoType` dominates
    pub fn merge(self, other: Usage) -> Usage {
        if self == Usage::FlowsIntoType || other == Usage::FlowsIntoType {
            Usage::FlowsIntoType
        } else {
            Usage::FlowsIntoValue
        }
    }
}

/// A parameter of an abstraction: the variable it binds and its declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub var: VarId,
    pub ty: TermId,
}

/// A `let`-style binding closed over by an abstraction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub var: VarId,
    pub value: TermId,
}

/// A parameter slot of a function type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub ty: TermId,
    pub comptime: bool,
    /// Quantified variable this comptime slot supplies, when later slots or
    /// the result mention it
    pub binds: Option<VarId>,
}

impl ParamType {
    pub fn new(ty: TermId, comptime: bool) -> Self {
        ParamType {
            ty,
            comptime,
            binds: None,
        }
    }
}

/// A field of a product value. Positional fields are named by their index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: Name,
    pub value: TermId,
}

/// A member of a product type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub name: Name,
    pub ty: TermId,
}

/// The closed set of term shapes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Nominal variable; identity is the only equality
    Variable(VarId),
    /// Bindings are evaluated in order, each seeing the previous ones.
    /// With no params this is a (possibly pending) value, not a function.
    Abstraction {
        bindings: Vec<Binding>,
        params: Vec<Param>,
        body: TermId,
    },
    /// Universally quantified variables over an inner term. Never empty.
    ForAll { vars: Vec<VarId>, body: TermId },
    Application { callee: TermId, args: Vec<TermId> },
    Projection { domain: TermId, field: Name },
    Cast { subject: TermId, target: TermId },

    StringLiteral(Name),
    NumericLiteral(BigRational),
    UnitValue { ty: TermId },
    ProductValue { ty: TermId, fields: Vec<Field> },
    /// Placeholder for a value of type `ty` that is not available yet
    Deferred { ty: TermId, availability: Availability },
    /// Leaf standing for a registered native function
    Native(NativeId),

    /// The type of types; its own type is itself
    TypeOfTypes,
    UnitType,
    BottomType,
    TopType,
    FunctionType { params: Vec<ParamType>, result: TermId },
    ProductType { members: Vec<Member> },
    StringLiteralType(Name),
    NumericLiteralType(BigRational),
    /// Nominal type, equal only to itself
    NamedType { name: Name, id: u32 },
}

impl Term {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Term::Variable(_) => "Variable",
            Term::Abstraction { .. } => "Abstraction",
            Term::ForAll { .. } => "ForAll",
            Term::Application { .. } => "Application",
            Term::Projection { .. } => "Projection",
            Term::Cast { .. } => "Cast",
            Term::StringLiteral(_) => "StringLiteral",
            Term::NumericLiteral(_) => "NumericLiteral",
            Term::UnitValue { .. } => "UnitValue",
            Term::ProductValue { .. } => "ProductValue",
            Term::Deferred { .. } => "Deferred",
            Term::Native(_) => "Native",
            Term::TypeOfTypes => "TypeOfTypes",
            Term::UnitType => "UnitType",
            Term::BottomType => "BottomType",
            Term::TopType => "TopType",
            Term::FunctionType { .. } => "FunctionType",
            Term::ProductType { .. } => "ProductType",
            Term::StringLiteralType(_) => "StringLiteralType",
            Term::NumericLiteralType(_) => "NumericLiteralType",
            Term::NamedType { .. } => "NamedType",
        }
    }

    /// Terms whose type is `TypeOfTypes`
    pub fn is_type_former(&self) -> bool {
        matches!(
            self,
            Term::TypeOfTypes
                | Term::UnitType
                | Term::BottomType
                | Term::TopType
                | Term::FunctionType { .. }
                | Term::ProductType { .. }
                | Term::StringLiteralType(_)
                | Term::NumericLiteralType(_)
                | Term::NamedType { .. }
        )
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Term::Deferred { .. })
    }
}

/// Parse an exact numeric literal: `42`, `-3.25`, or `1/3`.
pub fn parse_numeric(text: &str) -> CoreResult<BigRational> {
    let invalid = || CoreError::Native {
        name: "numeric literal".into(),
        message: format!("`{}` is not a number", text),
    };
    let text = text.trim();

    if let Some((numer, denom)) = text.split_once('/') {
        let numer: BigInt = numer.trim().parse().map_err(|_| invalid())?;
        let denom: BigInt = denom.trim().parse().map_err(|_| invalid())?;
        if denom.is_zero() {
            return Err(invalid());
        }
        return Ok(BigRational::new(numer, denom));
    }

    if let Some((whole, frac)) = text.split_once('.') {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let negative = whole.starts_with('-');
        let digits = format!("{}{}", whole.trim_start_matches(['-', '+']), frac);
        let mut numer: BigInt = digits.parse().map_err(|_| invalid())?;
        if negative {
            numer = -numer;
        }
        let denom = num::pow(BigInt::from(10u32), frac.len());
        return Ok(BigRational::new(numer, denom));
    }

    let value: BigInt = text.parse().map_err(|_| invalid())?;
    Ok(BigRational::from_integer(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        let n = parse_numeric("42").unwrap();
        assert_eq!(n, BigRational::from_integer(BigInt::from(42)));
    }

    #[test]
    fn test_parse_decimal_is_exact() {
        let n = parse_numeric("-3.25").unwrap();
        assert_eq!(n, BigRational::new(BigInt::from(-13), BigInt::from(4)));
        // 0.1 + 0.2 == 0.3 holds exactly
        let sum = parse_numeric("0.1").unwrap() + parse_numeric("0.2").unwrap();
        assert_eq!(sum, parse_numeric("0.3").unwrap());
    }

    #[test]
    fn test_parse_fraction() {
        let n = parse_numeric("2/6").unwrap();
        assert_eq!(n, BigRational::new(BigInt::from(1), BigInt::from(3)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_numeric("abc").is_err());
        assert!(parse_numeric("1/0").is_err());
        assert!(parse_numeric("1.").is_err());
    }

    #[test]
    fn test_usage_merge_prefers_type() {
        assert_eq!(
            Usage::FlowsIntoValue.merge(Usage::FlowsIntoType),
            Usage::FlowsIntoType
        );
        assert_eq!(
            Usage::FlowsIntoValue.merge(Usage::FlowsIntoValue),
            Usage::FlowsIntoValue
        );
    }
}
