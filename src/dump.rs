//! Rendering terms for diagnostics
//!
//! [`Store::show`] gives a one-line form used in error messages and logs.
//! [`Store::dump`] gives an indented tree: a flat list of text lines
//! interleaved with indent and dedent markers. Neither can be parsed back.

use std::fmt;

use crate::store::Store;
use crate::term::{Availability, Param, ParamType, Term, TermId, VarId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpLine {
    Text(String),
    Indent,
    Dedent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dump {
    pub lines: Vec<DumpLine>,
}

impl Dump {
    fn text(&mut self, line: impl Into<String>) {
        self.lines.push(DumpLine::Text(line.into()));
    }

    fn nested(&mut self, f: impl FnOnce(&mut Dump)) {
        self.lines.push(DumpLine::Indent);
        f(self);
        self.lines.push(DumpLine::Dedent);
    }

    /// Two spaces per indent level, one line per text entry
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        for line in &self.lines {
            match line {
                DumpLine::Indent => depth += 1,
                DumpLine::Dedent => depth = depth.saturating_sub(1),
                DumpLine::Text(text) => {
                    for _ in 0..depth {
                        out.push_str("  ");
                    }
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
        out
    }
}

impl fmt::Display for Dump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Store {
    /// One-line rendering of `term`
    pub fn show(&self, term: TermId) -> String {
        match self.term(term) {
            Term::Variable(var) => self.variable_name(*var).to_string(),
            Term::Abstraction {
                bindings,
                params,
                body,
            } => {
                let lets: Vec<String> = bindings
                    .iter()
                    .map(|b| format!("let {} = {}", self.variable_name(b.var), self.show(b.value)))
                    .collect();
                if params.is_empty() {
                    let mut parts = lets;
                    parts.push(self.show(*body));
                    format!("{{{}}}", parts.join("; "))
                } else {
                    let lets = if lets.is_empty() {
                        String::new()
                    } else {
                        format!("[{}]", lets.join("; "))
                    };
                    format!("fn{}({}) => {}", lets, self.show_params(params), self.show(*body))
                }
            }
            Term::ForAll { vars, body } => {
                format!("forall {}. {}", self.show_vars(vars), self.show(*body))
            }
            Term::Application { callee, args } => {
                let args: Vec<String> = args.iter().map(|&a| self.show(a)).collect();
                format!("{}({})", self.show(*callee), args.join(", "))
            }
            Term::Projection { domain, field } => format!("{}.{}", self.show(*domain), field),
            Term::Cast { subject, target } => {
                format!("({} as {})", self.show(*subject), self.show(*target))
            }
            Term::StringLiteral(value) => format!("{:?}", &**value),
            Term::NumericLiteral(value) => value.to_string(),
            Term::UnitValue { ty } => format!("{}{{}}", self.show(*ty)),
            Term::ProductValue { fields, .. } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} = {}", f.name, self.show(f.value)))
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
            Term::Deferred { ty, availability } => {
                let when = match availability {
                    Availability::Comptime => "comptime",
                    Availability::Runtime => "runtime",
                };
                format!("<{} {}>", when, self.show(*ty))
            }
            Term::Native(id) => format!("native {}", self.native(*id).def.name),
            Term::TypeOfTypes => "Type".to_string(),
            Term::UnitType => "Unit".to_string(),
            Term::BottomType => "Bottom".to_string(),
            Term::TopType => "Top".to_string(),
            Term::FunctionType { params, result } => {
                format!("fn({}) -> {}", self.show_param_types(params), self.show(*result))
            }
            Term::ProductType { members } => {
                let members: Vec<String> = members
                    .iter()
                    .map(|m| format!("{}: {}", m.name, self.show(m.ty)))
                    .collect();
                format!("{{{}}}", members.join(", "))
            }
            Term::StringLiteralType(value) => format!("literal {:?}", &**value),
            Term::NumericLiteralType(value) => format!("literal {}", value),
            Term::NamedType { name, .. } => name.to_string(),
        }
    }

    fn show_vars(&self, vars: &[VarId]) -> String {
        vars.iter()
            .map(|&v| self.variable_name(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn show_params(&self, params: &[Param]) -> String {
        params
            .iter()
            .map(|p| {
                let prefix = if self.is_comptime(p.var) { "comptime " } else { "" };
                format!("{}{}: {}", prefix, self.variable_name(p.var), self.show(p.ty))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn show_param_types(&self, params: &[ParamType]) -> String {
        params
            .iter()
            .map(|p| {
                let prefix = if p.comptime { "comptime " } else { "" };
                match p.binds {
                    Some(var) => {
                        format!("{}{}: {}", prefix, self.variable_name(var), self.show(p.ty))
                    }
                    None => format!("{}{}", prefix, self.show(p.ty)),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Indented tree rendering of `term`
    pub fn dump(&self, term: TermId) -> Dump {
        let mut dump = Dump::default();
        self.dump_into(term, &mut dump);
        dump
    }

    fn dump_into(&self, term: TermId, out: &mut Dump) {
        match self.term(term) {
            Term::Abstraction {
                bindings,
                params,
                body,
            } => {
                out.text(if params.is_empty() { "Let" } else { "Abstraction" });
                out.nested(|out| {
                    for binding in bindings {
                        out.text(format!("let {} =", self.variable_name(binding.var)));
                        out.nested(|out| self.dump_into(binding.value, out));
                    }
                    if !params.is_empty() {
                        out.text(format!("params ({})", self.show_params(params)));
                    }
                    out.text("body");
                    out.nested(|out| self.dump_into(*body, out));
                });
            }
            Term::ForAll { vars, body } => {
                out.text(format!("ForAll {}", self.show_vars(vars)));
                out.nested(|out| self.dump_into(*body, out));
            }
            Term::Application { callee, args } => {
                out.text("Application");
                out.nested(|out| {
                    self.dump_into(*callee, out);
                    for &arg in args {
                        self.dump_into(arg, out);
                    }
                });
            }
            Term::Projection { domain, field } => {
                out.text(format!("Projection .{}", field));
                out.nested(|out| self.dump_into(*domain, out));
            }
            Term::Cast { subject, target } => {
                out.text(format!("Cast to {}", self.show(*target)));
                out.nested(|out| self.dump_into(*subject, out));
            }
            Term::ProductValue { ty, fields } => {
                out.text(format!("Product : {}", self.show(*ty)));
                out.nested(|out| {
                    for field in fields {
                        out.text(format!("{} =", field.name));
                        out.nested(|out| self.dump_into(field.value, out));
                    }
                });
            }
            _ => out.text(self.show(term)),
        }
    }
}
