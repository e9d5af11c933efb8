//! Fixtures shared by unit and integration tests
//!
//! Builders for the small generic functions and products most tests need,
//! plus an in-memory output sink so native side effects can be asserted on.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::errors::{CoreError, CoreResult};
use crate::store::Store;
use crate::term::{Param, TermId, VarId};

// ============================================================================
// Captured output
// ============================================================================

/// Output sink that keeps everything written to it. Clones share the buffer,
/// so one clone can be handed to the store and the other inspected.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A store whose natives write into the returned buffer
pub fn captured_store() -> (Store, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let mut store = Store::new();
    store.set_output(Box::new(buffer.clone()));
    (store, buffer)
}

// ============================================================================
// Term fixtures
// ============================================================================

/// `forall T. fn(x: T) => x`, with the quantified variable
pub fn identity_function(store: &mut Store) -> (TermId, VarId) {
    let t = store.new_variable(true, Some("T"));
    let x = store.new_variable(false, Some("x"));
    let t_term = store.variable_term(t);
    let x_term = store.variable_term(x);
    let body = store.abstraction(vec![], vec![Param { var: x, ty: t_term }], x_term);
    (store.for_all(vec![t], body), t)
}

/// `forall A, B. fn(x: A, y: B) => {fst = x, snd = y}`
pub fn pair_function(store: &mut Store) -> TermId {
    let a = store.new_variable(true, Some("A"));
    let b = store.new_variable(true, Some("B"));
    let x = store.new_variable(false, Some("x"));
    let y = store.new_variable(false, Some("y"));
    let a_term = store.variable_term(a);
    let b_term = store.variable_term(b);
    let x_term = store.variable_term(x);
    let y_term = store.variable_term(y);

    let ty = store.product_type(vec![("fst", a_term), ("snd", b_term)]);
    let body = store.product_value(ty, vec![("fst", x_term), ("snd", y_term)]);
    let params = vec![
        Param { var: x, ty: a_term },
        Param { var: y, ty: b_term },
    ];
    let function = store.abstraction(vec![], params, body);
    store.for_all(vec![a, b], function)
}

/// `{x = x, y = y}` typed by the literal types of its fields
pub fn point_value(store: &mut Store, x: i64, y: i64) -> TermId {
    let x_ty = store.numeric_type(x);
    let y_ty = store.numeric_type(y);
    let ty = store.product_type(vec![("x", x_ty), ("y", y_ty)]);
    let x = store.numeric(x);
    let y = store.numeric(y);
    store.product_value(ty, vec![("x", x), ("y", y)])
}

/// `cimport("#include <stdio>").printf(text)`
pub fn printf_call(store: &mut Store, text: &str) -> CoreResult<TermId> {
    let cimport = store.builtin("cimport").ok_or_else(|| CoreError::Native {
        name: "cimport".into(),
        message: "not registered".into(),
    })?;
    let header = store.string("#include <stdio>");
    let module = store.apply(cimport, vec![header]);
    let printf = store.project(module, "printf");
    let text = store.string(text);
    Ok(store.apply(printf, vec![text]))
}
