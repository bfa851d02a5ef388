//! Linked runtime representation of a numerical P system: live cells,
//! membranes wired into a tree, and the programs that drive them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::expr::ExprItem;

/// A single variable or enzyme cell. Shared via `Rc<RefCell<_>>` so that
/// every expression `VarRef` and every distribution target referring to
/// the same name in the same membrane mutate the one underlying value —
/// the Rust analogue of the object-identity sharing the source language
/// relies on.
#[derive(Debug)]
pub struct Cell {
    pub name: String,
    pub value: f64,
    pub consumed: bool,
}

pub type CellRef = Rc<RefCell<Cell>>;

pub fn new_cell(name: impl Into<String>, value: f64) -> CellRef {
    Rc::new(RefCell::new(Cell {
        name: name.into(),
        value,
        consumed: false,
    }))
}

#[derive(Debug, Clone)]
pub struct ProductionFunction<R> {
    pub infix: String,
    pub items: Vec<ExprItem<R>>,
}

#[derive(Debug, Clone)]
pub struct DistributionRule<R> {
    pub proportion: u32,
    pub target: R,
}

#[derive(Debug, Clone)]
pub struct DistributionFunction<R> {
    pub rules: Vec<DistributionRule<R>>,
    pub proportion_total: u32,
    pub expression: String,
}

impl DistributionFunction<CellRef> {
    /// Splits `value` across targets in exact proportion, conserving the
    /// total: each target receives `(proportion / proportion_total) * value`.
    pub fn distribute(&self, value: f64) {
        for rule in &self.rules {
            let share = (rule.proportion as f64 / self.proportion_total as f64) * value;
            rule.target.borrow_mut().value += share;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Program<R> {
    pub prod: ProductionFunction<R>,
    pub distrib: DistributionFunction<R>,
    pub enzyme: Option<R>,
}

/// What a membrane picked for this step's production phase: exactly one
/// program (non-enzymatic) or zero-or-more activated programs
/// (enzymatic). Kept as a tagged variant rather than parallel
/// `Option<usize>`/`Vec<usize>` fields so the distribution phase match
/// is exhaustive by construction.
#[derive(Debug, Clone)]
pub enum Selection {
    Single { index: usize, value: f64 },
    Multi { picks: Vec<(usize, f64)> },
}

#[derive(Debug)]
pub struct Membrane {
    pub name: String,
    pub variables: Vec<CellRef>,
    pub enzymes: Vec<CellRef>,
    pub programs: Vec<Program<CellRef>>,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub selection: Option<Selection>,
}

/// A single token of the bracketed `structure` statement: `[`, `]`, or a
/// membrane name (numeric membrane names lex as integers but are still
/// names in this context).
#[derive(Debug, Clone, PartialEq)]
pub enum StructTok {
    LBracket,
    RBracket,
    Name(String),
}

pub struct MembraneSystem {
    pub h: Vec<String>,
    pub membranes: HashMap<String, Membrane>,
    pub structure: Vec<StructTok>,
    pub variables: Vec<CellRef>,
    pub enzymes: Vec<CellRef>,
}
