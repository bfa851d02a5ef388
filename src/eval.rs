//! Stack-based evaluator (§4.5) for a linked production function's
//! postfix item sequence. Each call allocates its own LIFO stack; there
//! is no persistent evaluator state between calls.

use crate::error::PepError;
use crate::expr::ExprItem;
use crate::model::CellRef;

/// Evaluates a postfix item list over the current value of every
/// referenced cell. Reading a `VarRef` marks its cell `consumed`, which
/// drives the end-of-step reset sweep (§4.6).
pub fn evaluate(items: &[ExprItem<CellRef>]) -> Result<f64, PepError> {
    let mut stack: Vec<f64> = Vec::with_capacity(items.len());

    for item in items {
        match item {
            ExprItem::Integer(n) => stack.push(*n as f64),
            ExprItem::Real(r) => stack.push(*r),
            ExprItem::VarRef(cell) => {
                let mut cell = cell.borrow_mut();
                stack.push(cell.value);
                cell.consumed = true;
            }
            ExprItem::Op(op) => {
                if op.arity() == 1 {
                    let a = pop(&mut stack)?;
                    stack.push(op.eval1(a));
                } else {
                    let b = pop(&mut stack)?;
                    let a = pop(&mut stack)?;
                    stack.push(op.eval2(a, b));
                }
            }
        }
    }

    match stack.len() {
        1 => Ok(stack[0]),
        n => Err(PepError::Eval(format!("expected exactly one residual value, found {n}"))),
    }
}

fn pop(stack: &mut Vec<f64>) -> Result<f64, PepError> {
    stack.pop().ok_or_else(|| PepError::Eval("stack underflow".into()))
}

/// The minimum value among the variable cells a production function
/// references, or `None` if it references none — used by enzyme
/// activation (§4.6), where a production with no referenced variables
/// is activated unconditionally.
pub fn referenced_min(items: &[ExprItem<CellRef>]) -> Option<f64> {
    items
        .iter()
        .filter_map(|item| match item {
            ExprItem::VarRef(cell) => Some(cell.borrow().value),
            _ => None,
        })
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::shunting_yard;
    use crate::lexer::tokenize;
    use crate::model::new_cell;
    use std::collections::HashMap;

    fn eval_with(src: &str, vars: &[(&str, f64)]) -> f64 {
        let cells: HashMap<&str, CellRef> = vars.iter().map(|(n, v)| (*n, new_cell(*n, *v))).collect();
        let (items, _) = shunting_yard(&tokenize(src).unwrap()).unwrap();
        let linked: Vec<ExprItem<CellRef>> = items
            .into_iter()
            .map(|item| match item {
                ExprItem::Integer(n) => ExprItem::Integer(n),
                ExprItem::Real(r) => ExprItem::Real(r),
                ExprItem::Op(op) => ExprItem::Op(op),
                ExprItem::VarRef(name) => ExprItem::VarRef(cells[name.as_str()].clone()),
            })
            .collect();
        evaluate(&linked).unwrap()
    }

    #[test]
    fn precedence_and_power_evaluate_correctly() {
        assert_eq!(eval_with("2 + 3 * 4 ^ 2", &[]), 50.0);
    }

    #[test]
    fn pow_is_right_associative_numerically() {
        assert_eq!(eval_with("2 ^ 3 ^ 2", &[]), 512.0);
    }

    #[test]
    fn unary_negate_with_parens() {
        assert_eq!(eval_with("~(1 + 2) * 4", &[]), -12.0);
    }

    #[test]
    fn comparisons_yield_numeric_one_or_zero() {
        assert_eq!(eval_with("(a > b) + (a == b)", &[("a", 5.0), ("b", 3.0)]), 1.0);
    }

    #[test]
    fn comparison_participates_in_arithmetic() {
        assert_eq!(eval_with("(a > b) * 5", &[("a", 1.0), ("b", 2.0)]), 0.0);
        assert_eq!(eval_with("(a > b) * 5", &[("a", 2.0), ("b", 1.0)]), 5.0);
    }

    #[test]
    fn reading_a_var_marks_it_consumed() {
        let cell = new_cell("x", 3.0);
        let items = vec![ExprItem::VarRef(cell.clone())];
        assert_eq!(evaluate(&items).unwrap(), 3.0);
        assert!(cell.borrow().consumed);
    }

    #[test]
    fn stack_underflow_is_eval_error() {
        use crate::expr::Operator;
        let items: Vec<ExprItem<CellRef>> = vec![ExprItem::Op(Operator::Add)];
        assert!(matches!(evaluate(&items), Err(PepError::Eval(_))));
    }

    #[test]
    fn degree_variants_match_radian_conversion() {
        use std::f64::consts::PI;
        let items = {
            let (items, _) = shunting_yard(&tokenize("sind(x)").unwrap()).unwrap();
            items
        };
        let cell = new_cell("x", 90.0);
        let linked: Vec<ExprItem<CellRef>> = items
            .into_iter()
            .map(|item| match item {
                ExprItem::VarRef(_) => ExprItem::VarRef(cell.clone()),
                ExprItem::Op(op) => ExprItem::Op(op),
                ExprItem::Integer(n) => ExprItem::Integer(n),
                ExprItem::Real(r) => ExprItem::Real(r),
            })
            .collect();
        let result = evaluate(&linked).unwrap();
        assert!((result - (90.0_f64 * PI / 180.0).sin()).abs() < 1e-12);
    }
}
