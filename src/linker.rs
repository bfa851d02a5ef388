//! Cross-references the identifier strings produced by the parser to
//! shared variable/enzyme cells and builds the membrane tree from the
//! bracketed `structure` token list (§4.4).
//!
//! Mirrors `pep.py`'s `readInputFile` two passes (flatten-and-dedup the
//! variable list, then walk every program replacing name strings with
//! object references) but keyed by `(membrane, name)` instead of Python
//! object identity, since a Rust `String` has none to compare on.

use std::collections::HashMap;

use crate::ast::RawSystem;
use crate::error::PepError;
use crate::expr::ExprItem;
use crate::model::{
    new_cell, CellRef, DistributionFunction, DistributionRule, Membrane, MembraneSystem, Program,
    ProductionFunction, StructTok,
};

pub fn link(raw: RawSystem) -> Result<MembraneSystem, PepError> {
    let mut membranes: HashMap<String, Membrane> = HashMap::new();
    let mut all_variables: Vec<CellRef> = Vec::new();
    let mut all_enzymes: Vec<CellRef> = Vec::new();

    for rm in &raw.membranes {
        let mut local_vars: HashMap<String, CellRef> = HashMap::new();
        let mut var_list = Vec::with_capacity(rm.vars.len());
        for (name, v0) in rm.vars.iter().zip(&rm.var0) {
            let cell = new_cell(name.clone(), *v0);
            local_vars.insert(name.clone(), cell.clone());
            var_list.push(cell.clone());
            all_variables.push(cell);
        }

        let mut local_enzymes: HashMap<String, CellRef> = HashMap::new();
        let mut enzyme_list = Vec::with_capacity(rm.enzymes.len());
        for (name, e0) in rm.enzymes.iter().zip(&rm.e0) {
            let cell = new_cell(name.clone(), *e0);
            local_enzymes.insert(name.clone(), cell.clone());
            enzyme_list.push(cell.clone());
            all_enzymes.push(cell);
        }

        let resolve = |name: &str| -> Result<CellRef, PepError> {
            local_vars
                .get(name)
                .or_else(|| local_enzymes.get(name))
                .cloned()
                .ok_or_else(|| PepError::UnresolvedIdentifier {
                    membrane: rm.name.clone(),
                    name: name.to_string(),
                })
        };

        let mut programs = Vec::with_capacity(rm.programs.len());
        for program in &rm.programs {
            let items = program
                .prod
                .items
                .iter()
                .map(|item| {
                    Ok(match item {
                        ExprItem::Integer(n) => ExprItem::Integer(*n),
                        ExprItem::Real(r) => ExprItem::Real(*r),
                        ExprItem::Op(op) => ExprItem::Op(*op),
                        ExprItem::VarRef(name) => ExprItem::VarRef(resolve(name)?),
                    })
                })
                .collect::<Result<Vec<_>, PepError>>()?;

            let rules = program
                .distrib
                .rules
                .iter()
                .map(|rule| {
                    resolve(&rule.target).map(|target| DistributionRule {
                        proportion: rule.proportion,
                        target,
                    })
                })
                .collect::<Result<Vec<_>, PepError>>()?;

            let enzyme = program.enzyme.as_deref().map(resolve).transpose()?;

            programs.push(Program {
                prod: ProductionFunction {
                    infix: program.prod.infix.clone(),
                    items,
                },
                distrib: DistributionFunction {
                    rules,
                    proportion_total: program.distrib.proportion_total,
                    expression: program.distrib.expression.clone(),
                },
                enzyme,
            });
        }

        membranes.insert(
            rm.name.clone(),
            Membrane {
                name: rm.name.clone(),
                variables: var_list,
                enzymes: enzyme_list,
                programs,
                parent: None,
                children: Vec::new(),
                selection: None,
            },
        );
    }

    build_tree(&raw.structure, &mut membranes)?;

    Ok(MembraneSystem {
        h: raw.h,
        membranes,
        structure: raw.structure,
        variables: all_variables,
        enzymes: all_enzymes,
    })
}

/// Walks `[ n1 [ n2 ] n2 ] n1` maintaining a cursor stack: `[ name`
/// descends (registering `name` as a child of the current top, or as a
/// root if the stack is empty), `] name` ascends. Ascending past the
/// root, or a name/membrane mismatch, is `BadStructure`.
fn build_tree(structure: &[StructTok], membranes: &mut HashMap<String, Membrane>) -> Result<(), PepError> {
    let mut stack: Vec<String> = Vec::new();
    let mut i = 0;

    while i < structure.len() {
        match &structure[i] {
            StructTok::LBracket => {
                i += 1;
                let name = match structure.get(i) {
                    Some(StructTok::Name(n)) => n.clone(),
                    _ => return Err(PepError::BadStructure),
                };
                if !membranes.contains_key(&name) {
                    return Err(PepError::BadStructure);
                }
                if let Some(parent) = stack.last().cloned() {
                    membranes
                        .get_mut(&parent)
                        .ok_or(PepError::BadStructure)?
                        .children
                        .push(name.clone());
                    membranes.get_mut(&name).ok_or(PepError::BadStructure)?.parent = Some(parent);
                }
                stack.push(name);
                i += 1;
            }
            StructTok::RBracket => {
                i += 1;
                match structure.get(i) {
                    Some(StructTok::Name(_)) => {}
                    _ => return Err(PepError::BadStructure),
                }
                stack.pop().ok_or(PepError::BadStructure)?;
                i += 1;
            }
            StructTok::Name(_) => {
                return Err(PepError::BadStructure);
            }
        }
    }

    if !stack.is_empty() {
        return Err(PepError::BadStructure);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn linked(src: &str) -> MembraneSystem {
        link(parse(src).unwrap()).unwrap()
    }

    #[test]
    fn resolves_same_membrane_identifiers_to_one_cell() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x, y };
                    var0 = { 3, 0 };
                    pr = { x -> 1|y };
                };
            };
        ";
        let sys = linked(SRC);
        let m = &sys.membranes["m1"];
        assert!(std::rc::Rc::ptr_eq(&m.variables[1], &m.programs[0].distrib.rules[0].target));
    }

    #[test]
    fn unresolved_identifier_is_rejected() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x };
                    var0 = { 1 };
                    pr = { x -> 1|z };
                };
            };
        ";
        let err = link(parse(SRC).unwrap()).unwrap_err();
        assert!(matches!(err, PepError::UnresolvedIdentifier { .. }));
    }

    #[test]
    fn builds_parent_child_tree() {
        const SRC: &str = "
            num_ps = {
                H = { m1, m2 };
                structure = [ m1 [ m2 ] m2 ] m1;
                m1 = { var = { x }; var0 = { 0 }; };
                m2 = { var = { y }; var0 = { 0 }; };
            };
        ";
        let sys = linked(SRC);
        assert_eq!(sys.membranes["m1"].parent, None);
        assert_eq!(sys.membranes["m2"].parent.as_deref(), Some("m1"));
        assert_eq!(sys.membranes["m1"].children, vec!["m2".to_string()]);
    }

    #[test]
    fn ascent_above_root_is_bad_structure() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ] m1 ] m1;
                m1 = { var = { x }; var0 = { 0 }; };
            };
        ";
        let err = link(parse(SRC).unwrap()).unwrap_err();
        assert!(matches!(err, PepError::BadStructure));
    }
}
