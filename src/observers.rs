//! Pretty-printer and CSV row emitter (§4.7, §6). Both observers are
//! passive: they read system state and never mutate it.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::model::{CellRef, MembraneSystem, Program};

/// Per-membrane `var = { ... }`, `E = { ... }`, and (when
/// `with_programs`) `pr_i = { infix -> distribExpr }` dump, iterated in
/// `H` order — matching `pep.py`'s `NumericalPsystem.print`, which walks
/// `self.H` rather than recursing the membrane tree, so nested output
/// order tracks declaration order, not tree depth.
pub fn print_state(system: &MembraneSystem, with_programs: bool) -> String {
    let mut out = String::new();
    for name in &system.h {
        let membrane = &system.membranes[name];
        let _ = writeln!(out, "{name}:");

        let _ = write!(out, "  var = {{ ");
        for cell in &membrane.variables {
            let cell = cell.borrow();
            let _ = write!(out, "{}: {:.2}, ", cell.name, cell.value);
        }
        let _ = writeln!(out, "}}");

        if !membrane.enzymes.is_empty() {
            let _ = write!(out, "  E = {{ ");
            for cell in &membrane.enzymes {
                let cell = cell.borrow();
                let _ = write!(out, "{}: {:.2}, ", cell.name, cell.value);
            }
            let _ = writeln!(out, "}}");
        }

        if with_programs {
            for (i, program) in membrane.programs.iter().enumerate() {
                let _ = writeln!(out, "  pr_{i} = {{ {} }}", program_repr(program));
            }
        }
    }
    out
}

fn program_repr(program: &Program<CellRef>) -> String {
    match &program.enzyme {
        Some(enzyme) => format!(
            "{}  [ {} -> ]  {}",
            program.prod.infix,
            enzyme.borrow().name,
            program.distrib.expression
        ),
        None => format!("{}  ->  {}", program.prod.infix, program.distrib.expression),
    }
}

/// CSV sink: a free-text description line, a header row naming every
/// variable then every enzyme column (separated by the blank field
/// §4.7/§6 call out), then one row per step.
pub struct CsvSink<W: Write> {
    writer: W,
}

impl<W: Write> CsvSink<W> {
    pub fn new(mut writer: W, description: &str) -> io::Result<Self> {
        writeln!(writer, "{description}")?;
        Ok(CsvSink { writer })
    }

    pub fn write_header(&mut self, system: &MembraneSystem) -> io::Result<()> {
        writeln!(self.writer, "{}", header_row(system))
    }

    pub fn write_row(&mut self, system: &MembraneSystem, step: usize) -> io::Result<()> {
        writeln!(self.writer, "{}", data_row(system, step))
    }
}

fn header_row(system: &MembraneSystem) -> String {
    let mut fields = vec!["step".to_string()];
    fields.extend(system.variables.iter().map(|c| c.borrow().name.clone()));
    fields.push(String::new());
    fields.extend(system.enzymes.iter().map(|c| c.borrow().name.clone()));
    fields.join(",")
}

fn data_row(system: &MembraneSystem, step: usize) -> String {
    let mut fields = vec![step.to_string()];
    fields.extend(system.variables.iter().map(|c| c.borrow().value.to_string()));
    fields.push(String::new());
    fields.extend(system.enzymes.iter().map(|c| c.borrow().value.to_string()));
    fields.join(",")
}
