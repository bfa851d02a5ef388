//! Unlinked parse tree: identifiers are still bare `String`s, resolved
//! into live `CellRef`s by the linker.

use crate::model::{DistributionFunction, Program, ProductionFunction, StructTok};

pub struct RawMembrane {
    pub name: String,
    pub vars: Vec<String>,
    pub var0: Vec<f64>,
    pub enzymes: Vec<String>,
    pub e0: Vec<f64>,
    pub programs: Vec<Program<String>>,
}

pub struct RawSystem {
    pub h: Vec<String>,
    pub structure: Vec<StructTok>,
    pub membranes: Vec<RawMembrane>,
}

pub type RawProgram = Program<String>;
pub type RawProductionFunction = ProductionFunction<String>;
pub type RawDistributionFunction = DistributionFunction<String>;
