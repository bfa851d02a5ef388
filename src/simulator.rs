//! Two-phase synchronous simulation engine (§4.6): production, a global
//! reset sweep, then proportional distribution. Program selection for a
//! non-enzymatic membrane is a single uniform random pick; an
//! enzyme-gated membrane fires every activated program in the same
//! step. The run loop drives repeated steps against a step and/or
//! wall-clock cap, with hooks for CSV rows, state printing, and
//! step-by-step confirmation.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::PepError;
use crate::eval::{evaluate, referenced_min};
use crate::model::{MembraneSystem, Selection};

pub struct Simulator<'a, R> {
    pub system: &'a mut MembraneSystem,
    rng: R,
}

impl<'a, R: Rng> Simulator<'a, R> {
    pub fn new(system: &'a mut MembraneSystem, rng: R) -> Self {
        Simulator { system, rng }
    }

    /// Runs one production -> reset -> distribution step.
    pub fn step(&mut self) -> Result<(), PepError> {
        self.production_phase()?;
        self.reset_phase();
        self.distribution_phase();
        Ok(())
    }

    fn production_phase(&mut self) -> Result<(), PepError> {
        for name in &self.system.h {
            let membrane = self.system.membranes.get(name).expect("every H entry has a block");
            if membrane.programs.is_empty() {
                continue;
            }

            let selection = if membrane.enzymes.is_empty() {
                let n = membrane.programs.len();
                let index = if n == 1 { 0 } else { self.rng.gen_range(0..n) };
                let value = evaluate(&membrane.programs[index].prod.items)?;
                Selection::Single { index, value }
            } else {
                let mut picks = Vec::new();
                for (index, program) in membrane.programs.iter().enumerate() {
                    let activated = match &program.enzyme {
                        Some(enzyme) => match referenced_min(&program.prod.items) {
                            Some(min_v) => enzyme.borrow().value > min_v,
                            None => true,
                        },
                        None => true,
                    };
                    if activated {
                        let value = evaluate(&program.prod.items)?;
                        picks.push((index, value));
                    }
                }
                Selection::Multi { picks }
            };

            self.system.membranes.get_mut(name).unwrap().selection = Some(selection);
        }
        Ok(())
    }

    /// Clears every `consumed` cell (variable or enzyme) to 0 across the
    /// whole system, before any distribution runs. Cells that are only
    /// ever written as distribution targets are never marked `consumed`
    /// and so are never reset here — intentional (§9 Open Questions):
    /// accumulation targets must carry their value across steps.
    fn reset_phase(&mut self) {
        for cell in self.system.variables.iter().chain(self.system.enzymes.iter()) {
            let mut cell = cell.borrow_mut();
            if cell.consumed {
                cell.value = 0.0;
                cell.consumed = false;
            }
        }
    }

    fn distribution_phase(&mut self) {
        for name in &self.system.h {
            let membrane = self.system.membranes.get(name).unwrap();
            if membrane.programs.is_empty() {
                continue;
            }
            match &membrane.selection {
                Some(Selection::Single { index, value }) => {
                    membrane.programs[*index].distrib.distribute(*value);
                }
                Some(Selection::Multi { picks }) => {
                    for (index, value) in picks {
                        membrane.programs[*index].distrib.distribute(*value);
                    }
                }
                None => {}
            }
        }
    }

    /// Drives the run loop of §4.6: an optional pre-step snapshot (the
    /// CSV header row's sibling, taken before step 1's production),
    /// then repeated `step` calls with a post-step hook, stopping once
    /// either cap is exceeded. `confirm` is polled after every step and
    /// may stop the run early (the `--step` CLI flag's hook point);
    /// pass `|| true` to run unattended.
    pub fn run(
        &mut self,
        max_steps: usize,
        max_time: Duration,
        mut on_pre_first_step: impl FnMut(&MembraneSystem),
        mut on_post_step: impl FnMut(&MembraneSystem, usize),
        mut confirm: impl FnMut() -> bool,
    ) -> Result<RunReport, PepError> {
        let start = Instant::now();
        let mut step_no = 1usize;

        on_pre_first_step(self.system);

        loop {
            self.step()?;
            let elapsed = start.elapsed();
            on_post_step(self.system, step_no);

            let time_up = max_time > Duration::ZERO && elapsed >= max_time;
            let steps_up = max_steps > 0 && step_no >= max_steps;

            if time_up || steps_up || !confirm() {
                return Ok(RunReport { steps_completed: step_no, elapsed });
            }
            step_no += 1;
        }
    }
}

pub struct RunReport {
    pub steps_completed: usize,
    pub elapsed: Duration,
}

/// Runs `n` bare steps with no observers; used by tests and by anything
/// that just wants the end state.
pub fn simulate_n_steps<R: Rng>(system: &mut MembraneSystem, rng: R, n: usize) -> Result<(), PepError> {
    let mut sim = Simulator::new(system, rng);
    for _ in 0..n {
        sim.step()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::link;
    use crate::parser::parse;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn system(src: &str) -> MembraneSystem {
        link(parse(src).unwrap()).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    fn value(sys: &MembraneSystem, membrane: &str, name: &str) -> f64 {
        sys.membranes[membrane]
            .variables
            .iter()
            .find(|c| c.borrow().name == name)
            .or_else(|| sys.membranes[membrane].enzymes.iter().find(|c| c.borrow().name == name))
            .unwrap()
            .borrow()
            .value
    }

    #[test]
    fn s1_smoke_doubles_each_step() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x };
                    var0 = { 3 };
                    pr = { x * 2 -> 1|x };
                };
            };
        ";
        let mut sys = system(SRC);
        simulate_n_steps(&mut sys, rng(), 1).unwrap();
        assert_eq!(value(&sys, "m1", "x"), 6.0);
        simulate_n_steps(&mut sys, rng(), 1).unwrap();
        assert_eq!(value(&sys, "m1", "x"), 12.0);
    }

    #[test]
    fn s2_proportional_split_conserves_total() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x, y, z };
                    var0 = { 10, 0, 0 };
                    pr = { x -> 1|y + 3|z };
                };
            };
        ";
        let mut sys = system(SRC);
        simulate_n_steps(&mut sys, rng(), 1).unwrap();
        assert_eq!(value(&sys, "m1", "x"), 0.0);
        assert_eq!(value(&sys, "m1", "y"), 2.5);
        assert_eq!(value(&sys, "m1", "z"), 7.5);
    }

    #[test]
    fn s6_enzymatic_both_programs_fire() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x, y };
                    var0 = { 2, 5 };
                    E = { e };
                    E0 = { 10 };
                    pr = { x [ e -> ] 1|y };
                    pr = { y [ e -> ] 1|x };
                };
            };
        ";
        let mut sys = system(SRC);
        simulate_n_steps(&mut sys, rng(), 1).unwrap();
        assert_eq!(value(&sys, "m1", "x"), 5.0);
        assert_eq!(value(&sys, "m1", "y"), 2.0);
        assert_eq!(value(&sys, "m1", "e"), 10.0);
    }

    #[test]
    fn enzyme_gate_below_threshold_does_not_fire() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x, y };
                    var0 = { 20, 0 };
                    E = { e };
                    E0 = { 1 };
                    pr = { x [ e -> ] 1|y };
                };
            };
        ";
        let mut sys = system(SRC);
        simulate_n_steps(&mut sys, rng(), 1).unwrap();
        assert_eq!(value(&sys, "m1", "x"), 20.0);
        assert_eq!(value(&sys, "m1", "y"), 0.0);
    }

    #[test]
    fn reset_phase_is_idempotent() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x, y };
                    var0 = { 4, 0 };
                    pr = { x -> 1|y };
                };
            };
        ";
        let mut sys = system(SRC);
        let mut sim = Simulator::new(&mut sys, rng());
        sim.step().unwrap();
        sim.reset_phase();
        sim.reset_phase();
        for cell in sim.system.variables.iter() {
            assert!(!cell.borrow().consumed);
        }
    }

    #[test]
    fn target_only_cells_are_never_reset() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x, acc };
                    var0 = { 5, 100 };
                    pr = { x -> 1|acc };
                };
            };
        ";
        let mut sys = system(SRC);
        simulate_n_steps(&mut sys, rng(), 1).unwrap();
        assert_eq!(value(&sys, "m1", "acc"), 105.0);
        simulate_n_steps(&mut sys, rng(), 1).unwrap();
        assert_eq!(value(&sys, "m1", "acc"), 105.0);
    }

    #[test]
    fn run_loop_stops_at_step_cap() {
        const SRC: &str = "
            num_ps = {
                H = { m1 };
                structure = [ m1 ];
                m1 = {
                    var = { x };
                    var0 = { 1 };
                    pr = { x + 1 -> 1|x };
                };
            };
        ";
        let mut sys = system(SRC);
        let mut sim = Simulator::new(&mut sys, rng());
        let report = sim
            .run(3, Duration::ZERO, |_| {}, |_, _| {}, || true)
            .unwrap();
        assert_eq!(report.steps_completed, 3);
        assert_eq!(value(sim.system, "m1", "x"), 4.0);
    }
}
