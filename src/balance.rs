//! Even distribution of production runs across facility lines
//!
//! Reporting helper only; decomposition correctness does not depend on
//! it.

use crate::calculator::Decomposition;
use crate::models::ActivityKind;
use crate::setup::Setup;

/// Distribute `runs` across `lines` as evenly as possible: every line
/// gets the floor share, the remainder goes one extra run to the first
/// lines.
pub fn balance_runs(runs: u64, lines: u32) -> Vec<u64> {
    if lines == 0 {
        return Vec::new();
    }
    let base = runs / lines as u64;
    let remainder = (runs - base * lines as u64) as usize;
    (0..lines as usize)
        .map(|line| if line < remainder { base + 1 } else { base })
        .collect()
}

/// Per-step line loads: manufacturing rows balance over production
/// lines, reaction rows over reaction lines.
pub fn balance_report(decomposition: &Decomposition, setup: &Setup) -> String {
    let mut out = String::new();
    for (i, step) in decomposition.steps().iter().enumerate() {
        out.push_str(&format!("Balancing runs for step {}:\n", i + 1));
        for row in *step {
            let lines = match row.activity {
                Some(ActivityKind::Manufacturing) => setup.production_lines,
                Some(ActivityKind::Reaction) => setup.reaction_lines,
                None => continue,
            };
            let loads = balance_runs(row.runs_required, lines);
            out.push_str(&format!("{} : [{}]\n", row.name, format_loads(&loads)));
        }
    }
    out
}

/// Compact "runs x lines" groups, idle lines omitted.
fn format_loads(loads: &[u64]) -> String {
    let mut groups: Vec<(u64, u32)> = Vec::new();
    for &load in loads {
        if load == 0 {
            continue;
        }
        match groups.last_mut() {
            Some((value, count)) if *value == load => *count += 1,
            _ => groups.push((load, 1)),
        }
    }
    let rendered: Vec<String> = groups
        .iter()
        .map(|(value, count)| format!("{value} x {count}"))
        .collect();
    rendered.join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{Expansion, ExpansionStep};
    use crate::error::CalcError;
    use crate::models::{DemandTable, MaterialRow, StepRow};

    #[test]
    fn remainder_goes_to_the_first_lines() {
        assert_eq!(balance_runs(45, 4), vec![12, 11, 11, 11]);
        assert_eq!(balance_runs(8, 4), vec![2, 2, 2, 2]);
        assert_eq!(balance_runs(3, 5), vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn totals_are_preserved() {
        for runs in [0u64, 1, 7, 20, 45, 1023] {
            for lines in [1u32, 3, 8, 20] {
                let loads = balance_runs(runs, lines);
                assert_eq!(loads.len(), lines as usize);
                assert_eq!(loads.iter().sum::<u64>(), runs);
                // Even split: no two lines differ by more than one run.
                let max = loads.iter().max().copied().unwrap_or(0);
                let min = loads.iter().min().copied().unwrap_or(0);
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn zero_lines_yield_no_allocation() {
        assert!(balance_runs(10, 0).is_empty());
    }

    #[test]
    fn loads_render_as_grouped_counts() {
        assert_eq!(format_loads(&[12, 11, 11, 11]), "12 x 1 + 11 x 3");
        assert_eq!(format_loads(&[1, 1, 1, 0, 0]), "1 x 3");
        assert_eq!(format_loads(&[0, 0]), "");
    }

    /// One manufacturing level, one run per requested unit.
    struct SingleStep;

    impl ExpansionStep for SingleStep {
        fn expand(&self, demand: &DemandTable) -> Result<Expansion, CalcError> {
            let step = demand
                .iter()
                .map(|(item, quantity)| StepRow {
                    name: format!("item {item}"),
                    quantity,
                    runs_required: quantity as u64,
                    activity: Some(ActivityKind::Manufacturing),
                })
                .collect();
            Ok(Expansion {
                step,
                atomic: vec![MaterialRow {
                    name: "ore".to_string(),
                    quantity: 1.0,
                }],
                next: DemandTable::new(),
            })
        }
    }

    #[test]
    fn report_balances_each_production_row() {
        let mut initial = DemandTable::new();
        initial.insert(1, 45.0).unwrap();
        let decomposition = Decomposition::build(initial, &SingleStep).unwrap();

        let mut setup = Setup::default();
        setup.set_lines(20, 4);
        let report = balance_report(&decomposition, &setup);
        assert_eq!(
            report,
            "Balancing runs for step 1:\nitem 1 : [12 x 1 + 11 x 3]\n"
        );
    }
}
