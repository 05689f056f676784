//! C4 — ILP Builder.
//!
//! Emits a solver-agnostic integer program (variables, constraints,
//! objective) encoding "minimize splits + merges subject to coverage and
//! tolerance". Only `solver.rs` (C5) knows about the concrete MIP backend
//! crate; this module and its `Problem` output are backend-independent. See
//! `spec.md` §4.4.

use fxhash::FxHashMap;
use tracing::debug;

use crate::cell::Cells;
use crate::config::Config;
use crate::volume::label_id;

/// The integrality kind of an ILP variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// A 0/1 decision variable.
    Binary,
    /// A nonnegative integer counter, unbounded above.
    NonNegativeInteger,
}

/// Comparison operator of a linear constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `=`
    Eq,
}

/// One row of the constraint matrix, `sum(coeff * var) <relation> rhs`.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    /// Sparse `(variable index, coefficient)` pairs.
    pub coeffs: Vec<(usize, f64)>,
    /// The row's comparison operator.
    pub relation: Relation,
    /// The row's right-hand side.
    pub rhs: f64,
}

/// A solver-agnostic mixed-integer program: variables, objective, and
/// constraints, plus the index bookkeeping C6 needs to read a solution back
/// into cell choices, match pairs, and split/merge totals.
#[derive(Debug)]
pub struct Problem {
    /// Integrality kind of every variable, indexed contiguously.
    pub var_kinds: Vec<VarKind>,
    /// Sparse objective coefficients (minimization sense).
    pub objective: Vec<(usize, f64)>,
    /// Every constraint row.
    pub constraints: Vec<LinearConstraint>,

    /// `(cell index, label) -> indicator variable index`.
    pub indicator_index: FxHashMap<(usize, i64), usize>,
    /// `(gtLabel, recLabel) -> match variable index`.
    pub match_index: FxHashMap<(i64, i64), usize>,
    /// `gtLabel -> split counter variable index`.
    pub split_index: FxHashMap<i64, usize>,
    /// `recLabel -> merge counter variable index`.
    pub merge_index: FxHashMap<i64, usize>,
    /// Index of the total-splits variable `S`.
    pub total_s_index: usize,
    /// Index of the total-merges variable `M`.
    pub total_m_index: usize,
}

/// Builds the ILP for `cells` under `config`.
#[must_use]
pub fn build_problem(cells: &Cells, config: &Config) -> Problem {
    let mut var_kinds = Vec::new();
    let mut indicator_index = FxHashMap::default();
    // Every indicator variable assigned to a given label, for the "labels
    // do not disappear" constraint (constraint 2).
    let mut indicators_by_label: FxHashMap<i64, Vec<usize>> = FxHashMap::default();
    // Every indicator variable for cells of a given gt label assigned a
    // given (possibly alternative) rec label, for match activation
    // (constraint 3).
    let mut indicators_by_gt_and_label: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
    // Per-cell indicator variables, for cell coverage (constraint 1).
    let mut indicators_by_cell: Vec<Vec<usize>> = vec![Vec::new(); cells.cells.len()];

    // --- Variable allocation: indicators, ascending rec label, cells
    // ascending gt label within a rec label (spec.md §4.4, §5). ---
    for &r in &cells.rec_labels {
        for &cell_idx in cells.cells_for_rec(r) {
            let cell = &cells.cells[cell_idx];
            let mut labels: Vec<i64> = Vec::with_capacity(1 + cell.alternative_labels.len());
            labels.push(r);
            labels.extend(cell.alternative_labels.iter().copied());

            for label in labels {
                let var = var_kinds.len();
                var_kinds.push(VarKind::Binary);
                indicator_index.insert((cell_idx, label), var);
                indicators_by_label.entry(label).or_default().push(var);
                indicators_by_gt_and_label
                    .entry((cell.gt_label, label))
                    .or_default()
                    .push(var);
                indicators_by_cell[cell_idx].push(var);
            }
        }
    }

    // --- Match variables, ascending gt label then ascending rec label. ---
    let mut match_index = FxHashMap::default();
    for &g in &cells.gt_labels {
        if let Some(recs) = cells.pm_gt.get(&g) {
            for &r in recs {
                let var = var_kinds.len();
                var_kinds.push(VarKind::Binary);
                match_index.insert((g, r), var);
            }
        }
    }

    // --- Split counters, then total S. ---
    let mut split_index = FxHashMap::default();
    for &g in &cells.gt_labels {
        let var = var_kinds.len();
        var_kinds.push(VarKind::NonNegativeInteger);
        split_index.insert(g, var);
    }
    let total_s_index = var_kinds.len();
    var_kinds.push(VarKind::NonNegativeInteger);

    // --- Merge counters, then total M. ---
    let mut merge_index = FxHashMap::default();
    for &r in &cells.rec_labels {
        let var = var_kinds.len();
        var_kinds.push(VarKind::NonNegativeInteger);
        merge_index.insert(r, var);
    }
    let total_m_index = var_kinds.len();
    var_kinds.push(VarKind::NonNegativeInteger);

    let mut constraints = Vec::new();

    // 1. Cell coverage: sum_l x[c, l] = 1.
    for vars in &indicators_by_cell {
        constraints.push(LinearConstraint {
            coeffs: vars.iter().map(|&v| (v, 1.0)).collect(),
            relation: Relation::Eq,
            rhs: 1.0,
        });
    }

    // 2. Labels do not disappear: sum of indicators with label r >= 1,
    // for every original rec label, excluding an exempted background label.
    let rec_background = config.rec_background_label.map(label_id);
    for &r in &cells.rec_labels {
        if rec_background == Some(r) {
            continue;
        }
        if let Some(vars) = indicators_by_label.get(&r) {
            constraints.push(LinearConstraint {
                coeffs: vars.iter().map(|&v| (v, 1.0)).collect(),
                relation: Relation::Ge,
                rhs: 1.0,
            });
        }
    }

    // 3. Match activation, for every (g, r) in PMgt.
    for (&(g, r), &m_var) in &match_index {
        let empty = Vec::new();
        let contributors = indicators_by_gt_and_label.get(&(g, r)).unwrap_or(&empty);

        for &v in contributors {
            constraints.push(LinearConstraint {
                coeffs: vec![(m_var, 1.0), (v, -1.0)],
                relation: Relation::Ge,
                rhs: 0.0,
            });
        }

        let mut coeffs: Vec<(usize, f64)> = contributors.iter().map(|&v| (v, 1.0)).collect();
        coeffs.push((m_var, -1.0));
        constraints.push(LinearConstraint {
            coeffs,
            relation: Relation::Ge,
            rhs: 0.0,
        });
    }

    // 4. Splits per gt label: s[g] - sum_r m[g,r] = -1.
    for (&g, &s_var) in &split_index {
        let mut coeffs = vec![(s_var, 1.0)];
        if let Some(recs) = cells.pm_gt.get(&g) {
            for &r in recs {
                coeffs.push((match_index[&(g, r)], -1.0));
            }
        }
        constraints.push(LinearConstraint {
            coeffs,
            relation: Relation::Eq,
            rhs: -1.0,
        });
    }

    // 5. Merges per rec label: mu[r] - sum_g m[g,r] = -1. For the exempted
    // background rec label (if any) this is relaxed to `>=`: constraint 2's
    // persistence floor is already skipped for it, so it may end up with
    // zero matches if every one of its cells relabels away; an equality
    // here would force mu[r] negative in that case, contradicting mu[r]'s
    // nonnegativity and making the exemption infeasible to ever realize.
    // The inequality plus the minimizing objective still pins
    // mu[r] = max(0, sum_g m[g,r] - 1) for every label, background or not.
    for (&r, &mu_var) in &merge_index {
        let mut coeffs = vec![(mu_var, 1.0)];
        if let Some(gts) = cells.pm_rec.get(&r) {
            for &g in gts {
                coeffs.push((match_index[&(g, r)], -1.0));
            }
        }
        let relation = if rec_background == Some(r) {
            Relation::Ge
        } else {
            Relation::Eq
        };
        constraints.push(LinearConstraint {
            coeffs,
            relation,
            rhs: -1.0,
        });
    }

    // 6. Totals: S - sum_g s[g] = 0; M - sum_r mu[r] = 0.
    let mut s_coeffs = vec![(total_s_index, 1.0)];
    s_coeffs.extend(split_index.values().map(|&v| (v, -1.0)));
    constraints.push(LinearConstraint {
        coeffs: s_coeffs,
        relation: Relation::Eq,
        rhs: 0.0,
    });

    let mut m_coeffs = vec![(total_m_index, 1.0)];
    m_coeffs.extend(merge_index.values().map(|&v| (v, -1.0)));
    constraints.push(LinearConstraint {
        coeffs: m_coeffs,
        relation: Relation::Eq,
        rhs: 0.0,
    });

    debug!(
        variables = var_kinds.len(),
        constraints = constraints.len(),
        "built ILP"
    );

    Problem {
        var_kinds,
        objective: vec![(total_s_index, 1.0), (total_m_index, 1.0)],
        constraints,
        indicator_index,
        match_index,
        split_index,
        merge_index,
        total_s_index,
        total_m_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::extract_cells;
    use crate::tolerance::enumerate_tolerances;
    use crate::volume::Volume;
    use ndarray::Array3;

    fn volume_from(data: Vec<f64>, dim: (usize, usize, usize)) -> Volume {
        Volume::new(Array3::from_shape_vec(dim, data).unwrap())
    }

    #[test]
    fn exact_match_has_one_cell_and_trivial_constraints() {
        let gt = volume_from(vec![1.0; 4], (1, 2, 2));
        let rec = volume_from(vec![1.0; 4], (1, 2, 2));
        let mut cells = extract_cells(&gt, &rec).unwrap();
        let config = Config::default();
        enumerate_tolerances(&mut cells, &rec, &config);
        let problem = build_problem(&cells, &config);

        // 1 indicator + 1 match + 1 split + 1 S + 1 merge + 1 M = 6
        assert_eq!(problem.var_kinds.len(), 6);
        assert_eq!(problem.match_index.len(), 1);
        assert_eq!(problem.split_index.len(), 1);
        assert_eq!(problem.merge_index.len(), 1);
    }

    #[test]
    fn pure_split_allocates_two_indicators_for_shared_gt_label() {
        let gt = volume_from(vec![1.0, 1.0, 1.0, 1.0], (1, 2, 2));
        let rec = volume_from(vec![1.0, 2.0, 1.0, 2.0], (1, 2, 2));
        let mut cells = extract_cells(&gt, &rec).unwrap();
        let config = Config {
            tolerance_distance_threshold: 0.0,
            ..Config::default()
        };
        enumerate_tolerances(&mut cells, &rec, &config);
        let problem = build_problem(&cells, &config);

        // Two cells, each with only its default label (tolerance 0): 2
        // indicators, 2 match vars (g=1 with r=1 and r=2), 1 split, 1 S, 2
        // merge vars (r=1, r=2), 1 M = 9.
        assert_eq!(problem.var_kinds.len(), 9);
        assert_eq!(problem.match_index.len(), 2);
    }

    #[test]
    fn background_label_is_exempt_from_persistence_constraint() {
        let gt = volume_from(vec![1.0; 4], (1, 2, 2));
        let rec = volume_from(vec![0.0; 4], (1, 2, 2));
        let mut cells = extract_cells(&gt, &rec).unwrap();
        let config = Config {
            rec_background_label: Some(0.0),
            ..Config::default()
        };
        enumerate_tolerances(&mut cells, &rec, &config);
        let problem = build_problem(&cells, &config);

        // Cell coverage (1) is still present but no persistence constraint
        // for rec label 0 should exist; only match/split/merge-total rows
        // remain besides coverage.
        let persistence_rows = problem
            .constraints
            .iter()
            .filter(|c| c.relation == Relation::Ge && c.rhs == 1.0)
            .count();
        assert_eq!(persistence_rows, 0);
    }
}
