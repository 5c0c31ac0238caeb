//! LP oracle backends.
//!
//! [`HighsOracle`] implements the oracle contract with `good_lp` over the
//! HiGHS solver (feature `milp`, on by default). Without the feature the
//! [`NullOracle`] stands in: every solve reports `Unavailable` and the
//! engine degrades gracefully — column generation keeps its round-1 pool,
//! spacing keeps coordinates, support maximization abandons the attempt.

use palletizer_core::{
    LayoutProblem, LayoutSolution, LpOracle, MasterProblem, MasterSolution, OracleError,
};
use std::time::Duration;

#[cfg(feature = "milp")]
use good_lp::{
    constraint,
    solvers::{DualValues, SolutionWithDual},
    variable, Constraint, Expression, ProblemVariables, Solution, SolverModel, Variable,
};
#[cfg(feature = "milp")]
use palletizer_core::{LinExpr, Relation, Sense, VarKind};

/// Stub oracle used when no solver backend is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

impl LpOracle for NullOracle {
    fn solve_master(
        &self,
        _master: &MasterProblem,
        _time_limit: Duration,
    ) -> Result<MasterSolution, OracleError> {
        Err(OracleError::Unavailable(
            "compiled without the `milp` feature".to_string(),
        ))
    }

    fn solve_layout(
        &self,
        _layout: &LayoutProblem,
        _time_limit: Duration,
    ) -> Result<LayoutSolution, OracleError> {
        Err(OracleError::Unavailable(
            "compiled without the `milp` feature".to_string(),
        ))
    }
}

/// `good_lp`/HiGHS-backed oracle.
#[cfg(feature = "milp")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsOracle;

#[cfg(feature = "milp")]
impl HighsOracle {
    /// Creates the oracle.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "milp")]
fn to_expression(expr: &LinExpr, vars: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for &(var, coef) in &expr.terms {
        out += coef * vars[var];
    }
    out
}

#[cfg(feature = "milp")]
fn map_solve_error(err: good_lp::ResolutionError) -> OracleError {
    match err {
        good_lp::ResolutionError::Infeasible => OracleError::Infeasible,
        good_lp::ResolutionError::Unbounded => {
            OracleError::Backend("model is unbounded".to_string())
        }
        other => OracleError::Backend(format!("{other:?}")),
    }
}

#[cfg(feature = "milp")]
impl LpOracle for HighsOracle {
    fn solve_master(
        &self,
        master: &MasterProblem,
        time_limit: Duration,
    ) -> Result<MasterSolution, OracleError> {
        let mut vars = ProblemVariables::new();
        let alphas: Vec<Variable> = master
            .columns
            .iter()
            .map(|_| vars.add(variable().min(0.0).max(1.0)))
            .collect();

        let objective: Expression = master
            .columns
            .iter()
            .zip(alphas.iter())
            .map(|(column, &alpha)| column.cost * alpha)
            .sum();

        let mut model = vars
            .minimise(objective)
            .using(good_lp::solvers::highs::highs);
        model.set_time_limit(time_limit.as_secs_f64());
        model.set_verbose(false);

        // One cover row per unique item: sum of the covering columns >= 1.
        let mut row_refs = Vec::with_capacity(master.rows);
        for row in 0..master.rows {
            let cover: Expression = master
                .columns
                .iter()
                .zip(alphas.iter())
                .filter(|(column, _)| column.covers.contains(&row))
                .map(|(_, &alpha)| Expression::from(alpha))
                .sum();
            row_refs.push(model.add_constraint(constraint!(cover >= 1.0)));
        }

        log::debug!(
            "master solve: {} rows x {} columns",
            master.rows,
            master.num_columns()
        );
        let mut solution = model.solve().map_err(map_solve_error)?;

        let values: Vec<f64> = alphas.iter().map(|&alpha| solution.value(alpha)).collect();
        let objective = master
            .columns
            .iter()
            .zip(values.iter())
            .map(|(column, &value)| column.cost * value)
            .sum();
        let duals: Vec<f64> = {
            let dual_values = solution.compute_dual();
            row_refs.iter().map(|&r| dual_values.dual(r)).collect()
        };

        Ok(MasterSolution {
            objective,
            values,
            duals,
        })
    }

    fn solve_layout(
        &self,
        layout: &LayoutProblem,
        time_limit: Duration,
    ) -> Result<LayoutSolution, OracleError> {
        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = layout
            .vars
            .iter()
            .map(|kind| match *kind {
                VarKind::Continuous { lo, hi } => {
                    let mut spec = variable();
                    if lo.is_finite() {
                        spec = spec.min(lo);
                    }
                    if hi.is_finite() {
                        spec = spec.max(hi);
                    }
                    vars.add(spec)
                }
                VarKind::Binary => vars.add(variable().binary()),
            })
            .collect();

        let objective = to_expression(&layout.objective, &handles);
        let mut model = match layout.sense {
            Sense::Minimize => vars
                .minimise(objective)
                .using(good_lp::solvers::highs::highs),
            Sense::Maximize => vars
                .maximise(objective)
                .using(good_lp::solvers::highs::highs),
        };
        model.set_time_limit(time_limit.as_secs_f64());
        model.set_verbose(false);

        for spec in &layout.constraints {
            let lhs = to_expression(&spec.expr, &handles);
            let built: Constraint = match spec.relation {
                Relation::Le => constraint!(lhs <= spec.rhs),
                Relation::Ge => constraint!(lhs >= spec.rhs),
                Relation::Eq => constraint!(lhs == spec.rhs),
            };
            model.add_constraint(built);
        }

        log::debug!(
            "layout solve: {} vars, {} constraints, mip={}",
            layout.num_vars(),
            layout.constraints.len(),
            layout.is_mip()
        );
        let solution = model.solve().map_err(map_solve_error)?;

        let values: Vec<f64> = handles.iter().map(|&v| solution.value(v)).collect();
        let objective = {
            let expr = &layout.objective;
            expr.constant
                + expr
                    .terms
                    .iter()
                    .map(|&(var, coef)| coef * values[var])
                    .sum::<f64>()
        };

        Ok(LayoutSolution { objective, values })
    }
}

/// The default oracle for this build: HiGHS when available, the stub
/// otherwise.
#[cfg(feature = "milp")]
pub fn default_oracle() -> Box<dyn LpOracle> {
    Box::new(HighsOracle::new())
}

/// The default oracle for this build: HiGHS when available, the stub
/// otherwise.
#[cfg(not(feature = "milp"))]
pub fn default_oracle() -> Box<dyn LpOracle> {
    Box::new(NullOracle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_oracle_reports_unavailable() {
        let oracle = NullOracle;
        let master = MasterProblem::new(2);
        let result = oracle.solve_master(&master, Duration::from_secs(1));
        assert!(matches!(result, Err(OracleError::Unavailable(_))));
    }

    #[cfg(feature = "milp")]
    mod highs {
        use super::*;
        use palletizer_core::{LinExpr, Relation, Sense};

        #[test]
        fn master_cover_selects_cheap_column() {
            // Two rows; a cheap column covering both and an expensive
            // singleton each. The LP picks the combined column.
            let mut master = MasterProblem::new(2);
            master.add_column(10.0, vec![0, 1]);
            master.add_column(9.0, vec![0]);
            master.add_column(9.0, vec![1]);

            let oracle = HighsOracle::new();
            let solution = oracle
                .solve_master(&master, Duration::from_secs(10))
                .unwrap();

            assert!((solution.objective - 10.0).abs() < 1e-6);
            assert!(solution.values[0] > 0.99);
            assert!(solution.values[1] < 0.01);
            assert_eq!(solution.duals.len(), 2);
            // Dual prices of the two symmetric rows sum to the objective.
            let dual_sum: f64 = solution.duals.iter().sum();
            assert!((dual_sum - 10.0).abs() < 1e-6);
        }

        #[test]
        fn layout_lp_respects_bounds_and_constraints() {
            // Maximize x + y subject to x + y <= 7, x in [0, 5], y in [0, 4].
            let mut layout = LayoutProblem::new(Sense::Maximize);
            let x = layout.continuous(0.0, 5.0);
            let y = layout.continuous(0.0, 4.0);
            layout.objective = LinExpr::term(x, 1.0).add_term(y, 1.0);
            layout.constrain(
                LinExpr::term(x, 1.0).add_term(y, 1.0),
                Relation::Le,
                7.0,
            );

            let oracle = HighsOracle::new();
            let solution = oracle
                .solve_layout(&layout, Duration::from_secs(10))
                .unwrap();
            assert!((solution.objective - 7.0).abs() < 1e-6);
        }

        #[test]
        fn layout_mip_uses_binaries() {
            // Maximize b subject to b <= x, x <= 0.4: b must be 0.
            let mut layout = LayoutProblem::new(Sense::Maximize);
            let x = layout.continuous(0.0, 0.4);
            let b = layout.binary();
            layout.objective = LinExpr::term(b, 1.0);
            layout.constrain(
                LinExpr::term(b, 1.0).add_term(x, -1.0),
                Relation::Le,
                0.0,
            );

            let oracle = HighsOracle::new();
            let solution = oracle
                .solve_layout(&layout, Duration::from_secs(10))
                .unwrap();
            assert!(solution.values[b] < 0.01);
        }

        #[test]
        fn infeasible_model_is_reported() {
            let mut layout = LayoutProblem::new(Sense::Minimize);
            let x = layout.continuous(0.0, 1.0);
            layout.objective = LinExpr::term(x, 1.0);
            layout.constrain(LinExpr::term(x, 1.0), Relation::Ge, 2.0);

            let oracle = HighsOracle::new();
            let result = oracle.solve_layout(&layout, Duration::from_secs(10));
            assert!(matches!(result, Err(OracleError::Infeasible)));
        }
    }
}
