//! LP oracle abstraction.
//!
//! The engine never talks to a solver directly. Everything it needs fits a
//! narrow surface: build the column-generation master by rows and columns,
//! add columns incrementally, describe a small geometric LP/MIP, solve either
//! under a time limit, and read back primal values and (for the master) dual
//! prices. Any backend implementing [`LpOracle`] can be substituted.

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Failure modes of an oracle call.
///
/// None of these are fatal to the search: a timed-out or infeasible solve
/// degrades to the best incumbent at every call site.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The time limit elapsed without a usable solution.
    #[error("Oracle timed out after {0:?}")]
    Timeout(Duration),
    /// The model was proven infeasible.
    #[error("Oracle reported an infeasible model")]
    Infeasible,
    /// No solver backend is compiled in or configured.
    #[error("No oracle backend available: {0}")]
    Unavailable(String),
    /// Backend-specific failure.
    #[error("Oracle backend error: {0}")]
    Backend(String),
}

/// One column of the set-covering master: a candidate layer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MasterColumn {
    /// Objective coefficient (the layer height).
    pub cost: f64,
    /// Indices of the cover rows (unique items) this column satisfies.
    pub covers: Vec<usize>,
}

/// Set-covering master problem, grown column by column.
///
/// Minimize `sum(cost_k * alpha_k)` over `alpha_k in [0, 1]` subject to one
/// `>= 1` cover row per unique item. Columns are only ever appended, so a
/// backend may reuse its model between rounds.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MasterProblem {
    /// Number of cover rows.
    pub rows: usize,
    /// Columns added so far.
    pub columns: Vec<MasterColumn>,
}

impl MasterProblem {
    /// Creates an empty master with one cover row per unique item.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    /// Appends a column and returns its index.
    pub fn add_column(&mut self, cost: f64, covers: Vec<usize>) -> usize {
        debug_assert!(covers.iter().all(|&r| r < self.rows));
        self.columns.push(MasterColumn { cost, covers });
        self.columns.len() - 1
    }

    /// Number of columns added so far.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// Solution of the master LP.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MasterSolution {
    /// Objective value.
    pub objective: f64,
    /// Primal value per column, same order as [`MasterProblem::columns`].
    pub values: Vec<f64>,
    /// Dual price per cover row.
    pub duals: Vec<f64>,
}

/// Identifier of a variable inside a [`LayoutProblem`].
pub type VarId = usize;

/// Kind and bounds of a layout variable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VarKind {
    /// Continuous variable with lower and upper bound.
    Continuous { lo: f64, hi: f64 },
    /// Binary 0/1 variable.
    Binary,
}

/// Linear expression: `sum(coef_i * var_i) + constant`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinExpr {
    /// Coefficient terms.
    pub terms: Vec<(VarId, f64)>,
    /// Constant offset.
    pub constant: f64,
}

impl LinExpr {
    /// The zero expression.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A single-variable term.
    pub fn term(var: VarId, coef: f64) -> Self {
        Self {
            terms: vec![(var, coef)],
            constant: 0.0,
        }
    }

    /// Adds `coef * var` to the expression.
    pub fn add_term(mut self, var: VarId, coef: f64) -> Self {
        self.terms.push((var, coef));
        self
    }

    /// Adds a constant to the expression.
    pub fn add_constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }
}

/// Comparison operator of a layout constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Relation {
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
    /// Equal.
    Eq,
}

/// One linear constraint: `expr <relation> rhs`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintSpec {
    /// Left-hand side.
    pub expr: LinExpr,
    /// Comparison operator.
    pub relation: Relation,
    /// Right-hand side constant.
    pub rhs: f64,
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Sense {
    /// Minimize the objective.
    Minimize,
    /// Maximize the objective.
    Maximize,
}

/// A small geometric LP/MIP: coordinates as variables plus precedence and
/// linearization constraints.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutProblem {
    /// Variable kinds/bounds, indexed by [`VarId`].
    pub vars: Vec<VarKind>,
    /// Linear constraints.
    pub constraints: Vec<ConstraintSpec>,
    /// Objective expression.
    pub objective: LinExpr,
    /// Optimization direction.
    pub sense: Sense,
}

impl LayoutProblem {
    /// Creates an empty problem with the given sense.
    pub fn new(sense: Sense) -> Self {
        Self {
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: LinExpr::zero(),
            sense,
        }
    }

    /// Adds a continuous variable and returns its id.
    pub fn continuous(&mut self, lo: f64, hi: f64) -> VarId {
        self.vars.push(VarKind::Continuous { lo, hi });
        self.vars.len() - 1
    }

    /// Adds a binary variable and returns its id.
    pub fn binary(&mut self) -> VarId {
        self.vars.push(VarKind::Binary);
        self.vars.len() - 1
    }

    /// Adds a constraint.
    pub fn constrain(&mut self, expr: LinExpr, relation: Relation, rhs: f64) {
        self.constraints.push(ConstraintSpec {
            expr,
            relation,
            rhs,
        });
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// True if any variable is integral.
    pub fn is_mip(&self) -> bool {
        self.vars.iter().any(|v| matches!(v, VarKind::Binary))
    }
}

/// Solution of a layout problem.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutSolution {
    /// Objective value.
    pub objective: f64,
    /// Variable values, indexed by [`VarId`].
    pub values: Vec<f64>,
}

/// External LP/MIP solver contract.
pub trait LpOracle {
    /// Solves the cumulative master LP and returns primals and row duals.
    fn solve_master(
        &self,
        master: &MasterProblem,
        time_limit: Duration,
    ) -> Result<MasterSolution, OracleError>;

    /// Solves a geometric layout LP/MIP and returns variable values.
    fn solve_layout(
        &self,
        layout: &LayoutProblem,
        time_limit: Duration,
    ) -> Result<LayoutSolution, OracleError>;
}
