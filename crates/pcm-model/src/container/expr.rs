//! Solver-facing declarations: variables, affine expressions, constraints.
//!
//! Everything the builders write ends up here as plain data. Expressions may
//! reference parameters; [`ConstraintDecl::resolve`] folds the current
//! parameter values into the right-hand side so a backend only ever sees a
//! [`LinearProgram`] of numbers.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a declared decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VariableId(usize);

impl VariableId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Index of an adjustable parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ParameterId(usize);

impl ParameterId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        ParameterId(index)
    }
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Index of a declared constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConstraintId(usize);

impl ConstraintId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// `Σ a_i x_i + Σ b_j p_j + c` over variables `x` and parameters `p`.
///
/// Coefficients accumulate: adding the same variable twice sums the
/// coefficients, which is what nodal aggregation relies on when several
/// devices share a bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AffineExpr {
    variables: BTreeMap<VariableId, f64>,
    parameters: BTreeMap<ParameterId, f64>,
    constant: f64,
}

impl AffineExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_variable(var: VariableId, coeff: f64) -> Self {
        let mut expr = Self::new();
        expr.add_variable(var, coeff);
        expr
    }

    pub fn add_variable(&mut self, var: VariableId, coeff: f64) {
        *self.variables.entry(var).or_insert(0.0) += coeff;
    }

    pub fn add_parameter(&mut self, param: ParameterId, coeff: f64) {
        *self.parameters.entry(param).or_insert(0.0) += coeff;
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// `self += scale * other`
    pub fn add_scaled(&mut self, other: &AffineExpr, scale: f64) {
        for (&var, &coeff) in &other.variables {
            self.add_variable(var, scale * coeff);
        }
        for (&param, &coeff) in &other.parameters {
            self.add_parameter(param, scale * coeff);
        }
        self.constant += scale * other.constant;
    }

    pub fn variable_coefficient(&self, var: VariableId) -> f64 {
        self.variables.get(&var).copied().unwrap_or(0.0)
    }

    pub fn parameter_coefficient(&self, param: ParameterId) -> f64 {
        self.parameters.get(&param).copied().unwrap_or(0.0)
    }

    pub fn variables(&self) -> impl Iterator<Item = (VariableId, f64)> + '_ {
        self.variables.iter().map(|(&v, &c)| (v, c))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (ParameterId, f64)> + '_ {
        self.parameters.iter().map(|(&p, &c)| (p, c))
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn is_parameterized(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// Replace parameter terms by their current values.
    pub fn resolve(&self, values: &[f64]) -> AffineExpr {
        let constant = self
            .parameters
            .iter()
            .fold(self.constant, |acc, (p, c)| acc + c * values[p.index()]);
        AffineExpr {
            variables: self.variables.clone(),
            parameters: BTreeMap::new(),
            constant,
        }
    }

    /// Evaluate at a primal point with parameters fixed to `params`.
    pub fn evaluate(&self, primal: &[f64], params: &[f64]) -> f64 {
        let vars: f64 = self
            .variables
            .iter()
            .map(|(v, c)| c * primal[v.index()])
            .sum();
        vars + self.resolve(params).constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::LessEqual => f.write_str("<="),
            Sense::GreaterEqual => f.write_str(">="),
            Sense::Equal => f.write_str("=="),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

/// A decision variable with optional bounds (`None` = unbounded).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDecl {
    pub name: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// `expr (sense) rhs`, possibly parameterized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintDecl {
    pub name: String,
    pub expr: AffineExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl ConstraintDecl {
    /// Move constants and parameter values to the right-hand side.
    pub fn resolve(&self, params: &[f64]) -> LinearConstraint {
        let resolved = self.expr.resolve(params);
        LinearConstraint {
            name: self.name.clone(),
            terms: resolved
                .variables()
                .filter(|(_, c)| *c != 0.0)
                .map(|(v, c)| (v.index(), c))
                .collect(),
            sense: self.sense,
            rhs: self.rhs - resolved.constant(),
        }
    }
}

/// Parameter-free constraint handed to a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub name: String,
    /// `(variable index, coefficient)` pairs
    pub terms: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn coefficient(&self, var: VariableId) -> f64 {
        self.terms
            .iter()
            .filter(|(i, _)| *i == var.index())
            .map(|(_, c)| c)
            .sum()
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            write!(f, "0")?;
        }
        for (n, (i, c)) in self.terms.iter().enumerate() {
            if n > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{c} x{i}")?;
        }
        write!(f, " {} {}", self.sense, self.rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearObjective {
    pub sense: ObjectiveSense,
    pub terms: Vec<(usize, f64)>,
    pub constant: f64,
}

impl LinearObjective {
    pub fn evaluate(&self, primal: &[f64]) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, (i, c)| acc + c * primal[*i])
    }
}

/// Fully resolved linear program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearProgram {
    pub variables: Vec<VariableDecl>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: LinearObjective,
}

/// Flat declaration lists owned by the container.
#[derive(Debug, Clone, Default)]
pub(crate) struct Declarations {
    pub variables: Vec<VariableDecl>,
    pub constraints: Vec<ConstraintDecl>,
}

impl Declarations {
    pub fn push_variable(&mut self, decl: VariableDecl) -> VariableId {
        self.variables.push(decl);
        VariableId(self.variables.len() - 1)
    }

    pub fn push_constraint(&mut self, decl: ConstraintDecl) -> ConstraintId {
        self.constraints.push(decl);
        ConstraintId(self.constraints.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_accumulate() {
        let x = VariableId(0);
        let mut expr = AffineExpr::from_variable(x, 1.0);
        expr.add_variable(x, 2.5);
        expr.add_constant(-3.0);
        expr.add_constant(1.0);
        assert_eq!(expr.variable_coefficient(x), 3.5);
        assert_eq!(expr.constant(), -2.0);
        assert_eq!(expr.variable_coefficient(VariableId(7)), 0.0);
    }

    #[test]
    fn test_resolve_folds_parameters_into_constant() {
        let mut expr = AffineExpr::new();
        expr.add_parameter(ParameterId(0), -2.0);
        expr.add_parameter(ParameterId(1), 4.0);
        expr.add_constant(1.0);
        let resolved = expr.resolve(&[3.0, 0.5]);
        assert!(!resolved.is_parameterized());
        assert_eq!(resolved.constant(), 1.0 - 6.0 + 2.0);
    }

    #[test]
    fn test_constraint_resolution_moves_constant_to_rhs() {
        let mut expr = AffineExpr::from_variable(VariableId(0), 1.0);
        expr.add_variable(VariableId(1), 1.0);
        expr.add_parameter(ParameterId(0), -10.0);
        let decl = ConstraintDecl {
            name: "req".into(),
            expr,
            sense: Sense::GreaterEqual,
            rhs: 0.0,
        };
        let lc = decl.resolve(&[1.0]);
        assert_eq!(lc.terms, vec![(0, 1.0), (1, 1.0)]);
        assert_eq!(lc.rhs, 10.0);
        assert_eq!(lc.to_string(), "1 x0 + 1 x1 >= 10");
    }

    #[test]
    fn test_add_scaled_merges_all_term_kinds() {
        let mut a = AffineExpr::from_variable(VariableId(0), 1.0);
        let mut b = AffineExpr::from_variable(VariableId(0), 2.0);
        b.add_parameter(ParameterId(3), 1.0);
        b.add_constant(5.0);
        a.add_scaled(&b, -1.0);
        assert_eq!(a.variable_coefficient(VariableId(0)), -1.0);
        assert_eq!(a.parameter_coefficient(ParameterId(3)), -1.0);
        assert_eq!(a.constant(), -5.0);
    }
}
