//! Weighted L2-norm tracking cost.
//!
//! The cost penalizes the distance of a selected part of the state and of the
//! control input from desired trajectories:
//!
//! ```text
//! l(t, x, u) = ½ ‖Sx x - dx(t)‖²_Wx + ½ ‖Su u - du(t)‖²_Wu
//! ```
//!
//! where _S_ are selector matrices, _W_ are weight matrices (identity by
//! default) and _d(t)_ are desired trajectories. The constant terms
//! _½ d(t)ᵀ W d(t)_ are dropped, so the cost is a [quadratic
//! cost](super::quadratic) with Hessian _Sᵀ W S_ and gradient term
//! _-(d(t)ᵀ W S)ᵀ_. Without a desired trajectory, the portion regularizes
//! the selected variables towards zero.
//!
//! A selector with zero rows or columns disables the corresponding portion.
//!
//! ```rust
//! use optcore::costs::L2NormCost;
//! use optcore::nalgebra::{dmatrix, dvector, DMatrix, DVector};
//! use optcore::Cost;
//!
//! // Track the position (first state), ignore the control input.
//! let mut cost = L2NormCost::with_selectors(
//!     "position",
//!     dmatrix![1.0, 0.0],
//!     DMatrix::zeros(0, 0),
//! );
//! cost.set_state_weight(&dmatrix![10.0]).unwrap();
//! cost.set_state_desired_point(&dvector![1.0]).unwrap();
//! assert!(cost.set_control_weight(&dmatrix![1.0]).is_err());
//!
//! let mut gradient = DVector::zeros(2);
//! let control = DVector::zeros(0);
//! cost.state_gradient(0.0, &dvector![0.0, 0.0], &control, &mut gradient).unwrap();
//! assert_eq!(gradient, dvector![-10.0, 0.0]);
//! ```

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Zero;

use super::quadratic::{QuadraticCost, QuadraticTerm};
use super::tracking::TrackingGradient;
use crate::core::{
    Cost, CostError, Portion, SharedTrajectory, SparsityPattern, TimeInvariantMatrix,
    TimeInvariantVector,
};
use crate::report::report;

type TrackingTerm<S> = QuadraticTerm<TrackingGradient<S>, TimeInvariantMatrix<S>>;

/// Weighted L2-norm tracking cost. See [module](self) documentation for more
/// details.
pub struct L2NormCost<S: RealField + Copy> {
    quadratic: QuadraticCost<S, TrackingGradient<S>, TimeInvariantMatrix<S>>,
}

impl<S: RealField + Copy> L2NormCost<S> {
    /// Creates the cost tracking the full state and the full control input.
    pub fn new(name: impl Into<String>, state_dim: usize, control_dim: usize) -> Self {
        Self::with_selectors(
            name,
            DMatrix::identity(state_dim, state_dim),
            DMatrix::identity(control_dim, control_dim),
        )
    }

    /// Creates the cost tracking the linear combinations of the state and the
    /// control input given by the rows of the selectors.
    ///
    /// A selector with zero rows or zero columns disables the portion.
    pub fn with_selectors(
        name: impl Into<String>,
        state_selector: DMatrix<S>,
        control_selector: DMatrix<S>,
    ) -> Self {
        let mut quadratic = QuadraticCost::new(name);

        if let Some(term) = tracking_term(state_selector) {
            quadratic.set_state_cost(term.0, term.1);
        }

        if let Some(term) = tracking_term(control_selector) {
            quadratic.set_control_cost(term.0, term.1);
        }

        Self { quadratic }
    }

    /// Sets the weight of the state portion. The weight must be a square
    /// matrix with dimension equal to the number of rows of the selector.
    pub fn set_state_weight(&mut self, weight: &DMatrix<S>) -> Result<(), CostError> {
        self.set_weight(Portion::State, "set_state_weight", weight)
    }

    /// Sets the weight of the control portion. The weight must be a square
    /// matrix with dimension equal to the number of rows of the selector.
    pub fn set_control_weight(&mut self, weight: &DMatrix<S>) -> Result<(), CostError> {
        self.set_weight(Portion::Control, "set_control_weight", weight)
    }

    /// Sets a constant desired point of the state portion.
    pub fn set_state_desired_point(&mut self, point: &DVector<S>) -> Result<(), CostError> {
        self.set_desired_point(Portion::State, "set_state_desired_point", point)
    }

    /// Sets a constant desired point of the control portion.
    pub fn set_control_desired_point(&mut self, point: &DVector<S>) -> Result<(), CostError> {
        self.set_desired_point(Portion::Control, "set_control_desired_point", point)
    }

    /// Sets a desired trajectory of the state portion.
    ///
    /// The trajectory is shared, not copied. Its values must have as many
    /// elements as the selector has rows, otherwise the evaluations at the
    /// affected times fail.
    pub fn set_state_desired_trajectory(
        &mut self,
        trajectory: SharedTrajectory<S>,
    ) -> Result<(), CostError> {
        self.set_desired_trajectory(Portion::State, "set_state_desired_trajectory", trajectory)
    }

    /// Sets a desired trajectory of the control portion. See
    /// [`set_state_desired_trajectory`](Self::set_state_desired_trajectory).
    pub fn set_control_desired_trajectory(
        &mut self,
        trajectory: SharedTrajectory<S>,
    ) -> Result<(), CostError> {
        self.set_desired_trajectory(
            Portion::Control,
            "set_control_desired_trajectory",
            trajectory,
        )
    }

    /// Determines whether the portion is enabled.
    pub fn is_enabled(&self, portion: Portion) -> bool {
        self.term(portion).is_some()
    }

    /// Determines whether the portion tracks a desired trajectory (or point).
    pub fn has_desired_trajectory(&self, portion: Portion) -> bool {
        self.term(portion)
            .map(|term| term.gradient().has_desired_trajectory())
            .unwrap_or(false)
    }

    /// Gets the selector of the portion, if enabled.
    pub fn selector(&self, portion: Portion) -> Option<&DMatrix<S>> {
        self.term(portion).map(|term| term.gradient().selector())
    }

    /// Gets the weight of the portion, if enabled.
    pub fn weight(&self, portion: Portion) -> Option<&DMatrix<S>> {
        self.term(portion).map(|term| term.gradient().weight())
    }

    fn term(&self, portion: Portion) -> Option<&TrackingTerm<S>> {
        match portion {
            Portion::State => self.quadratic.state_term(),
            Portion::Control => self.quadratic.control_term(),
        }
    }

    fn enabled_term_mut(
        &mut self,
        portion: Portion,
        operation: &str,
    ) -> Result<&mut TrackingTerm<S>, CostError> {
        let term = match portion {
            Portion::State => self.quadratic.state_term_mut(),
            Portion::Control => self.quadratic.control_term_mut(),
        };

        term.ok_or_else(|| report("L2NormCost", operation, CostError::DisabledPortion(portion)))
    }

    fn set_weight(
        &mut self,
        portion: Portion,
        operation: &str,
        weight: &DMatrix<S>,
    ) -> Result<(), CostError> {
        if weight.nrows() != weight.ncols() {
            return Err(report(
                "L2NormCost",
                operation,
                CostError::NonSquareWeight {
                    rows: weight.nrows(),
                    cols: weight.ncols(),
                },
            ));
        }

        let term = self.enabled_term_mut(portion, operation)?;
        term.gradient_mut().set_weight(weight)?;

        let hessian = term.gradient().hessian();
        term.hessian_mut().set(hessian);
        Ok(())
    }

    fn set_desired_point(
        &mut self,
        portion: Portion,
        operation: &str,
        point: &DVector<S>,
    ) -> Result<(), CostError> {
        let term = self.enabled_term_mut(portion, operation)?;

        let expected = term.gradient().tracked_dim();
        if point.len() != expected {
            return Err(report(
                "L2NormCost",
                operation,
                CostError::DesiredPointDimensionMismatch {
                    expected,
                    found: point.len(),
                },
            ));
        }

        term.gradient_mut()
            .set_desired_trajectory(Arc::new(TimeInvariantVector::new(point.clone())));
        Ok(())
    }

    fn set_desired_trajectory(
        &mut self,
        portion: Portion,
        operation: &str,
        trajectory: SharedTrajectory<S>,
    ) -> Result<(), CostError> {
        let term = self.enabled_term_mut(portion, operation)?;
        term.gradient_mut().set_desired_trajectory(trajectory);
        Ok(())
    }

    fn hessian_sparsity(&self, portion: Portion) -> SparsityPattern {
        self.term(portion)
            .map(|term| {
                let gradient = term.gradient();
                structural_hessian_pattern(gradient.selector(), gradient.weight())
            })
            .unwrap_or_default()
    }
}

/// Entries of _Sᵀ W S_ that are nonzero for some values with the same zero
/// structure as `selector` and `weight`. Numerical cancellation is ignored.
fn structural_hessian_pattern<S: RealField + Copy>(
    selector: &DMatrix<S>,
    weight: &DMatrix<S>,
) -> SparsityPattern {
    let rows = selector.nrows();
    let cols = selector.ncols();

    // (i, j) is nonzero if S[k, i] W[k, l] S[l, j] != 0 for some k, l.
    let mut pattern = SparsityPattern::new();
    for j in 0..cols {
        for i in 0..cols {
            let nonzero = (0..rows).any(|k| {
                !selector[(k, i)].is_zero()
                    && (0..rows)
                        .any(|l| !weight[(k, l)].is_zero() && !selector[(l, j)].is_zero())
            });

            if nonzero {
                pattern.push(i, j);
            }
        }
    }
    pattern
}

fn tracking_term<S: RealField + Copy>(
    selector: DMatrix<S>,
) -> Option<(TimeInvariantMatrix<S>, TrackingGradient<S>)> {
    if selector.nrows() == 0 || selector.ncols() == 0 {
        return None;
    }

    let gradient = TrackingGradient::new(selector);
    let hessian = TimeInvariantMatrix::new(gradient.hessian());
    Some((hessian, gradient))
}

impl<S: RealField + Copy> Cost for L2NormCost<S> {
    type Scalar = S;

    fn name(&self) -> &str {
        self.quadratic.name()
    }

    fn value(&self, time: S, state: &DVector<S>, control: &DVector<S>) -> Result<S, CostError> {
        self.quadratic.value(time, state, control)
    }

    fn state_gradient(
        &self,
        time: S,
        state: &DVector<S>,
        control: &DVector<S>,
        gradient: &mut DVector<S>,
    ) -> Result<(), CostError> {
        self.quadratic
            .state_gradient(time, state, control, gradient)
    }

    fn control_gradient(
        &self,
        time: S,
        state: &DVector<S>,
        control: &DVector<S>,
        gradient: &mut DVector<S>,
    ) -> Result<(), CostError> {
        self.quadratic
            .control_gradient(time, state, control, gradient)
    }

    fn state_hessian(
        &self,
        time: S,
        state: &DVector<S>,
        control: &DVector<S>,
        hessian: &mut DMatrix<S>,
    ) -> Result<(), CostError> {
        self.quadratic.state_hessian(time, state, control, hessian)
    }

    fn control_hessian(
        &self,
        time: S,
        state: &DVector<S>,
        control: &DVector<S>,
        hessian: &mut DMatrix<S>,
    ) -> Result<(), CostError> {
        self.quadratic.control_hessian(time, state, control, hessian)
    }

    fn state_control_hessian(
        &self,
        time: S,
        state: &DVector<S>,
        control: &DVector<S>,
        hessian: &mut DMatrix<S>,
    ) -> Result<(), CostError> {
        self.quadratic
            .state_control_hessian(time, state, control, hessian)
    }

    /// The pattern follows the zero structure of the selector and the weight,
    /// so it changes only when a weight with a different structure is set.
    fn state_hessian_sparsity(&self) -> Option<SparsityPattern> {
        Some(self.hessian_sparsity(Portion::State))
    }

    /// See [`state_hessian_sparsity`](Self::state_hessian_sparsity).
    fn control_hessian_sparsity(&self) -> Option<SparsityPattern> {
        Some(self.hessian_sparsity(Portion::Control))
    }

    fn state_control_hessian_sparsity(&self) -> Option<SparsityPattern> {
        self.quadratic.state_control_hessian_sparsity()
    }
}
