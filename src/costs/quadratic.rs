//! Quadratic cost with time-varying terms.
//!
//! The cost is composed of a state portion and a control portion, each of
//! which is given by a Hessian provider _H(t)_ and a gradient provider
//! _g(t)_:
//!
//! ```text
//! l(t, x, u) = ½ xᵀ Hx(t) x + gx(t)ᵀ x + ½ uᵀ Hu(t) u + gu(t)ᵀ u
//! ```
//!
//! A portion that is not set contributes nothing. The mixed second derivative
//! is always zero.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use optcore::costs::QuadraticCost;
//! use optcore::nalgebra::{dmatrix, dvector, DVector};
//! use optcore::{Cost, TimeInvariantMatrix, TimeInvariantVector};
//!
//! let mut cost: QuadraticCost<f64> = QuadraticCost::new("energy");
//! cost.set_control_cost(
//!     Arc::new(TimeInvariantMatrix::new(dmatrix![2.0])),
//!     Arc::new(TimeInvariantVector::new(dvector![0.0])),
//! );
//!
//! let value = cost.value(0.0, &dvector![1.0, 1.0], &dvector![3.0]).unwrap();
//! assert_eq!(value, 9.0);
//!
//! let mut gradient = DVector::zeros(1);
//! cost.control_gradient(0.0, &dvector![1.0, 1.0], &dvector![3.0], &mut gradient).unwrap();
//! assert_eq!(gradient, dvector![6.0]);
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use nalgebra::{convert, DMatrix, DVector, RealField};
use num_traits::Zero;

use crate::core::{
    Cost, CostError, SharedTrajectory, SparsityPattern, TimeVarying, TrajectoryError,
};

/// Matrix provider that can be shared among several costs.
pub type SharedHessian<S> = Arc<dyn TimeVarying<S, DMatrix<S>> + Send + Sync>;

/// Hessian and gradient providers of one portion of a [`QuadraticCost`].
#[derive(Debug, Clone)]
pub struct QuadraticTerm<G, H> {
    hessian: H,
    gradient: G,
}

impl<G, H> QuadraticTerm<G, H> {
    /// Combines the providers.
    pub fn new(hessian: H, gradient: G) -> Self {
        Self { hessian, gradient }
    }

    /// Gets the Hessian provider.
    pub fn hessian(&self) -> &H {
        &self.hessian
    }

    /// Gets the Hessian provider for modification.
    pub fn hessian_mut(&mut self) -> &mut H {
        &mut self.hessian
    }

    /// Gets the gradient provider.
    pub fn gradient(&self) -> &G {
        &self.gradient
    }

    /// Gets the gradient provider for modification.
    pub fn gradient_mut(&mut self) -> &mut G {
        &mut self.gradient
    }

    fn eval_hessian<S>(&self, time: S, dim: usize) -> Result<DMatrix<S>, CostError>
    where
        S: RealField + Copy,
        H: TimeVarying<S, DMatrix<S>>,
    {
        let mut hessian = DMatrix::zeros(dim, dim);
        self.hessian.get_object(time, &mut hessian)?;

        if hessian.nrows() != dim || hessian.ncols() != dim {
            return Err(CostError::InvalidDimensionality {
                expected: dim,
                found: hessian.nrows().max(hessian.ncols()),
            });
        }

        Ok(hessian)
    }

    fn eval_gradient<S>(&self, time: S, dim: usize) -> Result<DVector<S>, CostError>
    where
        S: RealField + Copy,
        G: TimeVarying<S, DVector<S>>,
    {
        let mut gradient = DVector::zeros(dim);
        self.gradient.get_object(time, &mut gradient)?;

        if gradient.len() != dim {
            return Err(CostError::Trajectory(
                TrajectoryError::InconsistentDimension {
                    expected: dim,
                    found: gradient.len(),
                },
            ));
        }

        Ok(gradient)
    }

    fn value<S>(&self, time: S, x: &DVector<S>) -> Result<S, CostError>
    where
        S: RealField + Copy,
        G: TimeVarying<S, DVector<S>>,
        H: TimeVarying<S, DMatrix<S>>,
    {
        let hessian = self.eval_hessian(time, x.len())?;
        let gradient = self.eval_gradient(time, x.len())?;
        let half: S = convert(0.5);

        Ok(half * x.dot(&(hessian * x)) + gradient.dot(x))
    }

    fn first_derivative<S>(&self, time: S, x: &DVector<S>) -> Result<DVector<S>, CostError>
    where
        S: RealField + Copy,
        G: TimeVarying<S, DVector<S>>,
        H: TimeVarying<S, DMatrix<S>>,
    {
        let hessian = self.eval_hessian(time, x.len())?;
        let mut gradient = self.eval_gradient(time, x.len())?;
        gradient += hessian * x;
        Ok(gradient)
    }
}

/// Quadratic cost. See [module](self) documentation for more details.
///
/// The providers are generic. By default they are shared trait objects, so
/// that the same provider can be used by several costs or by both portions.
pub struct QuadraticCost<S, G = SharedTrajectory<S>, H = SharedHessian<S>>
where
    S: RealField + Copy,
{
    name: String,
    state: Option<QuadraticTerm<G, H>>,
    control: Option<QuadraticTerm<G, H>>,
    _phantom: PhantomData<S>,
}

impl<S, G, H> QuadraticCost<S, G, H>
where
    S: RealField + Copy,
    G: TimeVarying<S, DVector<S>>,
    H: TimeVarying<S, DMatrix<S>>,
{
    /// Creates the cost with no portion set, i.e., identically zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
            control: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the providers of the state portion.
    pub fn set_state_cost(&mut self, hessian: H, gradient: G) {
        self.state = Some(QuadraticTerm::new(hessian, gradient));
    }

    /// Sets the providers of the control portion.
    pub fn set_control_cost(&mut self, hessian: H, gradient: G) {
        self.control = Some(QuadraticTerm::new(hessian, gradient));
    }

    /// Removes the state portion.
    pub fn clear_state_cost(&mut self) {
        self.state = None;
    }

    /// Removes the control portion.
    pub fn clear_control_cost(&mut self) {
        self.control = None;
    }

    /// Gets the state portion, if set.
    pub fn state_term(&self) -> Option<&QuadraticTerm<G, H>> {
        self.state.as_ref()
    }

    /// Gets the state portion for modification, if set.
    pub fn state_term_mut(&mut self) -> Option<&mut QuadraticTerm<G, H>> {
        self.state.as_mut()
    }

    /// Gets the control portion, if set.
    pub fn control_term(&self) -> Option<&QuadraticTerm<G, H>> {
        self.control.as_ref()
    }

    /// Gets the control portion for modification, if set.
    pub fn control_term_mut(&mut self) -> Option<&mut QuadraticTerm<G, H>> {
        self.control.as_mut()
    }
}

fn gradient_into<S, G, H>(
    term: Option<&QuadraticTerm<G, H>>,
    time: S,
    x: &DVector<S>,
    gradient: &mut DVector<S>,
) -> Result<(), CostError>
where
    S: RealField + Copy,
    G: TimeVarying<S, DVector<S>>,
    H: TimeVarying<S, DMatrix<S>>,
{
    // The output is zeroed first so that it is never stale on failure.
    if gradient.len() != x.len() {
        *gradient = DVector::zeros(x.len());
    } else {
        gradient.fill(S::zero());
    }

    if let Some(term) = term {
        gradient.copy_from(&term.first_derivative(time, x)?);
    }

    Ok(())
}

fn hessian_into<S, G, H>(
    term: Option<&QuadraticTerm<G, H>>,
    time: S,
    dim: usize,
    hessian: &mut DMatrix<S>,
) -> Result<(), CostError>
where
    S: RealField + Copy,
    G: TimeVarying<S, DVector<S>>,
    H: TimeVarying<S, DMatrix<S>>,
{
    match term {
        Some(term) => *hessian = term.eval_hessian(time, dim)?,
        None => *hessian = DMatrix::zeros(dim, dim),
    }

    Ok(())
}

impl<S, G, H> Cost for QuadraticCost<S, G, H>
where
    S: RealField + Copy,
    G: TimeVarying<S, DVector<S>>,
    H: TimeVarying<S, DMatrix<S>>,
{
    type Scalar = S;

    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self, time: S, state: &DVector<S>, control: &DVector<S>) -> Result<S, CostError> {
        let mut value = S::zero();

        if let Some(term) = &self.state {
            value += term.value(time, state)?;
        }

        if let Some(term) = &self.control {
            value += term.value(time, control)?;
        }

        Ok(value)
    }

    fn state_gradient(
        &self,
        time: S,
        state: &DVector<S>,
        _control: &DVector<S>,
        gradient: &mut DVector<S>,
    ) -> Result<(), CostError> {
        gradient_into(self.state.as_ref(), time, state, gradient)
    }

    fn control_gradient(
        &self,
        time: S,
        _state: &DVector<S>,
        control: &DVector<S>,
        gradient: &mut DVector<S>,
    ) -> Result<(), CostError> {
        gradient_into(self.control.as_ref(), time, control, gradient)
    }

    fn state_hessian(
        &self,
        time: S,
        state: &DVector<S>,
        _control: &DVector<S>,
        hessian: &mut DMatrix<S>,
    ) -> Result<(), CostError> {
        hessian_into(self.state.as_ref(), time, state.len(), hessian)
    }

    fn control_hessian(
        &self,
        time: S,
        _state: &DVector<S>,
        control: &DVector<S>,
        hessian: &mut DMatrix<S>,
    ) -> Result<(), CostError> {
        hessian_into(self.control.as_ref(), time, control.len(), hessian)
    }

    fn state_control_hessian(
        &self,
        _time: S,
        state: &DVector<S>,
        control: &DVector<S>,
        hessian: &mut DMatrix<S>,
    ) -> Result<(), CostError> {
        *hessian = DMatrix::zeros(state.len(), control.len());
        Ok(())
    }

    fn state_control_hessian_sparsity(&self) -> Option<SparsityPattern> {
        Some(SparsityPattern::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    use crate::core::{SampledTrajectory, TimeInvariantMatrix, TimeInvariantVector};

    fn state_cost() -> QuadraticCost<f64> {
        let mut cost: QuadraticCost<f64> = QuadraticCost::new("state");
        cost.set_state_cost(
            Arc::new(TimeInvariantMatrix::new(dmatrix![2.0, 0.0; 0.0, 4.0])),
            Arc::new(TimeInvariantVector::new(dvector![1.0, -1.0])),
        );
        cost
    }

    #[test]
    fn value_combines_portions() {
        let mut cost = state_cost();
        let x = dvector![1.0, 2.0];
        let u = dvector![3.0];

        // 0.5 * (2 + 16) + (1 - 2)
        assert_abs_diff_eq!(cost.value(0.0, &x, &u).unwrap(), 8.0, epsilon = 1e-12);

        cost.set_control_cost(
            Arc::new(TimeInvariantMatrix::new(dmatrix![1.0])),
            Arc::new(TimeInvariantVector::new(dvector![1.0])),
        );
        // + 0.5 * 9 + 3
        assert_abs_diff_eq!(cost.value(0.0, &x, &u).unwrap(), 15.5, epsilon = 1e-12);
    }

    #[test]
    fn gradient_is_affine_in_state() {
        let cost = state_cost();
        let mut gradient = DVector::zeros(0);

        cost.state_gradient(0.0, &dvector![1.0, 2.0], &DVector::zeros(0), &mut gradient)
            .unwrap();
        assert_abs_diff_eq!(gradient, dvector![3.0, 7.0], epsilon = 1e-12);
    }

    #[test]
    fn missing_portion_is_zero() {
        let mut cost = state_cost();
        let u = dvector![1.0, 2.0, 3.0];
        let mut gradient = dvector![9.0];
        let mut hessian = DMatrix::zeros(0, 0);

        cost.control_gradient(0.0, &dvector![0.0, 0.0], &u, &mut gradient)
            .unwrap();
        assert_eq!(gradient, DVector::zeros(3));

        cost.control_hessian(0.0, &dvector![0.0, 0.0], &u, &mut hessian)
            .unwrap();
        assert_eq!(hessian, DMatrix::zeros(3, 3));

        cost.state_control_hessian(0.0, &dvector![0.0, 0.0], &u, &mut hessian)
            .unwrap();
        assert_eq!(hessian, DMatrix::zeros(2, 3));

        cost.clear_state_cost();
        assert!(cost.state_term().is_none());
    }

    #[test]
    fn wrong_state_size_is_rejected() {
        let cost = state_cost();
        let mut gradient = DVector::zeros(3);

        assert!(matches!(
            cost.state_gradient(0.0, &dvector![1.0, 2.0, 3.0], &DVector::zeros(0), &mut gradient),
            Err(CostError::InvalidDimensionality {
                expected: 3,
                found: 2
            })
        ));
        assert_eq!(gradient, DVector::zeros(3));
    }

    #[test]
    fn failing_provider_is_propagated() {
        let mut cost: QuadraticCost<f64> = QuadraticCost::new("tracking");
        let desired =
            SampledTrajectory::new(vec![0.0, 1.0], vec![dvector![1.0], dvector![2.0]]).unwrap();
        cost.set_state_cost(
            Arc::new(TimeInvariantMatrix::new(DMatrix::identity(1, 1))),
            Arc::new(desired),
        );

        let mut gradient = DVector::zeros(1);
        assert!(cost
            .state_gradient(0.5, &dvector![0.0], &DVector::zeros(0), &mut gradient)
            .is_ok());
        assert_abs_diff_eq!(gradient, dvector![1.5], epsilon = 1e-12);

        assert!(matches!(
            cost.state_gradient(1.5, &dvector![0.0], &DVector::zeros(0), &mut gradient),
            Err(CostError::Trajectory(TrajectoryError::OutOfRange))
        ));
        assert_eq!(gradient, dvector![0.0]);
        assert!(cost.value(1.5, &dvector![0.0], &DVector::zeros(0)).is_err());
    }

    #[test]
    fn shared_provider_for_both_portions() {
        let hessian: SharedHessian<f64> =
            Arc::new(TimeInvariantMatrix::new(DMatrix::identity(2, 2)));
        let gradient: SharedTrajectory<f64> =
            Arc::new(TimeInvariantVector::new(dvector![1.0, 1.0]));

        let mut cost: QuadraticCost<f64> = QuadraticCost::new("shared");
        cost.set_state_cost(hessian.clone(), gradient.clone());
        cost.set_control_cost(hessian, gradient);

        let x = dvector![1.0, 0.0];
        assert_abs_diff_eq!(cost.value(0.0, &x, &x).unwrap(), 3.0, epsilon = 1e-12);
    }
}
