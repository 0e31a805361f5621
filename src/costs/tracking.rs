use log::debug;
use nalgebra::{DMatrix, DVector, RealField};
use num_traits::{One, Zero};

use crate::core::{CostError, SharedTrajectory, TimeVarying, TrajectoryError};
use crate::report::report;

/// Linear term of a weighted tracking cost _½ ‖S x - d(t)‖²_W_.
///
/// Expanding the norm gives the gradient term _-(d(t)ᵀ W S)ᵀ_, evaluated here,
/// and the constant Hessian _Sᵀ W S_ returned by [`hessian`](Self::hessian).
pub(crate) struct TrackingGradient<S: RealField + Copy> {
    selector: DMatrix<S>,
    weight: DMatrix<S>,
    // W * S
    sub_matrix: DMatrix<S>,
    desired: Option<SharedTrajectory<S>>,
}

impl<S: RealField + Copy> TrackingGradient<S> {
    pub fn new(selector: DMatrix<S>) -> Self {
        let rows = selector.nrows();
        Self {
            sub_matrix: selector.clone(),
            selector,
            weight: DMatrix::identity(rows, rows),
            desired: None,
        }
    }

    pub fn set_weight(&mut self, weight: &DMatrix<S>) -> Result<(), CostError> {
        if weight.nrows() != weight.ncols() {
            return Err(report(
                "TrackingGradient",
                "set_weight",
                CostError::NonSquareWeight {
                    rows: weight.nrows(),
                    cols: weight.ncols(),
                },
            ));
        }

        if weight.ncols() != self.selector.nrows() {
            return Err(report(
                "TrackingGradient",
                "set_weight",
                CostError::WeightDimensionMismatch {
                    expected: self.selector.nrows(),
                    found: weight.ncols(),
                },
            ));
        }

        self.weight.copy_from(weight);
        self.sub_matrix = &self.weight * &self.selector;
        Ok(())
    }

    pub fn set_desired_trajectory(&mut self, desired: SharedTrajectory<S>) {
        self.desired = Some(desired);
    }

    pub fn has_desired_trajectory(&self) -> bool {
        self.desired.is_some()
    }

    /// Sᵀ W S
    pub fn hessian(&self) -> DMatrix<S> {
        self.selector.tr_mul(&self.sub_matrix)
    }

    pub fn selector(&self) -> &DMatrix<S> {
        &self.selector
    }

    pub fn weight(&self) -> &DMatrix<S> {
        &self.weight
    }

    /// Dimension of the tracked sub-space.
    pub fn tracked_dim(&self) -> usize {
        self.sub_matrix.nrows()
    }
}

impl<S: RealField + Copy> TimeVarying<S, DVector<S>> for TrackingGradient<S> {
    fn get_object(&self, time: S, gradient: &mut DVector<S>) -> Result<(), TrajectoryError> {
        if gradient.len() != self.selector.ncols() {
            *gradient = DVector::zeros(self.selector.ncols());
        } else {
            gradient.fill(S::zero());
        }

        // Without a desired trajectory the cost only regularizes towards zero.
        let desired = match &self.desired {
            Some(desired) => desired,
            None => return Ok(()),
        };

        let mut point = DVector::zeros(self.tracked_dim());
        if let Err(err) = desired.get_object(time, &mut point) {
            debug!("desired trajectory is invalid at time {:?}: {}", time, err);
            return Err(err);
        }

        if point.len() != self.tracked_dim() {
            return Err(report(
                "TrackingGradient",
                "get_object",
                TrajectoryError::InconsistentDimension {
                    expected: self.tracked_dim(),
                    found: point.len(),
                },
            ));
        }

        gradient.gemv_tr(-S::one(), &self.sub_matrix, &point, S::zero());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    use crate::core::{SampledTrajectory, TimeInvariantVector};

    #[test]
    fn zero_gradient_without_desired_trajectory() {
        let g = TrackingGradient::new(dmatrix![1.0, 0.0, 0.0; 0.0, 0.0, 1.0]);
        let mut out = dvector![5.0];

        g.get_object(3.0, &mut out).unwrap();
        assert_eq!(out, DVector::zeros(3));
    }

    #[test]
    fn gradient_is_negative_weighted_projection() {
        let mut g = TrackingGradient::new(dmatrix![1.0, 0.0, 0.0; 0.0, 0.0, 1.0]);
        g.set_weight(&dmatrix![2.0, 0.0; 0.0, 3.0]).unwrap();
        g.set_desired_trajectory(Arc::new(TimeInvariantVector::new(dvector![1.0, -1.0])));

        let mut out = DVector::zeros(3);
        g.get_object(0.0, &mut out).unwrap();
        assert_abs_diff_eq!(out, dvector![-2.0, 0.0, 3.0], epsilon = 1e-12);
    }

    #[test]
    fn invalid_sample_zeroes_gradient() {
        let mut g = TrackingGradient::new(DMatrix::identity(2, 2));
        let desired = SampledTrajectory::new(vec![0.0, 1.0], vec![dvector![1.0, 1.0]; 2]).unwrap();
        g.set_desired_trajectory(Arc::new(desired));

        let mut out = dvector![7.0, 7.0];
        assert!(g.get_object(2.0, &mut out).is_err());
        assert_eq!(out, DVector::zeros(2));
    }

    #[test]
    fn mismatched_sample_zeroes_gradient() {
        let mut g = TrackingGradient::new(DMatrix::identity(2, 2));
        g.set_desired_trajectory(Arc::new(TimeInvariantVector::new(dvector![1.0, 2.0, 3.0])));

        let mut out = DVector::zeros(2);
        assert!(matches!(
            g.get_object(0.0, &mut out),
            Err(TrajectoryError::InconsistentDimension {
                expected: 2,
                found: 3
            })
        ));
        assert_eq!(out, DVector::zeros(2));
    }

    #[test]
    fn rejected_weight_keeps_previous() {
        let mut g = TrackingGradient::new(DMatrix::<f64>::identity(2, 2));
        assert!(g.set_weight(&DMatrix::identity(3, 3)).is_err());
        assert!(g.set_weight(&DMatrix::zeros(2, 3)).is_err());
        assert_eq!(g.weight(), &DMatrix::identity(2, 2));
        assert_eq!(g.hessian(), DMatrix::identity(2, 2));
    }
}
