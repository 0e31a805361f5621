//! Abstractions and types for defining costs of optimal control problems.
//!
//! A cost is a scalar function _l(t, x, u)_ of time, state and control input.
//! Solvers evaluate its value together with the first and second partial
//! derivatives. Every method takes the time, the state and the control and
//! writes its output into a buffer provided by the caller, which is resized if
//! necessary.

use std::fmt;

use nalgebra::{DMatrix, DVector, RealField};
use thiserror::Error;

use super::{sparsity::SparsityPattern, trajectory::TrajectoryError};

/// Part of the cost that depends on either the state or the control input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portion {
    /// The part depending on the state.
    State,
    /// The part depending on the control input.
    Control,
}

impl fmt::Display for Portion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Portion::State => f.write_str("state"),
            Portion::Control => f.write_str("control"),
        }
    }
}

/// Error encountered while configuring or evaluating a cost.
#[derive(Debug, Error)]
pub enum CostError {
    /// The weight matrix is not square.
    #[error("weight matrix is not square ({rows}x{cols})")]
    NonSquareWeight {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },
    /// The weight matrix dimension does not match the number of rows of the
    /// selector.
    #[error("weight matrix dimension does not match the selector (expected {expected}, found {found})")]
    WeightDimensionMismatch {
        /// Number of rows of the selector.
        expected: usize,
        /// Dimension of the weight matrix.
        found: usize,
    },
    /// The portion of the cost has been deactivated given the provided
    /// selectors.
    #[error("{0} cost portion is disabled")]
    DisabledPortion(Portion),
    /// The desired point size does not match the number of rows of the
    /// selector.
    #[error("desired point size does not match the selector (expected {expected}, found {found})")]
    DesiredPointDimensionMismatch {
        /// Number of rows of the selector.
        expected: usize,
        /// Size of the desired point.
        found: usize,
    },
    /// The size of the state, the control input or an evaluated term does not
    /// match the dimension of the cost.
    #[error("invalid dimensionality (expected {expected}, found {found})")]
    InvalidDimensionality {
        /// Expected size.
        expected: usize,
        /// Size actually encountered.
        found: usize,
    },
    /// The evaluation is not provided by the cost.
    #[error("not implemented")]
    NotImplemented,
    /// Evaluation of a time-varying term failed.
    #[error("{0}")]
    Trajectory(#[from] TrajectoryError),
}

/// The trait for defining costs.
///
/// Value and gradients are required. Second derivatives are optional and
/// report [`CostError::NotImplemented`] unless overridden, their sparsity
/// patterns are `None` (unknown) unless overridden.
///
/// If a method returns an error, the output buffer must not be used.
pub trait Cost {
    /// Type of the scalar, usually f32 or f64.
    type Scalar: RealField + Copy;

    /// Name of the cost.
    fn name(&self) -> &str;

    /// Computes the cost value.
    fn value(
        &self,
        time: Self::Scalar,
        state: &DVector<Self::Scalar>,
        control: &DVector<Self::Scalar>,
    ) -> Result<Self::Scalar, CostError>;

    /// Computes the partial derivative with respect to the state.
    fn state_gradient(
        &self,
        time: Self::Scalar,
        state: &DVector<Self::Scalar>,
        control: &DVector<Self::Scalar>,
        gradient: &mut DVector<Self::Scalar>,
    ) -> Result<(), CostError>;

    /// Computes the partial derivative with respect to the control input.
    fn control_gradient(
        &self,
        time: Self::Scalar,
        state: &DVector<Self::Scalar>,
        control: &DVector<Self::Scalar>,
        gradient: &mut DVector<Self::Scalar>,
    ) -> Result<(), CostError>;

    /// Computes the second partial derivative with respect to the state.
    fn state_hessian(
        &self,
        _time: Self::Scalar,
        _state: &DVector<Self::Scalar>,
        _control: &DVector<Self::Scalar>,
        _hessian: &mut DMatrix<Self::Scalar>,
    ) -> Result<(), CostError> {
        Err(CostError::NotImplemented)
    }

    /// Computes the second partial derivative with respect to the control
    /// input.
    fn control_hessian(
        &self,
        _time: Self::Scalar,
        _state: &DVector<Self::Scalar>,
        _control: &DVector<Self::Scalar>,
        _hessian: &mut DMatrix<Self::Scalar>,
    ) -> Result<(), CostError> {
        Err(CostError::NotImplemented)
    }

    /// Computes the mixed second partial derivative, first with respect to the
    /// state and then with respect to the control input. The output has as
    /// many rows as the state and as many columns as the control input.
    fn state_control_hessian(
        &self,
        _time: Self::Scalar,
        _state: &DVector<Self::Scalar>,
        _control: &DVector<Self::Scalar>,
        _hessian: &mut DMatrix<Self::Scalar>,
    ) -> Result<(), CostError> {
        Err(CostError::NotImplemented)
    }

    /// Nonzero entries of the state Hessian, if known.
    fn state_hessian_sparsity(&self) -> Option<SparsityPattern> {
        None
    }

    /// Nonzero entries of the control Hessian, if known.
    fn control_hessian_sparsity(&self) -> Option<SparsityPattern> {
        None
    }

    /// Nonzero entries of the mixed Hessian, if known.
    fn state_control_hessian_sparsity(&self) -> Option<SparsityPattern> {
        None
    }
}
