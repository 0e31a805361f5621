//! Abstractions and types for defining continuous-time dynamical systems.
//!
//! # Defining a system
//!
//! A system is any type that implements [`DynamicalSystem`] trait. It computes
//! the state derivative _ẋ = f(t, x)_. The control input is not an argument of
//! the dynamics, it is set separately with
//! [`set_control_input`](DynamicalSystem::set_control_input) and stored in
//! [`SystemBuffers`] which every system embeds. This way the same system can
//! be integrated as an autonomous system or driven by a controller.
//!
//! ```rust
//! use optcore::nalgebra::{DVector, dvector};
//! use optcore::{DynamicalSystem, SystemBuffers, SystemError};
//!
//! // First-order lag ẋ = (u - x) / tau.
//! struct Lag {
//!     tau: f64,
//!     buffers: SystemBuffers<f64>,
//! }
//!
//! impl DynamicalSystem for Lag {
//!     type Scalar = f64;
//!
//!     fn buffers(&self) -> &SystemBuffers<f64> {
//!         &self.buffers
//!     }
//!
//!     fn buffers_mut(&mut self) -> &mut SystemBuffers<f64> {
//!         &mut self.buffers
//!     }
//!
//!     fn dynamics(
//!         &self,
//!         state: &DVector<f64>,
//!         _time: f64,
//!         state_dynamics: &mut DVector<f64>,
//!     ) -> Result<(), SystemError> {
//!         state_dynamics[0] = (self.control_input()[0] - state[0]) / self.tau;
//!         Ok(())
//!     }
//! }
//!
//! let mut lag = Lag { tau: 2.0, buffers: SystemBuffers::new(1, 1) };
//! lag.set_control_input(&dvector![1.0]).unwrap();
//!
//! let mut xdot = dvector![0.0];
//! lag.dynamics(&dvector![0.0], 0.0, &mut xdot).unwrap();
//! assert_eq!(xdot, dvector![0.5]);
//! ```

use getset::{CopyGetters, Getters};
use nalgebra::{DMatrix, DVector, RealField};
use thiserror::Error;

use super::sparsity::SparsityPattern;
use crate::report::report;

/// Error encountered while working with a dynamical system.
#[derive(Debug, Error)]
pub enum SystemError {
    /// The size of a vector or matrix does not match the dimensions of the
    /// system.
    #[error("invalid dimensionality (expected {expected}, found {found})")]
    InvalidDimensionality {
        /// Expected size.
        expected: usize,
        /// Size actually given.
        found: usize,
    },
    /// Index out of range of a buffer.
    #[error("index {index} out of range for size {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Size of the buffer.
        len: usize,
    },
    /// The capability (derivative, sparsity) is not provided by the system.
    #[error("not implemented")]
    NotImplemented,
    /// A custom error specific to the system.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

/// Storage of the initial state and the control input of a dynamical system.
///
/// The dimensions are fixed at construction. Both buffers are initialized with
/// zeros and can only be replaced by vectors of the matching size.
#[derive(Debug, Clone, CopyGetters, Getters)]
pub struct SystemBuffers<S: RealField + Copy> {
    /// Dimension of the state space.
    #[getset(get_copy = "pub")]
    state_space_size: usize,
    /// Dimension of the control space.
    #[getset(get_copy = "pub")]
    control_space_size: usize,
    /// The initial state.
    #[getset(get = "pub")]
    initial_state: DVector<S>,
    /// The control input.
    #[getset(get = "pub")]
    control_input: DVector<S>,
}

impl<S: RealField + Copy> SystemBuffers<S> {
    /// Creates zero-initialized buffers for given dimensions.
    pub fn new(state_space_size: usize, control_space_size: usize) -> Self {
        Self {
            state_space_size,
            control_space_size,
            initial_state: DVector::zeros(state_space_size),
            control_input: DVector::zeros(control_space_size),
        }
    }

    /// Replaces the initial state. Fails if the size does not match the state
    /// space dimension, in which case the buffer is left untouched.
    pub fn set_initial_state(&mut self, state: &DVector<S>) -> Result<(), SystemError> {
        if state.len() != self.state_space_size {
            return Err(report(
                "DynamicalSystem",
                "set_initial_state",
                SystemError::InvalidDimensionality {
                    expected: self.state_space_size,
                    found: state.len(),
                },
            ));
        }

        self.initial_state.copy_from(state);
        Ok(())
    }

    /// Gets a single element of the initial state.
    pub fn initial_state_at(&self, index: usize) -> Result<S, SystemError> {
        checked_get("initial_state_at", &self.initial_state, index)
    }

    /// Replaces the control input. Fails if the size does not match the
    /// control space dimension, in which case the buffer is left untouched.
    pub fn set_control_input(&mut self, control: &DVector<S>) -> Result<(), SystemError> {
        if control.len() != self.control_space_size {
            return Err(report(
                "DynamicalSystem",
                "set_control_input",
                SystemError::InvalidDimensionality {
                    expected: self.control_space_size,
                    found: control.len(),
                },
            ));
        }

        self.control_input.copy_from(control);
        Ok(())
    }

    /// Gets a single element of the control input.
    pub fn control_input_at(&self, index: usize) -> Result<S, SystemError> {
        checked_get("control_input_at", &self.control_input, index)
    }
}

fn checked_get<S: RealField + Copy>(
    operation: &str,
    buffer: &DVector<S>,
    index: usize,
) -> Result<S, SystemError> {
    buffer.get(index).copied().ok_or_else(|| {
        report(
            "DynamicalSystem",
            operation,
            SystemError::IndexOutOfRange {
                index,
                len: buffer.len(),
            },
        )
    })
}

/// The trait for defining continuous-time dynamical systems.
///
/// Only [`dynamics`](DynamicalSystem::dynamics) and the access to the
/// [`SystemBuffers`] are required. The buffer accessors have default
/// implementations that rarely need to be overridden. The derivatives and
/// their sparsity patterns are optional; if not provided, they report
/// [`SystemError::NotImplemented`] and `None`, respectively.
pub trait DynamicalSystem {
    /// Type of the scalar, usually f32 or f64.
    type Scalar: RealField + Copy;

    /// Access to the stored initial state and control input.
    fn buffers(&self) -> &SystemBuffers<Self::Scalar>;

    /// Mutable access to the stored initial state and control input.
    ///
    /// The dimensions of the system are those of the buffers, so the buffers
    /// must only be modified through their size-checked setters and never
    /// replaced as a whole. Callers should prefer
    /// [`set_initial_state`](DynamicalSystem::set_initial_state) and
    /// [`set_control_input`](DynamicalSystem::set_control_input).
    fn buffers_mut(&mut self) -> &mut SystemBuffers<Self::Scalar>;

    /// Computes the state derivative in given state and time, using the
    /// control input currently stored in the buffers.
    ///
    /// If an error is returned, the content of `state_dynamics` is unspecified
    /// and the step must be considered invalid.
    fn dynamics(
        &self,
        state: &DVector<Self::Scalar>,
        time: Self::Scalar,
        state_dynamics: &mut DVector<Self::Scalar>,
    ) -> Result<(), SystemError>;

    /// Dimension of the state space.
    fn state_space_size(&self) -> usize {
        self.buffers().state_space_size()
    }

    /// Dimension of the control space.
    fn control_space_size(&self) -> usize {
        self.buffers().control_space_size()
    }

    /// Sets the control input used by subsequent evaluations of the dynamics.
    fn set_control_input(&mut self, control: &DVector<Self::Scalar>) -> Result<(), SystemError> {
        self.buffers_mut().set_control_input(control)
    }

    /// Gets the current control input.
    fn control_input(&self) -> &DVector<Self::Scalar> {
        self.buffers().control_input()
    }

    /// Gets a single element of the current control input.
    fn control_input_at(&self, index: usize) -> Result<Self::Scalar, SystemError> {
        self.buffers().control_input_at(index)
    }

    /// Sets the initial state.
    fn set_initial_state(&mut self, state: &DVector<Self::Scalar>) -> Result<(), SystemError> {
        self.buffers_mut().set_initial_state(state)
    }

    /// Gets the initial state.
    fn initial_state(&self) -> &DVector<Self::Scalar> {
        self.buffers().initial_state()
    }

    /// Gets a single element of the initial state.
    fn initial_state_at(&self, index: usize) -> Result<Self::Scalar, SystemError> {
        self.buffers().initial_state_at(index)
    }

    /// Computes the partial derivative of the dynamics with respect to the
    /// state. The output is a square matrix of the state space dimension.
    fn dynamics_state_first_derivative(
        &self,
        _state: &DVector<Self::Scalar>,
        _time: Self::Scalar,
        _derivative: &mut DMatrix<Self::Scalar>,
    ) -> Result<(), SystemError> {
        Err(SystemError::NotImplemented)
    }

    /// Computes the partial derivative of the dynamics with respect to the
    /// control input. The output has as many rows as the state space
    /// dimension and as many columns as the control space dimension.
    fn dynamics_control_first_derivative(
        &self,
        _state: &DVector<Self::Scalar>,
        _time: Self::Scalar,
        _derivative: &mut DMatrix<Self::Scalar>,
    ) -> Result<(), SystemError> {
        Err(SystemError::NotImplemented)
    }

    /// Nonzero entries of the state derivative, if known.
    fn dynamics_state_first_derivative_sparsity(&self) -> Option<SparsityPattern> {
        None
    }

    /// Nonzero entries of the control derivative, if known.
    fn dynamics_control_first_derivative_sparsity(&self) -> Option<SparsityPattern> {
        None
    }
}

/// Some extensions methods for the [`DynamicalSystem`] that may be found
/// useful.
///
/// They allocate the output and check the dimensions of both the input and
/// the output, which a hand-written implementation may get wrong.
pub trait DynamicalSystemExt: DynamicalSystem {
    /// Computes the state derivative.
    fn eval_dynamics(
        &self,
        state: &DVector<Self::Scalar>,
        time: Self::Scalar,
    ) -> Result<DVector<Self::Scalar>, SystemError>;

    /// Computes the partial derivative of the dynamics with respect to the
    /// state.
    fn state_jacobian(
        &self,
        state: &DVector<Self::Scalar>,
        time: Self::Scalar,
    ) -> Result<DMatrix<Self::Scalar>, SystemError>;

    /// Computes the partial derivative of the dynamics with respect to the
    /// control input.
    fn control_jacobian(
        &self,
        state: &DVector<Self::Scalar>,
        time: Self::Scalar,
    ) -> Result<DMatrix<Self::Scalar>, SystemError>;
}

impl<F: DynamicalSystem> DynamicalSystemExt for F {
    fn eval_dynamics(
        &self,
        state: &DVector<F::Scalar>,
        time: F::Scalar,
    ) -> Result<DVector<F::Scalar>, SystemError> {
        let n = self.state_space_size();
        check_dim("eval_dynamics", n, state.len())?;

        let mut state_dynamics = DVector::zeros(n);
        self.dynamics(state, time, &mut state_dynamics)?;
        check_dim("eval_dynamics", n, state_dynamics.len())?;

        Ok(state_dynamics)
    }

    fn state_jacobian(
        &self,
        state: &DVector<F::Scalar>,
        time: F::Scalar,
    ) -> Result<DMatrix<F::Scalar>, SystemError> {
        let n = self.state_space_size();
        check_dim("state_jacobian", n, state.len())?;

        let mut jac = DMatrix::zeros(n, n);
        self.dynamics_state_first_derivative(state, time, &mut jac)?;
        check_dim("state_jacobian", n, jac.nrows())?;
        check_dim("state_jacobian", n, jac.ncols())?;

        Ok(jac)
    }

    fn control_jacobian(
        &self,
        state: &DVector<F::Scalar>,
        time: F::Scalar,
    ) -> Result<DMatrix<F::Scalar>, SystemError> {
        let n = self.state_space_size();
        let m = self.control_space_size();
        check_dim("control_jacobian", n, state.len())?;

        let mut jac = DMatrix::zeros(n, m);
        self.dynamics_control_first_derivative(state, time, &mut jac)?;
        check_dim("control_jacobian", n, jac.nrows())?;
        check_dim("control_jacobian", m, jac.ncols())?;

        Ok(jac)
    }
}

fn check_dim(operation: &str, expected: usize, found: usize) -> Result<(), SystemError> {
    if expected != found {
        Err(report(
            "DynamicalSystem",
            operation,
            SystemError::InvalidDimensionality { expected, found },
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{DoubleIntegrator, Drift};

    use nalgebra::{dmatrix, dvector};

    #[test]
    fn buffers_are_zero_initialized() {
        let f = Drift::new(3);
        assert_eq!(f.state_space_size(), 3);
        assert_eq!(f.control_space_size(), 3);
        assert_eq!(f.initial_state(), &DVector::zeros(3));
        assert_eq!(f.control_input(), &DVector::zeros(3));
    }

    #[test]
    fn initial_state_size_mismatch_is_rejected() {
        let mut f = Drift::new(3);
        assert!(matches!(
            f.set_initial_state(&dvector![1.0, 2.0]),
            Err(SystemError::InvalidDimensionality {
                expected: 3,
                found: 2
            })
        ));
        assert_eq!(f.initial_state(), &DVector::zeros(3));

        f.set_initial_state(&dvector![1.0, 2.0, 3.0]).unwrap();
        assert!(f.set_initial_state(&DVector::zeros(4)).is_err());
        assert_eq!(f.initial_state(), &dvector![1.0, 2.0, 3.0]);
    }

    #[test]
    fn buffer_setters_keep_dimensions() {
        let mut f = DoubleIntegrator::new();

        assert!(f.buffers_mut().set_control_input(&dvector![1.0, 2.0]).is_err());
        assert!(f.buffers_mut().set_initial_state(&dvector![1.0]).is_err());
        f.buffers_mut().set_initial_state(&dvector![1.0, 2.0]).unwrap();

        assert_eq!(f.state_space_size(), 2);
        assert_eq!(f.control_space_size(), 1);
        assert_eq!(f.buffers().initial_state(), &dvector![1.0, 2.0]);
    }

    #[test]
    fn control_input_size_mismatch_is_rejected() {
        let mut f = DoubleIntegrator::new();
        f.set_control_input(&dvector![2.0]).unwrap();
        assert!(f.set_control_input(&dvector![1.0, 1.0]).is_err());
        assert_eq!(f.control_input(), &dvector![2.0]);
    }

    #[test]
    fn indexed_access_is_checked() {
        let mut f = DoubleIntegrator::new();
        f.set_initial_state(&dvector![4.0, 5.0]).unwrap();

        assert_eq!(f.initial_state_at(1).unwrap(), 5.0);
        assert!(matches!(
            f.initial_state_at(2),
            Err(SystemError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert_eq!(f.control_input_at(0).unwrap(), 0.0);
        assert!(f.control_input_at(1).is_err());
    }

    #[test]
    fn derivatives_not_implemented_by_default() {
        let f = Drift::new(2);
        let x = dvector![1.0, 1.0];
        let mut jac = DMatrix::zeros(2, 2);

        assert!(matches!(
            f.dynamics_state_first_derivative(&x, 0.0, &mut jac),
            Err(SystemError::NotImplemented)
        ));
        assert!(matches!(
            f.dynamics_control_first_derivative(&x, 0.0, &mut jac),
            Err(SystemError::NotImplemented)
        ));
        assert!(f.dynamics_state_first_derivative_sparsity().is_none());
        assert!(f.dynamics_control_first_derivative_sparsity().is_none());
    }

    #[test]
    fn extension_checks_dimensions() {
        let f = DoubleIntegrator::new();

        assert!(matches!(
            f.eval_dynamics(&dvector![1.0], 0.0),
            Err(SystemError::InvalidDimensionality {
                expected: 2,
                found: 1
            })
        ));

        let jac = f.state_jacobian(&dvector![1.0, 2.0], 0.0).unwrap();
        assert_eq!(jac, dmatrix![0.0, 1.0; 0.0, 0.0]);

        let jac = f.control_jacobian(&dvector![1.0, 2.0], 0.0).unwrap();
        assert_eq!(jac, dmatrix![0.0; 1.0]);
    }

    #[test]
    fn dynamics_uses_stored_control() {
        let mut f = DoubleIntegrator::new();
        f.set_control_input(&dvector![-3.0]).unwrap();

        let xdot = f.eval_dynamics(&dvector![0.0, 2.0], 1.0).unwrap();
        assert_eq!(xdot, dvector![2.0, -3.0]);
    }
}
