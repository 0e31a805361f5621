//! Testing systems and utilities useful for debugging and smoke testing.
//!
//! [`DoubleIntegrator`] is recommended for first tests, it is linear and
//! provides all optional capabilities. [`Pendulum`] is nonlinear and provides
//! derivatives without sparsity. [`Drift`] provides only the dynamics and
//! relies on the defaults for everything else.

#![allow(unused)]

use approx::abs_diff_eq;
use nalgebra::{dmatrix, dvector, DMatrix, DVector};

use crate::core::{
    DynamicalSystem, DynamicalSystemExt, SparsityPattern, SystemBuffers, SystemError,
};
use crate::derivatives::{ControlJacobian, StateJacobian};

/// Extension of the [`DynamicalSystem`] trait that provides additional
/// information that is useful for testing.
pub trait TestSystem: DynamicalSystem<Scalar = f64> {
    /// Representative states in which the system should be tested.
    fn sample_states(&self) -> Vec<DVector<f64>>;

    /// Tests if the implemented derivatives agree with finite differences in
    /// all sample states, given the tolerance `eps`. Derivatives that are not
    /// implemented are skipped.
    fn derivatives_match(&mut self, time: f64, eps: f64) -> bool
    where
        Self: Sized,
    {
        for x in self.sample_states() {
            let mut x_fd = x.clone();
            let state_fd = match StateJacobian::new(&*self, &mut x_fd, time) {
                Ok(jac) => jac,
                Err(_) => return false,
            };

            match self.state_jacobian(&x, time) {
                Ok(jac) if !abs_diff_eq!(jac, *state_fd, epsilon = eps) => return false,
                Err(SystemError::NotImplemented) | Ok(_) => {}
                Err(_) => return false,
            }

            let control_fd = match ControlJacobian::new(&mut *self, &x, time) {
                Ok(jac) => jac,
                Err(_) => return false,
            };

            match self.control_jacobian(&x, time) {
                Ok(jac) if !abs_diff_eq!(jac, *control_fd, epsilon = eps) => return false,
                Err(SystemError::NotImplemented) | Ok(_) => {}
                Err(_) => return false,
            }
        }

        true
    }
}

fn check_state(n: usize, state: &DVector<f64>) -> Result<(), SystemError> {
    if state.len() != n {
        Err(SystemError::InvalidDimensionality {
            expected: n,
            found: state.len(),
        })
    } else {
        Ok(())
    }
}

/// Point mass moving along a line, driven by acceleration.
///
/// State is position and velocity, control input is acceleration:
///
/// ```text
/// ṗ = v
/// v̇ = a
/// ```
#[derive(Debug, Clone)]
pub struct DoubleIntegrator {
    buffers: SystemBuffers<f64>,
}

impl DoubleIntegrator {
    /// Initializes the system.
    pub fn new() -> Self {
        Self {
            buffers: SystemBuffers::new(2, 1),
        }
    }
}

impl Default for DoubleIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicalSystem for DoubleIntegrator {
    type Scalar = f64;

    fn buffers(&self) -> &SystemBuffers<f64> {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut SystemBuffers<f64> {
        &mut self.buffers
    }

    fn dynamics(
        &self,
        state: &DVector<f64>,
        _time: f64,
        state_dynamics: &mut DVector<f64>,
    ) -> Result<(), SystemError> {
        check_state(2, state)?;
        *state_dynamics = dvector![state[1], self.control_input()[0]];
        Ok(())
    }

    fn dynamics_state_first_derivative(
        &self,
        _state: &DVector<f64>,
        _time: f64,
        derivative: &mut DMatrix<f64>,
    ) -> Result<(), SystemError> {
        *derivative = dmatrix![0.0, 1.0; 0.0, 0.0];
        Ok(())
    }

    fn dynamics_control_first_derivative(
        &self,
        _state: &DVector<f64>,
        _time: f64,
        derivative: &mut DMatrix<f64>,
    ) -> Result<(), SystemError> {
        *derivative = dmatrix![0.0; 1.0];
        Ok(())
    }

    fn dynamics_state_first_derivative_sparsity(&self) -> Option<SparsityPattern> {
        Some([(0, 1)].into_iter().collect())
    }

    fn dynamics_control_first_derivative_sparsity(&self) -> Option<SparsityPattern> {
        Some([(1, 0)].into_iter().collect())
    }
}

impl TestSystem for DoubleIntegrator {
    fn sample_states(&self) -> Vec<DVector<f64>> {
        vec![dvector![0.0, 0.0], dvector![1.0, -1.0], dvector![-100.0, 25.0]]
    }
}

/// Damped pendulum actuated by a torque at the pivot.
///
/// State is angle and angular velocity, control input is the torque:
///
/// ```text
/// θ̇ = ω
/// ω̇ = -(g / l) sin θ - d ω + τ / (m l²)
/// ```
#[derive(Debug, Clone)]
pub struct Pendulum {
    length: f64,
    mass: f64,
    damping: f64,
    buffers: SystemBuffers<f64>,
}

impl Pendulum {
    /// Standard gravity.
    pub const GRAVITY: f64 = 9.81;

    /// Initializes the system with given length, mass and damping
    /// coefficient.
    pub fn new(length: f64, mass: f64, damping: f64) -> Self {
        assert!(length > 0.0, "length must be greater than zero");
        assert!(mass > 0.0, "mass must be greater than zero");
        Self {
            length,
            mass,
            damping,
            buffers: SystemBuffers::new(2, 1),
        }
    }

    fn inertia(&self) -> f64 {
        self.mass * self.length * self.length
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new(1.0, 1.0, 0.0)
    }
}

impl DynamicalSystem for Pendulum {
    type Scalar = f64;

    fn buffers(&self) -> &SystemBuffers<f64> {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut SystemBuffers<f64> {
        &mut self.buffers
    }

    fn dynamics(
        &self,
        state: &DVector<f64>,
        _time: f64,
        state_dynamics: &mut DVector<f64>,
    ) -> Result<(), SystemError> {
        check_state(2, state)?;

        let theta = state[0];
        let omega = state[1];
        let torque = self.control_input()[0];

        *state_dynamics = dvector![
            omega,
            -(Self::GRAVITY / self.length) * theta.sin() - self.damping * omega
                + torque / self.inertia()
        ];
        Ok(())
    }

    fn dynamics_state_first_derivative(
        &self,
        state: &DVector<f64>,
        _time: f64,
        derivative: &mut DMatrix<f64>,
    ) -> Result<(), SystemError> {
        check_state(2, state)?;

        let theta = state[0];
        *derivative = dmatrix![
            0.0, 1.0;
            -(Self::GRAVITY / self.length) * theta.cos(), -self.damping
        ];
        Ok(())
    }

    fn dynamics_control_first_derivative(
        &self,
        _state: &DVector<f64>,
        _time: f64,
        derivative: &mut DMatrix<f64>,
    ) -> Result<(), SystemError> {
        *derivative = dmatrix![0.0; 1.0 / self.inertia()];
        Ok(())
    }
}

impl TestSystem for Pendulum {
    fn sample_states(&self) -> Vec<DVector<f64>> {
        vec![
            dvector![0.0, 0.0],
            dvector![std::f64::consts::FRAC_PI_2, 1.0],
            dvector![3.0, -2.0],
        ]
    }
}

/// System whose state follows the control input, _ẋ = u_.
///
/// It implements only the dynamics, so it can be used to test the default
/// behavior of [`DynamicalSystem`].
#[derive(Debug, Clone)]
pub struct Drift {
    buffers: SystemBuffers<f64>,
}

impl Drift {
    /// Initializes the system with given dimension of both state and control
    /// input.
    pub fn new(n: usize) -> Self {
        Self {
            buffers: SystemBuffers::new(n, n),
        }
    }
}

impl DynamicalSystem for Drift {
    type Scalar = f64;

    fn buffers(&self) -> &SystemBuffers<f64> {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut SystemBuffers<f64> {
        &mut self.buffers
    }

    fn dynamics(
        &self,
        state: &DVector<f64>,
        _time: f64,
        state_dynamics: &mut DVector<f64>,
    ) -> Result<(), SystemError> {
        check_state(self.state_space_size(), state)?;
        state_dynamics.clone_from(self.control_input());
        Ok(())
    }
}

impl TestSystem for Drift {
    fn sample_states(&self) -> Vec<DVector<f64>> {
        vec![DVector::zeros(self.state_space_size())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_integrator_derivatives() {
        let mut f = DoubleIntegrator::new();
        f.set_control_input(&dvector![2.0]).unwrap();
        assert!(f.derivatives_match(0.0, 1e-6));
    }

    #[test]
    fn pendulum_derivatives() {
        let mut f = Pendulum::new(0.8, 1.5, 0.2);
        f.set_control_input(&dvector![-0.3]).unwrap();
        assert!(f.derivatives_match(0.0, 1e-5));
    }

    #[test]
    fn drift_derivatives_are_skipped() {
        let mut f = Drift::new(2);
        assert!(f.derivatives_match(0.0, 1e-6));
    }

    #[test]
    fn sparsity_matches_jacobians() {
        let f = DoubleIntegrator::new();

        for x in f.sample_states() {
            let jac = f.state_jacobian(&x, 0.0).unwrap();
            assert_eq!(
                SparsityPattern::from_nonzeros(&jac),
                f.dynamics_state_first_derivative_sparsity().unwrap()
            );

            let jac = f.control_jacobian(&x, 0.0).unwrap();
            assert_eq!(
                SparsityPattern::from_nonzeros(&jac),
                f.dynamics_control_first_derivative_sparsity().unwrap()
            );
        }
    }
}
