#![allow(clippy::many_single_char_names)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # Optcore
//!
//! Building blocks for formulating continuous-time optimal control problems
//! in Rust: dynamical systems, time-varying data and quadratic costs.
//!
//! The library does not solve anything by itself. It provides the interfaces
//! and evaluation machinery that a transcription method or a trajectory
//! optimizer consumes, so that the problem can be described once and handed
//! over to any solver built on top of these traits.
//!
//! ## Problem
//!
//! The optimal control problem is about finding a control input _u(t)_ that
//! steers a system
//!
//! ```text
//! ẋ = f(x, u, t),   x(t0) = x0
//! ```
//!
//! while minimizing the integral of a running cost _l(x, u, t)_. The system is
//! any type that implements the [`DynamicalSystem`] trait, the running cost is
//! any type that implements the [`Cost`] trait.
//!
//! ```rust
//! use optcore::nalgebra as na;
//! use optcore::{DynamicalSystem, SystemBuffers, SystemError};
//! use na::{dvector, DVector};
//!
//! // Point mass moving along a line, driven by acceleration.
//! struct Cart {
//!     buffers: SystemBuffers<f64>,
//! }
//!
//! impl DynamicalSystem for Cart {
//!     // The numeric type. Usually f64 or f32.
//!     type Scalar = f64;
//!
//!     // Storage for the initial state and the control input.
//!     fn buffers(&self) -> &SystemBuffers<f64> {
//!         &self.buffers
//!     }
//!
//!     fn buffers_mut(&mut self) -> &mut SystemBuffers<f64> {
//!         &mut self.buffers
//!     }
//!
//!     // Evaluate the state derivative using the stored control input.
//!     fn dynamics(
//!         &self,
//!         state: &DVector<f64>,
//!         _time: f64,
//!         state_dynamics: &mut DVector<f64>,
//!     ) -> Result<(), SystemError> {
//!         *state_dynamics = dvector![state[1], self.control_input()[0]];
//!         Ok(())
//!     }
//! }
//! ```
//!
//! And that's it. The derivatives of the dynamics are optional, when they are
//! not provided, the [finite
//! difference](https://en.wikipedia.org/wiki/Finite_difference_method)
//! approximations from [`derivatives`] can be used instead.
//!
//! ## Costs
//!
//! The [`L2NormCost`](costs::L2NormCost) penalizes the weighted squared
//! distance of selected state and control components from a desired point or
//! trajectory.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use optcore::costs::L2NormCost;
//! use optcore::nalgebra::{dmatrix, dvector, DVector};
//! use optcore::{Cost, SampledTrajectory};
//!
//! let mut cost = L2NormCost::new("tracking", 2, 1);
//! cost.set_state_weight(&dmatrix![10.0, 0.0; 0.0, 1.0]).unwrap();
//!
//! // Move the position from 0 to 1 during one second.
//! let reference = SampledTrajectory::new(
//!     vec![0.0, 1.0],
//!     vec![dvector![0.0, 1.0], dvector![1.0, 1.0]],
//! )
//! .unwrap();
//! cost.set_state_desired_trajectory(Arc::new(reference)).unwrap();
//!
//! let state = dvector![0.2, 0.8];
//! let control = dvector![0.0];
//! let mut gradient = DVector::zeros(2);
//!
//! cost.state_gradient(0.5, &state, &control, &mut gradient).unwrap();
//! println!("value = {}", cost.value(0.5, &state, &control).unwrap());
//! println!("gradient = {}", gradient);
//! ```
//!
//! ## Logging
//!
//! Invalid configuration (wrong dimensions, disabled cost portions) is
//! reported through the [`log`](https://docs.rs/log) facade on the `error`
//! level, in addition to the returned error. Failures of desired trajectories
//! during evaluation are logged on the `debug` level.
//!
//! ## License
//!
//! Licensed under MIT.

mod core;
pub mod costs;
pub mod derivatives;
mod report;

pub use core::*;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
