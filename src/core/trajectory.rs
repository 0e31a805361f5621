//! Values that can be queried by time.
//!
//! A trajectory is anything that implements [`TimeVarying`]. The simplest one
//! is [`TimeInvariant`] which returns the same object regardless of the time.
//! [`SampledTrajectory`] interpolates between a set of samples and fails for
//! times not covered by them.
//!
//! ```rust
//! use optcore::nalgebra::dvector;
//! use optcore::{TimeInvariantVector, TimeVarying};
//!
//! let point = TimeInvariantVector::new(dvector![1.0, 2.0]);
//!
//! let mut value = dvector![0.0, 0.0];
//! point.get_object(42.0, &mut value).unwrap();
//! assert_eq!(value, dvector![1.0, 2.0]);
//! ```

use std::sync::Arc;

use getset::{CopyGetters, Setters};
use nalgebra::{DMatrix, DVector, RealField};
use num_traits::One;
use thiserror::Error;

/// Error encountered while evaluating a trajectory.
#[derive(Debug, Error)]
pub enum TrajectoryError {
    /// No sample is available for the requested time.
    #[error("time out of range of the trajectory")]
    OutOfRange,
    /// The trajectory has no samples.
    #[error("empty trajectory")]
    Empty,
    /// The stored samples do not have consistent shape.
    #[error("inconsistent dimension (expected {expected}, found {found})")]
    InconsistentDimension {
        /// Expected dimension.
        expected: usize,
        /// Dimension actually encountered.
        found: usize,
    },
    /// Sample times are not finite and strictly increasing.
    #[error("sample times are not finite and strictly increasing")]
    UnorderedSamples,
    /// A custom error specific to the trajectory.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

/// The trait for objects that depend on time.
///
/// The object is written into the buffer provided by the caller. If the
/// evaluation fails, the content of the buffer is unspecified and must not be
/// used.
pub trait TimeVarying<S: RealField + Copy, O> {
    /// Evaluates the object at given time.
    fn get_object(&self, time: S, object: &mut O) -> Result<(), TrajectoryError>;
}

impl<S, O, T> TimeVarying<S, O> for Arc<T>
where
    S: RealField + Copy,
    T: TimeVarying<S, O> + ?Sized,
{
    fn get_object(&self, time: S, object: &mut O) -> Result<(), TrajectoryError> {
        (**self).get_object(time, object)
    }
}

impl<S, O, T> TimeVarying<S, O> for Box<T>
where
    S: RealField + Copy,
    T: TimeVarying<S, O> + ?Sized,
{
    fn get_object(&self, time: S, object: &mut O) -> Result<(), TrajectoryError> {
        (**self).get_object(time, object)
    }
}

/// Vector trajectory that can be shared among several users, possibly
/// evaluated from multiple threads.
pub type SharedTrajectory<S> = Arc<dyn TimeVarying<S, DVector<S>> + Send + Sync>;

/// An object that does not change in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeInvariant<O> {
    object: O,
}

/// Vector that does not change in time.
pub type TimeInvariantVector<S> = TimeInvariant<DVector<S>>;

/// Matrix that does not change in time.
pub type TimeInvariantMatrix<S> = TimeInvariant<DMatrix<S>>;

impl<O> TimeInvariant<O> {
    /// Wraps the object.
    pub fn new(object: O) -> Self {
        Self { object }
    }

    /// Gets the stored object.
    pub fn get(&self) -> &O {
        &self.object
    }

    /// Gets the stored object for modification.
    pub fn get_mut(&mut self) -> &mut O {
        &mut self.object
    }

    /// Replaces the stored object.
    pub fn set(&mut self, object: O) {
        self.object = object;
    }

    /// Unwraps the stored object.
    pub fn into_inner(self) -> O {
        self.object
    }
}

impl<S: RealField + Copy> TimeVarying<S, DVector<S>> for TimeInvariantVector<S> {
    fn get_object(&self, _time: S, object: &mut DVector<S>) -> Result<(), TrajectoryError> {
        object.clone_from(&self.object);
        Ok(())
    }
}

impl<S: RealField + Copy> TimeVarying<S, DMatrix<S>> for TimeInvariantMatrix<S> {
    fn get_object(&self, _time: S, object: &mut DMatrix<S>) -> Result<(), TrajectoryError> {
        object.clone_from(&self.object);
        Ok(())
    }
}

/// Interpolation between two consecutive samples of [`SampledTrajectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Interpolation {
    /// Linear interpolation.
    Linear,
    /// The value of the latest sample not after the requested time.
    Previous,
}

/// Options for [`SampledTrajectory`].
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct SampledTrajectoryOptions {
    /// Interpolation between samples. Default: [`Interpolation::Linear`].
    interpolation: Interpolation,
    /// Whether the first and the last samples are held outside of the sampled
    /// interval instead of failing with [`TrajectoryError::OutOfRange`].
    /// Default: `false`.
    hold_ends: bool,
}

impl Default for SampledTrajectoryOptions {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            hold_ends: false,
        }
    }
}

/// Vector trajectory given by samples at strictly increasing times.
#[derive(Debug, Clone)]
pub struct SampledTrajectory<S: RealField + Copy> {
    times: Vec<S>,
    values: Vec<DVector<S>>,
    options: SampledTrajectoryOptions,
}

impl<S: RealField + Copy> SampledTrajectory<S> {
    /// Creates the trajectory from sample times and corresponding values with
    /// default options.
    pub fn new(times: Vec<S>, values: Vec<DVector<S>>) -> Result<Self, TrajectoryError> {
        Self::with_options(times, values, SampledTrajectoryOptions::default())
    }

    /// Creates the trajectory from sample times and corresponding values with
    /// given options.
    pub fn with_options(
        times: Vec<S>,
        values: Vec<DVector<S>>,
        options: SampledTrajectoryOptions,
    ) -> Result<Self, TrajectoryError> {
        if times.is_empty() {
            return Err(TrajectoryError::Empty);
        }

        if times.len() != values.len() {
            return Err(TrajectoryError::InconsistentDimension {
                expected: times.len(),
                found: values.len(),
            });
        }

        if times.iter().any(|t| !t.is_finite()) || times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TrajectoryError::UnorderedSamples);
        }

        let dim = values[0].len();
        if let Some(value) = values.iter().find(|value| value.len() != dim) {
            return Err(TrajectoryError::InconsistentDimension {
                expected: dim,
                found: value.len(),
            });
        }

        Ok(Self {
            times,
            values,
            options,
        })
    }

    /// Appends a sample. Its time must be finite and after the last sample,
    /// its value must have the same dimension as the others.
    pub fn push(&mut self, time: S, value: DVector<S>) -> Result<(), TrajectoryError> {
        // Construction guarantees at least one sample.
        let last = self.times[self.times.len() - 1];
        if !time.is_finite() || time <= last {
            return Err(TrajectoryError::UnorderedSamples);
        }

        if value.len() != self.dim() {
            return Err(TrajectoryError::InconsistentDimension {
                expected: self.dim(),
                found: value.len(),
            });
        }

        self.times.push(time);
        self.values.push(value);
        Ok(())
    }

    /// Dimension of the sampled values.
    pub fn dim(&self) -> usize {
        self.values[0].len()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Determines whether there are no samples. A constructed trajectory has
    /// at least one.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Times of the samples.
    pub fn times(&self) -> &[S] {
        &self.times
    }

    /// Interval covered by the samples.
    pub fn time_span(&self) -> (S, S) {
        (self.times[0], self.times[self.times.len() - 1])
    }
}

impl<S: RealField + Copy> TimeVarying<S, DVector<S>> for SampledTrajectory<S> {
    fn get_object(&self, time: S, object: &mut DVector<S>) -> Result<(), TrajectoryError> {
        if !time.is_finite() {
            return Err(TrajectoryError::OutOfRange);
        }

        let (first, last) = self.time_span();

        if time < first || time > last {
            if !self.options.hold_ends {
                return Err(TrajectoryError::OutOfRange);
            }

            let held = if time < first {
                &self.values[0]
            } else {
                &self.values[self.values.len() - 1]
            };
            object.clone_from(held);
            return Ok(());
        }

        // Index of the first sample strictly after the time.
        let next = self.times.partition_point(|t| *t <= time);
        if next == self.times.len() {
            object.clone_from(&self.values[next - 1]);
            return Ok(());
        }

        let prev = next - 1;
        object.clone_from(&self.values[prev]);

        if self.options.interpolation == Interpolation::Linear {
            let alpha = (time - self.times[prev]) / (self.times[next] - self.times[prev]);
            object.axpy(alpha, &self.values[next], S::one() - alpha);
        }

        Ok(())
    }
}
