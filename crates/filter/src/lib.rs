//! Linear Kalman filter over a 6-dimensional state `(dx, dy, vx, vy, a, b)`: relative
//! position, relative velocity, and the two semi-axes of a tracked object's fitted
//! ellipse/rectangle. Measurements are 4-dimensional, `(dx, dy, a, b)` — position and
//! shape only, no direct velocity observation.
//!
//! Generalized from `IntelligentRoboticsLab-yggdrasil`'s `UnscentedKalmanFilter`: this
//! pipeline's state transform is exactly linear (position plus a `Δt`-scaled velocity
//! term), so the sigma-point machinery has no counterpart here. What carries over is the
//! teacher's `nalgebra` const-generic matrix types, its `thiserror`-derived error enum,
//! and its Joseph-form covariance update.

use std::time::Instant;

use nalgebra::{SMatrix, SVector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("innovation covariance is not invertible")]
    Inversion,
}

pub type Result<T> = std::result::Result<T, Error>;

pub const STATE_DIM: usize = 6;
pub const MEASUREMENT_DIM: usize = 4;

pub type State = SVector<f32, STATE_DIM>;
pub type Measurement = SVector<f32, MEASUREMENT_DIM>;
pub type StateCovariance = SMatrix<f32, STATE_DIM, STATE_DIM>;
pub type MeasurementProjection = SMatrix<f32, MEASUREMENT_DIM, STATE_DIM>;
pub type MeasurementCovariance = SMatrix<f32, MEASUREMENT_DIM, MEASUREMENT_DIM>;

/// Tracks a single ball or goal's position/shape over time.
///
/// `predict` and `update` mirror the two-phase contract of the original tracker: the
/// state stays `None` until the first [`KalmanFilter::update`], and [`KalmanFilter::predict`]
/// is a no-op (returns `None`) until both a previous `predict` timestamp and a state
/// exist to propagate.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    f: StateCovariance,
    h: MeasurementProjection,
    q: StateCovariance,
    r: MeasurementCovariance,
    p: StateCovariance,
    x: Option<State>,
    last_predict: Option<Instant>,
}

impl KalmanFilter {
    /// Builds a filter with this pipeline's fixed process/measurement noise: positional
    /// drift dominates process noise, and measurement noise is a flat `1e-3` across all
    /// four observed channels.
    #[must_use]
    pub fn new() -> Self {
        let f = StateCovariance::identity();

        let mut h = MeasurementProjection::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;
        h[(2, 4)] = 1.0;
        h[(3, 5)] = 1.0;

        let q = StateCovariance::from_diagonal(&State::new(1e-3, 1e-2, 1e-2, 1e-2, 1e-2, 1e-3));
        let r = MeasurementCovariance::identity() * 1e-3;

        Self {
            f,
            h,
            q,
            r,
            p: StateCovariance::zeros(),
            x: None,
            last_predict: None,
        }
    }

    /// The current state estimate, or `None` before the first [`KalmanFilter::update`].
    #[must_use]
    pub fn state(&self) -> Option<State> {
        self.x
    }

    /// Advances the state by the elapsed time since the previous `predict` call.
    ///
    /// Returns `None` on the very first call (there is no previous timestamp to derive
    /// `Δt` from) and any time no measurement has been applied yet (there is no state to
    /// propagate), rather than panicking or silently propagating a zero state.
    pub fn predict(&mut self) -> Option<State> {
        let now = Instant::now();
        let last = self.last_predict.replace(now)?;
        let x = self.x?;

        let dt = (now - last).as_secs_f32();
        self.f[(0, 2)] = dt;
        self.f[(1, 3)] = dt;

        let x = self.f * x;
        self.p = self.f * self.p * self.f.transpose() + self.q;
        self.x = Some(x);

        Some(x)
    }

    /// Incorporates a measurement `(dx, dy, a, b)` using a standard Kalman update with a
    /// Joseph-form covariance update (numerically stable under measurement-noise
    /// mis-specification, which the wildly varying contour quality here can produce).
    ///
    /// On the first call the state is bootstrapped directly from the measurement with
    /// zero velocity, matching the original tracker's `x = [z0, z1, 0, 0, z2, z3]` seed.
    /// `P` is left at zero through this call — it was constructed as zeros and nothing
    /// resets it, matching the original tracker (`kalman.py`'s `if self.P is None` guard
    /// is dead code there too, since `P` is always a zero matrix, never `None`).
    pub fn update(&mut self, measurement: Measurement) -> Result<State> {
        let x = self.x.unwrap_or_else(|| {
            State::new(measurement[0], measurement[1], 0.0, 0.0, measurement[2], measurement[3])
        });

        let innovation = measurement - self.h * x;
        let s = self.r + self.h * self.p * self.h.transpose();
        let s_inv = s.try_inverse().ok_or(Error::Inversion)?;
        let k = self.p * self.h.transpose() * s_inv;

        let x = x + k * innovation;

        let i = StateCovariance::identity();
        let i_kh = i - k * self.h;
        self.p = i_kh * self.p * i_kh.transpose() + k * self.r * k.transpose();
        self.x = Some(x);

        Ok(x)
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::Duration;

    use super::*;

    #[test]
    fn predict_is_none_before_any_update() {
        let mut filter = KalmanFilter::new();
        assert!(filter.predict().is_none(), "first predict always lacks a dt baseline");
        assert!(filter.predict().is_none(), "still no state to propagate");
    }

    #[test]
    fn update_bootstraps_state_with_zero_velocity() {
        let mut filter = KalmanFilter::new();
        let state = filter.update(Measurement::new(10.0, -5.0, 2.0, 3.0)).unwrap();

        assert_eq!(state[0], 10.0);
        assert_eq!(state[1], -5.0);
        assert_eq!(state[2], 0.0);
        assert_eq!(state[3], 0.0);
        assert_eq!(state[4], 2.0);
        assert_eq!(state[5], 3.0);
    }

    #[test]
    fn predict_requires_a_prior_predict_call_once_state_exists() {
        let mut filter = KalmanFilter::new();
        filter.update(Measurement::new(0.0, 0.0, 1.0, 1.0)).unwrap();

        // The first predict after the first update still has no dt baseline.
        assert!(filter.predict().is_none());

        sleep(Duration::from_millis(5));
        let state = filter.predict().expect("state and dt baseline both exist now");
        assert_eq!(state[0], 0.0);
    }

    #[test]
    fn repeated_predict_update_cycles_pull_state_toward_the_measurement() {
        // `P` starts at zero and only grows via `Q` in `predict`, so a realistic
        // tick — predict, then update — is required for the gain to become nonzero;
        // back-to-back `update` calls with no intervening `predict` can never converge.
        let mut filter = KalmanFilter::new();
        filter.update(Measurement::new(0.0, 0.0, 5.0, 5.0)).unwrap();

        for _ in 0..20 {
            sleep(Duration::from_millis(5));
            filter.predict();
            filter.update(Measurement::new(100.0, 50.0, 5.0, 5.0)).unwrap();
        }

        let state = filter.state().unwrap();
        assert!((state[0] - 100.0).abs() < 1.0, "dx should converge near 100, got {}", state[0]);
        assert!((state[1] - 50.0).abs() < 1.0, "dy should converge near 50, got {}", state[1]);
    }

    #[test]
    fn covariance_stays_symmetric() {
        let mut filter = KalmanFilter::new();
        filter.update(Measurement::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        filter.update(Measurement::new(1.5, 2.5, 3.0, 4.0)).unwrap();

        let asymmetry = (filter.p - filter.p.transpose()).abs().max();
        assert!(asymmetry < 1e-4, "covariance should stay symmetric, max asymmetry {asymmetry}");
    }
}
