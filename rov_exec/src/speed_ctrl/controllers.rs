//! # Speed controllers
//!
//! This module provides the PID controller used to regulate the rover's speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller operating on a measured value.
///
/// Unlike a textbook PID the derivative term is taken on the measurement rather than on the
/// error, so a step in the set point does not produce a derivative spike. The integral is an
/// unbounded running sum of the error, there is no anti-windup, so [`PidController::reset`]
/// must be called whenever the control objective changes discontinuously.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// The value the controller is driving the measurement towards
    set_point: f64,

    /// The integral accumulation
    integral: f64,

    /// Measurement passed to the previous update
    prev_measurement: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            set_point: 0f64,
            integral: 0f64,
            prev_measurement: 0f64
        }
    }

    /// Set the value the controller should drive the measurement towards.
    ///
    /// No validation is performed on the target.
    pub fn set_desired(&mut self, target: f64) {
        self.set_point = target;
    }

    /// The current set point.
    pub fn desired(&self) -> f64 {
        self.set_point
    }

    /// Clear the accumulated history and the set point.
    ///
    /// After a reset the controller behaves exactly like a newly constructed one.
    pub fn reset(&mut self) {
        self.set_point = 0f64;
        self.integral = 0f64;
        self.prev_measurement = 0f64;
    }

    /// Get the control output for the given measurement.
    ///
    /// A non-finite measurement produces a non-finite output, which the caller must treat as
    /// invalid.
    pub fn update(&mut self, measurement: f64) -> f64 {
        let error = self.set_point - measurement;

        self.integral += error;

        // Derivative on measurement
        let deriv = self.prev_measurement - measurement;
        self.prev_measurement = measurement;

        self.k_p * error 
            + self.k_i * self.integral 
            + self.k_d * deriv
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Run the measurement history through the controller and return the outputs.
    fn run(pid: &mut PidController, measurements: &[f64]) -> Vec<f64> {
        measurements.iter().map(|&m| pid.update(m)).collect()
    }

    #[test]
    fn test_terms() {
        let mut pid = PidController::new(2.0, 0.5, 0.25);
        pid.set_desired(5.0);

        // error 5, integral 5, deriv 0
        assert_eq!(pid.update(0.0), 2.0 * 5.0 + 0.5 * 5.0 + 0.25 * 0.0);

        // error 4, integral 9, deriv 0 - 1 = -1
        assert_eq!(pid.update(1.0), 2.0 * 4.0 + 0.5 * 9.0 + 0.25 * -1.0);
    }

    #[test]
    fn test_derivative_on_measurement() {
        let mut pid = PidController::new(0.0, 0.0, 1.0);
        pid.update(2.0);

        // Changing the set point alone does not change the derivative term
        pid.set_desired(100.0);
        assert_eq!(pid.update(2.0), 0.0);
        assert_eq!(pid.update(3.0), -1.0);
    }

    #[test]
    fn test_integral_unbounded() {
        let mut pid = PidController::new(0.0, 1.0, 0.0);
        pid.set_desired(1.0);

        let out = run(&mut pid, &[0.0; 1000]);

        assert_eq!(out[999], 1000.0);
    }

    #[test]
    fn test_gain_linearity() {
        let history = [0.0, 0.4, 1.3, 2.2, 2.9, 3.1, 2.7];
        let c = 3.0;

        let mut pid = PidController::new(2.0, 0.005, 0.5);
        pid.set_desired(2.5);
        let mut scaled = PidController::new(2.0 * c, 0.005 * c, 0.5 * c);
        scaled.set_desired(2.5);

        for (a, b) in run(&mut pid, &history).iter().zip(run(&mut scaled, &history)) {
            assert!((a * c - b).abs() < 1e-9, "{} * {} != {}", a, c, b);
        }
    }

    #[test]
    fn test_reset() {
        let mut pid = PidController::new(2.0, 0.005, 0.5);
        pid.set_desired(5.0);
        run(&mut pid, &[0.0, 1.0, 2.0]);

        pid.reset();
        assert_eq!(pid.desired(), 0.0);
        pid.set_desired(3.0);

        let mut fresh = PidController::new(2.0, 0.005, 0.5);
        fresh.set_desired(3.0);

        assert_eq!(pid.update(1.5), fresh.update(1.5));
    }

    #[test]
    fn test_non_finite_measurement() {
        let mut pid = PidController::new(2.0, 0.005, 0.5);
        pid.set_desired(1.0);

        assert!(!pid.update(f64::NAN).is_finite());
    }
}
