//! The control surface a rendering or hardware layer exposes to playback.

use crate::motion::{Axis, MotionProgramId};
use crate::ActuatorError;
use std::time::Duration;

/// Commands the scheduler issues to whatever moves the skeleton.
///
/// Every method must return promptly: `perform_motion` starts a motion and
/// returns, it does not wait for the motion to finish. Implementations are
/// shared between the scheduler task and the host's render loop, hence
/// `&self` and the `Send + Sync` bound.
pub trait MotionActuator: Send + Sync {
    /// Start `program`, spreading `repetitions` evenly across `duration`
    fn perform_motion(
        &self,
        program: MotionProgramId,
        duration: Duration,
        repetitions: u32,
    ) -> Result<(), ActuatorError>;

    /// Return every joint to its recorded home rotation. Idempotent.
    fn reset_pose(&self) -> Result<(), ActuatorError>;

    /// Set one joint to `degrees` away from its home rotation on `axis`
    fn rotate_joint(&self, joint: &str, axis: Axis, degrees: f64) -> Result<(), ActuatorError>;
}
