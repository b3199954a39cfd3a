//! In-process skeleton rig.
//!
//! [`SkeletonRig`] is the reference [`MotionActuator`]: a set of named joints,
//! each with a home rotation captured when the rig is built. Motions are
//! started by the scheduler and advanced by the host calling
//! [`SkeletonRig::tick`] once per rendered frame; a tick only samples elapsed
//! time, so dropped frames do not accumulate error.

use crate::motion::{Axis, MotionProgramId, MotionTiming, FINGER_GROUPS, FOREARM, HAND, WRIST};
use crate::{ActuatorError, MotionActuator};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Euler rotation in radians
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Rotation {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    fn set(&mut self, axis: Axis, radians: f64) {
        match axis {
            Axis::X => self.x = radians,
            Axis::Y => self.y = radians,
            Axis::Z => self.z = radians,
        }
    }
}

#[derive(Clone, Debug)]
struct Joint {
    home: Rotation,
    current: Rotation,
}

#[derive(Clone, Debug)]
struct ActiveMotion {
    program: MotionProgramId,
    timing: MotionTiming,
    started_at: Instant,
}

#[derive(Debug, Default)]
struct RigState {
    joints: BTreeMap<String, Joint>,
    active: Option<ActiveMotion>,
}

impl RigState {
    fn return_home(&mut self) {
        for joint in self.joints.values_mut() {
            joint.current = joint.home;
        }
    }

    fn offset_joint(&mut self, name: &str, axis: Axis, degrees: f64) -> bool {
        match self.joints.get_mut(name) {
            Some(joint) => {
                joint.current.set(axis, joint.home.get(axis) + degrees.to_radians());
                true
            }
            None => false,
        }
    }
}

/// A skeleton driven by motion programs
#[derive(Debug)]
pub struct SkeletonRig {
    state: Mutex<RigState>,
}

impl SkeletonRig {
    /// Build a rig, recording each joint's rotation as its home pose
    pub fn new<I, S>(joints: I) -> Self
    where
        I: IntoIterator<Item = (S, Rotation)>,
        S: Into<String>,
    {
        let joints = joints
            .into_iter()
            .map(|(name, home)| {
                (
                    name.into(),
                    Joint {
                        home,
                        current: home,
                    },
                )
            })
            .collect();

        Self {
            state: Mutex::new(RigState {
                joints,
                active: None,
            }),
        }
    }

    /// The forearm, wrist, hand and five-finger skeleton, all at zero
    pub fn hand() -> Self {
        let names = [FOREARM, WRIST, HAND]
            .into_iter()
            .chain(FINGER_GROUPS.iter().flatten().copied());
        Self::new(names.map(|name| (name, Rotation::default())))
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.state.lock().joints.keys().cloned().collect()
    }

    /// Current rotation of a joint
    pub fn joint(&self, name: &str) -> Option<Rotation> {
        self.state.lock().joints.get(name).map(|j| j.current)
    }

    /// Home rotation of a joint
    pub fn home(&self, name: &str) -> Option<Rotation> {
        self.state.lock().joints.get(name).map(|j| j.home)
    }

    /// Snapshot of every joint's current rotation
    pub fn pose(&self) -> BTreeMap<String, Rotation> {
        self.state
            .lock()
            .joints
            .iter()
            .map(|(name, joint)| (name.clone(), joint.current))
            .collect()
    }

    pub fn active_program(&self) -> Option<MotionProgramId> {
        self.state.lock().active.as_ref().map(|m| m.program)
    }

    /// One-line summary of a joint's current and home rotation
    pub fn debug_joint(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        let joint = state.joints.get(name)?;
        Some(format!(
            "{}: current x={:.3} y={:.3} z={:.3}, home x={:.3} y={:.3} z={:.3}",
            name,
            joint.current.x,
            joint.current.y,
            joint.current.z,
            joint.home.x,
            joint.home.y,
            joint.home.z
        ))
    }

    /// Start a motion with an explicit start instant
    pub fn perform_motion_at(
        &self,
        program: MotionProgramId,
        duration: Duration,
        repetitions: u32,
        started_at: Instant,
    ) {
        let timing = if duration.is_zero() || repetitions == 0 {
            program.default_timing()
        } else {
            MotionTiming::new(duration, repetitions)
        };

        tracing::debug!(
            "Starting {}: {} reps over {:?} ({:?} per rep)",
            program.description(),
            timing.repetitions,
            timing.duration,
            timing.repetition_period()
        );

        self.state.lock().active = Some(ActiveMotion {
            program,
            timing,
            started_at,
        });
    }

    /// Advance the active motion to now. Returns whether a motion is still playing.
    pub fn tick(&self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Advance the active motion to `now`
    pub fn tick_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        let Some(motion) = state.active.clone() else {
            return false;
        };

        let elapsed = now.saturating_duration_since(motion.started_at);
        match motion.timing.phase_at(elapsed) {
            Some(phase) => {
                for offset in motion.program.sample(phase.progress) {
                    state.offset_joint(offset.joint, offset.axis, offset.degrees);
                }
                true
            }
            None => {
                state.return_home();
                state.active = None;
                tracing::debug!(
                    "{} complete ({} reps), joints returned home",
                    motion.program.description(),
                    motion.timing.repetitions
                );
                false
            }
        }
    }
}

impl MotionActuator for SkeletonRig {
    fn perform_motion(
        &self,
        program: MotionProgramId,
        duration: Duration,
        repetitions: u32,
    ) -> Result<(), ActuatorError> {
        self.perform_motion_at(program, duration, repetitions, Instant::now());
        Ok(())
    }

    fn reset_pose(&self) -> Result<(), ActuatorError> {
        let mut state = self.state.lock();
        state.active = None;
        state.return_home();
        tracing::debug!("All joints reset to home rotation");
        Ok(())
    }

    fn rotate_joint(&self, joint: &str, axis: Axis, degrees: f64) -> Result<(), ActuatorError> {
        if self.state.lock().offset_joint(joint, axis, degrees) {
            tracing::debug!("Rotated {} on {:?} to {} degrees", joint, axis, degrees);
            Ok(())
        } else {
            Err(ActuatorError::UnknownJoint(joint.to_string()))
        }
    }
}
