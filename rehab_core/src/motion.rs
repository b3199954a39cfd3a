//! Motion program library.
//!
//! Each motion program is a pure function of the progress within the current
//! repetition. Offsets are in degrees and are applied on top of a joint's
//! home rotation by whoever owns the skeleton, so nothing here holds state
//! or timers. Hosts sample [`MotionTiming::phase_at`] from their render loop.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const FOREARM: &str = "ForeArm";
pub const WRIST: &str = "Wrist";
pub const HAND: &str = "Hand";

/// Finger joints, three segments per finger, innermost first
pub const FINGER_GROUPS: [[&str; 3]; 5] = [
    ["Index0", "Index1", "Index2"],
    ["Middle0", "Middle1", "Middle2"],
    ["Ring0", "Ring1", "Ring2"],
    ["Pinky0", "Pinky1", "Pinky2"],
    ["Thumb0", "Thumb1", "Thumb2"],
];

/// Internal motion programs the animation layer understands
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MotionProgramId {
    ElbowFlex,
    WristRotate,
    FingerGrip,
    FullRange,
}

impl MotionProgramId {
    pub const ALL: [MotionProgramId; 4] = [
        MotionProgramId::ElbowFlex,
        MotionProgramId::WristRotate,
        MotionProgramId::FingerGrip,
        MotionProgramId::FullRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionProgramId::ElbowFlex => "elbow-flex",
            MotionProgramId::WristRotate => "wrist-rotate",
            MotionProgramId::FingerGrip => "finger-grip",
            MotionProgramId::FullRange => "full-range",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MotionProgramId::ElbowFlex => "Elbow Flexion",
            MotionProgramId::WristRotate => "Wrist Rotation",
            MotionProgramId::FingerGrip => "Finger Grip",
            MotionProgramId::FullRange => "Full Range Motion",
        }
    }

    /// Timing used when a caller passes a zero duration or repetition count
    pub fn default_timing(&self) -> MotionTiming {
        let (millis, repetitions): (u64, u32) = match self {
            MotionProgramId::ElbowFlex => (3000, 5),
            MotionProgramId::WristRotate => (2500, 8),
            MotionProgramId::FingerGrip => (2000, 10),
            MotionProgramId::FullRange => (4000, 3),
        };
        MotionTiming::new(Duration::from_millis(millis * u64::from(repetitions)), repetitions)
    }

    /// Sample joint offsets at `progress` (0..=1) within one repetition
    pub fn sample(&self, progress: f64) -> Vec<JointOffset> {
        let p = progress.clamp(0.0, 1.0);
        match self {
            MotionProgramId::ElbowFlex => elbow_flex(p),
            MotionProgramId::WristRotate => wrist_rotate(p),
            MotionProgramId::FingerGrip => finger_grip(p),
            MotionProgramId::FullRange => full_range(p),
        }
    }
}

impl fmt::Display for MotionProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotionProgramId {
    type Err = crate::ActuatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MotionProgramId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| crate::ActuatorError::UnknownMotionProgram(s.to_string()))
    }
}

/// Rotation axis of a joint
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{}'", other)),
        }
    }
}

/// Offset from a joint's home rotation on one axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointOffset {
    pub joint: &'static str,
    pub axis: Axis,
    pub degrees: f64,
}

impl JointOffset {
    fn new(joint: &'static str, axis: Axis, degrees: f64) -> Self {
        Self {
            joint,
            axis,
            degrees,
        }
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Total commanded duration split evenly across repetitions
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionTiming {
    pub duration: Duration,
    pub repetitions: u32,
}

/// Where a motion is at a given instant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepPhase {
    /// 0-based repetition index
    pub repetition: u32,
    /// Progress within the repetition, 0..1
    pub progress: f64,
}

impl MotionTiming {
    pub fn new(duration: Duration, repetitions: u32) -> Self {
        Self {
            duration,
            repetitions,
        }
    }

    pub fn repetition_period(&self) -> Duration {
        if self.repetitions == 0 {
            return Duration::ZERO;
        }
        self.duration / self.repetitions
    }

    /// Phase at `elapsed`, or `None` once every repetition has been played
    pub fn phase_at(&self, elapsed: Duration) -> Option<RepPhase> {
        let period = self.repetition_period().as_secs_f64();
        if period <= 0.0 || elapsed >= self.duration {
            return None;
        }
        let reps = elapsed.as_secs_f64() / period;
        let repetition = reps.floor() as u32;
        if repetition >= self.repetitions {
            return None;
        }
        Some(RepPhase {
            repetition,
            progress: reps.fract(),
        })
    }
}

// ============================================================================
// Waveforms
// ============================================================================

fn delayed(progress: f64, delay: f64) -> f64 {
    (progress - delay).clamp(0.0, 1.0)
}

fn elbow_flex(p: f64) -> Vec<JointOffset> {
    // Wave rescaled to 0..1 keeps flexion on one side of the home pose
    let wave = (p * 2.0 * PI).sin() * 0.5 + 0.5;
    vec![JointOffset::new(FOREARM, Axis::Z, wave * -75.0)]
}

fn wrist_rotate(p: f64) -> Vec<JointOffset> {
    vec![JointOffset::new(WRIST, Axis::Z, (p * 6.0 * PI).sin() * 30.0)]
}

fn finger_grip(p: f64) -> Vec<JointOffset> {
    let mut offsets = Vec::with_capacity(15);
    for group in FINGER_GROUPS.iter() {
        for (segment, &joint) in group.iter().enumerate() {
            let mut max_angle = match segment {
                1 => -50.0,
                2 => -45.0,
                _ => -40.0,
            };
            if joint.starts_with("Thumb") {
                max_angle = -25.0;
            }
            let progress = delayed(p, segment as f64 * 0.05);
            offsets.push(JointOffset::new(
                joint,
                Axis::Z,
                (progress * 2.0 * PI).sin() * max_angle,
            ));
        }
    }
    offsets
}

fn full_range(p: f64) -> Vec<JointOffset> {
    let mut offsets = vec![
        JointOffset::new(FOREARM, Axis::Z, (p * 2.0 * PI).sin() * -60.0),
        JointOffset::new(WRIST, Axis::X, (p * 4.0 * PI).cos() * 25.0),
        JointOffset::new(WRIST, Axis::Y, (p * 3.0 * PI).sin() * 20.0),
        JointOffset::new(HAND, Axis::Y, (p * 2.0 * PI).sin() * 15.0),
    ];

    for (group_index, group) in FINGER_GROUPS.iter().enumerate() {
        let group_progress = delayed(p, group_index as f64 * 0.1);
        for (segment, &joint) in group.iter().enumerate() {
            let progress = delayed(group_progress, segment as f64 * 0.03);
            let mut max_angle = match segment {
                1 => -40.0,
                2 => -35.0,
                _ => -30.0,
            };
            if joint.starts_with("Thumb") {
                max_angle *= 0.7;
            }
            offsets.push(JointOffset::new(
                joint,
                Axis::Z,
                (progress * 2.0 * PI).sin() * max_angle,
            ));
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_of(offsets: &[JointOffset], joint: &str, axis: Axis) -> f64 {
        offsets
            .iter()
            .find(|o| o.joint == joint && o.axis == axis)
            .map(|o| o.degrees)
            .unwrap()
    }

    #[test]
    fn test_program_ids_round_trip_through_names() {
        for id in MotionProgramId::ALL {
            assert_eq!(id.as_str().parse::<MotionProgramId>().unwrap(), id);
        }
        assert!("spin".parse::<MotionProgramId>().is_err());
    }

    #[test]
    fn test_elbow_flex_stays_in_flexion_range() {
        for i in 0..=100 {
            let offsets = MotionProgramId::ElbowFlex.sample(i as f64 / 100.0);
            let degrees = offset_of(&offsets, FOREARM, Axis::Z);
            assert!((-75.0..=0.0).contains(&degrees), "{} out of range", degrees);
        }
        let peak = MotionProgramId::ElbowFlex.sample(0.25);
        assert!((offset_of(&peak, FOREARM, Axis::Z) + 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrist_rotate_runs_three_cycles() {
        let offsets = MotionProgramId::WristRotate.sample(1.0 / 12.0);
        assert!((offset_of(&offsets, WRIST, Axis::Z) - 30.0).abs() < 1e-9);

        let offsets = MotionProgramId::WristRotate.sample(1.0 / 3.0);
        assert!(offset_of(&offsets, WRIST, Axis::Z).abs() < 1e-9);
    }

    #[test]
    fn test_finger_grip_scales_segments() {
        let offsets = MotionProgramId::FingerGrip.sample(0.25);
        assert_eq!(offsets.len(), 15);
        assert!((offset_of(&offsets, "Index0", Axis::Z) + 40.0).abs() < 1e-9);
        // Thumb is scaled down and the tip lags behind the base
        assert!(offset_of(&offsets, "Thumb0", Axis::Z) > -25.0 - 1e-9);
        assert!(offset_of(&offsets, "Index2", Axis::Z) > -45.0);
    }

    #[test]
    fn test_full_range_drives_every_group() {
        let offsets = MotionProgramId::FullRange.sample(0.6);
        assert_eq!(offsets.len(), 4 + 15);
        assert!(offsets.iter().any(|o| o.joint == WRIST && o.axis == Axis::X));
        assert!(offsets.iter().any(|o| o.joint == WRIST && o.axis == Axis::Y));

        // Later finger groups start later
        let early = MotionProgramId::FullRange.sample(0.05);
        assert_eq!(offset_of(&early, "Thumb0", Axis::Z), 0.0);
        assert!(offset_of(&early, "Index0", Axis::Z) < 0.0);
    }

    #[test]
    fn test_phase_splits_duration_across_repetitions() {
        let timing = MotionTiming::new(Duration::from_secs(10), 5);
        assert_eq!(timing.repetition_period(), Duration::from_secs(2));

        let phase = timing.phase_at(Duration::from_millis(4500)).unwrap();
        assert_eq!(phase.repetition, 2);
        assert!((phase.progress - 0.25).abs() < 1e-9);

        assert_eq!(timing.phase_at(Duration::from_secs(10)), None);
        assert_eq!(timing.phase_at(Duration::from_secs(60)), None);
    }

    #[test]
    fn test_zero_repetitions_never_play() {
        let timing = MotionTiming::new(Duration::from_secs(10), 0);
        assert_eq!(timing.phase_at(Duration::ZERO), None);
    }
}
