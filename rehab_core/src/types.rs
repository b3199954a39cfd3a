//! Core domain types for the RehabX playback engine.
//!
//! This module defines the exercise program document as it looks once it
//! has passed validation:
//! - Programs and their recommended schedule
//! - Individual exercise steps
//! - Intensity levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Intensity
// ============================================================================

/// Prescribed intensity of a step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intensity {
    Low,
    #[serde(alias = "MED")]
    Medium,
    High,
}

impl Intensity {
    /// Parse the wire spelling, accepting `MED` as an alias for `MEDIUM`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(Intensity::Low),
            "MEDIUM" | "MED" => Some(Intensity::Medium),
            "HIGH" => Some(Intensity::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "LOW",
            Intensity::Medium => "MEDIUM",
            Intensity::High => "HIGH",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Program Document
// ============================================================================

/// One entry of a recommended schedule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseStep {
    /// External exercise code, e.g. `WRIST_SUP_PRO`
    pub exercise: String,
    pub intensity: Intensity,
    /// Minutes of active motion
    pub duration_min: f64,
    /// Minutes of rest after this step; ignored after the final step
    #[serde(default)]
    pub rest_min: f64,
    /// Pass-through only; does not shape the waveform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_percentage: Option<f64>,
    /// Pass-through only; does not shape the waveform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence_rpm: Option<f64>,
    pub repetitions: u32,
}

impl ExerciseStep {
    /// Commanded active duration
    pub fn duration(&self) -> Duration {
        minutes_to_duration(self.duration_min)
    }

    /// Rest following this step
    pub fn rest(&self) -> Duration {
        minutes_to_duration(self.rest_min)
    }
}

/// The recommended payload of a program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub schedule: Vec<ExerciseStep>,
    /// Informational only, no enforced range
    #[serde(default)]
    pub score: f64,
}

/// A validated exercise program.
///
/// Invariant: `recommended.schedule` is non-empty. Construct through
/// [`crate::validate`] rather than by hand when the input is untrusted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseProgram {
    pub run_id: String,
    pub patient_id: String,
    pub recommended: Recommendation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortlist_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration_count: Option<u32>,
}

impl ExerciseProgram {
    pub fn steps(&self) -> &[ExerciseStep] {
        &self.recommended.schedule
    }

    /// Active time plus every rest that playback will actually observe
    pub fn planned_duration(&self) -> Duration {
        let steps = self.steps();
        let last = steps.len().saturating_sub(1);
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                if i < last {
                    step.duration().saturating_add(step.rest())
                } else {
                    step.duration()
                }
            })
            .try_fold(Duration::ZERO, |total, d| total.checked_add(d))
            .unwrap_or(Duration::MAX)
    }
}

fn minutes_to_duration(minutes: f64) -> Duration {
    if minutes <= 0.0 || minutes.is_nan() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(minutes * 60.0).unwrap_or(Duration::MAX)
}
