//! Error types for the rehab_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rehab_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Exercise program failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The actuator rejected a motion or reset command
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Playback could not be started or was torn down
    #[error("Playback error: {0}")]
    Playback(String),
}

/// Reasons an exercise program document is rejected.
///
/// Step numbers are 1-based, matching what an operator sees in the schedule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing run_id or patient_id")]
    MissingIdentity,

    #[error("Missing recommended object")]
    MissingRecommended,

    #[error("Missing recommended.schedule")]
    MissingSchedule,

    #[error("Schedule must be a non-empty array")]
    EmptySchedule,

    #[error("Exercise {0}: Missing exercise name")]
    MissingExercise(usize),

    #[error("Exercise {0}: Invalid intensity (must be LOW, MEDIUM, HIGH, or MED)")]
    InvalidIntensity(usize),

    #[error("Exercise {0}: Invalid duration_min")]
    InvalidDuration(usize),

    #[error("Exercise {0}: Invalid repetitions")]
    InvalidRepetitions(usize),

    #[error("Exercise {0}: Invalid rest_min")]
    InvalidRest(usize),

    #[error("Exercise {0}: Unknown exercise code {1}")]
    UnknownExercise(usize, String),

    #[error("Exercise {0}: Invalid pressure_percentage")]
    InvalidPressure(usize),

    #[error("Exercise {0}: Invalid cadence_rpm")]
    InvalidCadence(usize),
}

/// Failures reported by a [`crate::MotionActuator`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActuatorError {
    #[error("joint '{0}' not found")]
    UnknownJoint(String),

    #[error("unknown motion program '{0}'")]
    UnknownMotionProgram(String),

    #[error("actuator unavailable: {0}")]
    Unavailable(String),
}
