#![forbid(unsafe_code)]

//! Core domain model and playback engine for the RehabX exercise demo.
//!
//! This crate provides:
//! - Domain types (exercise programs, steps, intensities)
//! - Program validation
//! - Exercise catalog (external codes to motion programs)
//! - Motion program library (joint waveforms)
//! - Skeleton rig (in-process actuator)
//! - Sequential playback scheduler

pub mod types;
pub mod error;
pub mod validate;
pub mod catalog;
pub mod motion;
pub mod actuator;
pub mod rig;
pub mod scheduler;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{ActuatorError, Error, Result, ValidationError};
pub use types::*;
pub use validate::{validate, validate_with, ValidationPolicy};
pub use catalog::{display_name, is_known_exercise, resolve_motion_program, sample_program};
pub use motion::{Axis, JointOffset, MotionProgramId, MotionTiming, RepPhase};
pub use actuator::MotionActuator;
pub use rig::{Rotation, SkeletonRig};
pub use scheduler::{PlaybackEvent, PlaybackHandle, PlaybackState, RunOutcome, RunReport, Scheduler};
pub use config::Config;
