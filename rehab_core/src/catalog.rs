//! Exercise catalog.
//!
//! Maps the external exercise codes found in program documents to the
//! motion programs the animation layer understands, and carries the
//! built-in demonstration program.

use crate::motion::MotionProgramId;
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Program used for codes the catalog does not know
pub const FALLBACK_PROGRAM: MotionProgramId = MotionProgramId::ElbowFlex;

/// A known external exercise code
#[derive(Clone, Debug)]
pub struct ExerciseEntry {
    pub code: &'static str,
    pub display_name: &'static str,
    pub program: MotionProgramId,
}

/// Cached catalog - built once and reused across all lookups
static CATALOG: Lazy<HashMap<&'static str, ExerciseEntry>> = Lazy::new(build_catalog);

fn build_catalog() -> HashMap<&'static str, ExerciseEntry> {
    let entries = [
        ("FINGER_GRIP", "Finger Grip", MotionProgramId::FingerGrip),
        ("WRIST_SUP_PRO", "Wrist Rotation", MotionProgramId::WristRotate),
        ("ELBOW_FLEX_EXT", "Elbow Flexion", MotionProgramId::ElbowFlex),
        ("SHOULDER_FLEX", "Shoulder Flex", MotionProgramId::FullRange),
        ("WRIST_FLEX_EXT", "Wrist Flexion", MotionProgramId::WristRotate),
        ("COMBO_LIGHT", "Combo Light", MotionProgramId::FullRange),
    ];

    entries
        .into_iter()
        .map(|(code, display_name, program)| {
            (
                code,
                ExerciseEntry {
                    code,
                    display_name,
                    program,
                },
            )
        })
        .collect()
}

/// Resolve an exercise code to a motion program
///
/// Total over all inputs: unknown codes resolve to [`FALLBACK_PROGRAM`] so
/// playback never stalls on a code that passed lenient validation.
pub fn resolve_motion_program(exercise_code: &str) -> MotionProgramId {
    match CATALOG.get(exercise_code) {
        Some(entry) => entry.program,
        None => {
            tracing::debug!(
                "Unknown exercise code {:?}, falling back to {}",
                exercise_code,
                FALLBACK_PROGRAM
            );
            FALLBACK_PROGRAM
        }
    }
}

pub fn is_known_exercise(exercise_code: &str) -> bool {
    CATALOG.contains_key(exercise_code)
}

/// Human-readable name; unknown codes display as themselves
pub fn display_name(exercise_code: &str) -> &str {
    CATALOG
        .get(exercise_code)
        .map(|entry| entry.display_name)
        .unwrap_or(exercise_code)
}

/// All known exercises, sorted by code
pub fn exercises() -> Vec<&'static ExerciseEntry> {
    let mut entries: Vec<_> = CATALOG.values().collect();
    entries.sort_by_key(|entry| entry.code);
    entries
}

/// The built-in six-step demonstration program
pub fn sample_program() -> ExerciseProgram {
    let step = |exercise: &str,
                intensity: Intensity,
                duration_min: f64,
                rest_min: f64,
                pressure: f64,
                cadence: f64,
                repetitions: u32| ExerciseStep {
        exercise: exercise.to_string(),
        intensity,
        duration_min,
        rest_min,
        pressure_percentage: Some(pressure),
        cadence_rpm: Some(cadence),
        repetitions,
    };

    ExerciseProgram {
        run_id: "2bab40c3c3034b2594e51226b71ef1ef".into(),
        patient_id: "P001".into(),
        recommended: Recommendation {
            schedule: vec![
                step("COMBO_LIGHT", Intensity::High, 0.33, 0.17, 90.0, 5.0, 35),
                step("WRIST_SUP_PRO", Intensity::High, 0.42, 0.03, 90.0, 6.0, 24),
                step("WRIST_SUP_PRO", Intensity::Medium, 0.33, 0.03, 75.0, 6.0, 9),
                step("COMBO_LIGHT", Intensity::Medium, 0.17, 0.17, 75.0, 5.0, 42),
                step("COMBO_LIGHT", Intensity::High, 0.25, 0.03, 90.0, 5.0, 31),
                step("ELBOW_FLEX_EXT", Intensity::High, 0.33, 0.13, 90.0, 4.0, 46),
            ],
            score: 0.3794375065469784,
        },
        shortlist_count: Some(3),
        exploration_count: Some(8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate_with, ValidationPolicy};

    #[test]
    fn test_known_codes_resolve() {
        assert_eq!(resolve_motion_program("COMBO_LIGHT"), MotionProgramId::FullRange);
        assert_eq!(resolve_motion_program("WRIST_SUP_PRO"), MotionProgramId::WristRotate);
        assert_eq!(resolve_motion_program("FINGER_GRIP"), MotionProgramId::FingerGrip);
        assert_eq!(resolve_motion_program("ELBOW_FLEX_EXT"), MotionProgramId::ElbowFlex);
    }

    #[test]
    fn test_resolution_is_total() {
        for code in ["", "TOE_TAP", "combo_light", "🦴"] {
            assert_eq!(resolve_motion_program(code), FALLBACK_PROGRAM);
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(display_name("WRIST_SUP_PRO"), "Wrist Rotation");
        assert_eq!(display_name("TOE_TAP"), "TOE_TAP");
    }

    #[test]
    fn test_exercises_sorted() {
        let codes: Vec<_> = exercises().iter().map(|e| e.code).collect();
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
        assert_eq!(codes.len(), 6);
    }

    #[test]
    fn test_sample_program_passes_strict_validation() {
        let document = serde_json::to_value(sample_program()).unwrap();
        let program = validate_with(&document, ValidationPolicy::strict()).unwrap();
        assert_eq!(program, sample_program());
    }
}
