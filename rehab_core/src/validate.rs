//! Exercise program validation.
//!
//! Checks an untyped JSON document and produces a typed [`ExerciseProgram`].
//! Checks run in document order and stop at the first violation:
//! - `run_id` / `patient_id` present and non-empty
//! - `recommended` object with a non-empty `schedule` array
//! - per step: exercise code, intensity, duration, repetitions, rest

use crate::catalog::is_known_exercise;
use crate::{ExerciseProgram, ExerciseStep, Intensity, Recommendation, ValidationError};
use serde_json::{Map, Value};

/// How tolerant validation is of incomplete step data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Reject unknown exercise codes and missing pressure/cadence values
    pub strict: bool,
}

impl ValidationPolicy {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Validate a program document with the default (lenient) policy
pub fn validate(document: &Value) -> Result<ExerciseProgram, ValidationError> {
    validate_with(document, ValidationPolicy::default())
}

/// Validate a program document with an explicit policy
///
/// Never mutates the input; the returned program owns copies of every field.
pub fn validate_with(
    document: &Value,
    policy: ValidationPolicy,
) -> Result<ExerciseProgram, ValidationError> {
    let run_id = non_empty_str(document.get("run_id"));
    let patient_id = non_empty_str(document.get("patient_id"));
    let (run_id, patient_id) = match (run_id, patient_id) {
        (Some(run), Some(patient)) => (run.to_string(), patient.to_string()),
        _ => return Err(ValidationError::MissingIdentity),
    };

    let recommended = document
        .get("recommended")
        .and_then(Value::as_object)
        .ok_or(ValidationError::MissingRecommended)?;

    let schedule = match recommended.get("schedule") {
        None | Some(Value::Null) => return Err(ValidationError::MissingSchedule),
        Some(value) => value.as_array().ok_or(ValidationError::EmptySchedule)?,
    };
    if schedule.is_empty() {
        return Err(ValidationError::EmptySchedule);
    }

    let schedule = schedule
        .iter()
        .enumerate()
        .map(|(index, raw)| validate_step(index + 1, raw, policy))
        .collect::<Result<Vec<_>, _>>()?;

    let score = recommended
        .get("score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    Ok(ExerciseProgram {
        run_id,
        patient_id,
        recommended: Recommendation { schedule, score },
        shortlist_count: count_field(document, "shortlist_count"),
        exploration_count: count_field(document, "exploration_count"),
    })
}

fn validate_step(
    number: usize,
    raw: &Value,
    policy: ValidationPolicy,
) -> Result<ExerciseStep, ValidationError> {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let exercise = non_empty_str(fields.get("exercise"))
        .ok_or(ValidationError::MissingExercise(number))?;
    if policy.strict && !is_known_exercise(exercise) {
        return Err(ValidationError::UnknownExercise(number, exercise.to_string()));
    }

    let intensity = fields
        .get("intensity")
        .and_then(Value::as_str)
        .and_then(Intensity::parse)
        .ok_or(ValidationError::InvalidIntensity(number))?;

    let duration_min = fields
        .get("duration_min")
        .and_then(Value::as_f64)
        .filter(|d| *d > 0.0)
        .ok_or(ValidationError::InvalidDuration(number))?;

    let repetitions = fields
        .get("repetitions")
        .and_then(Value::as_f64)
        .filter(|r| *r > 0.0 && r.fract() == 0.0 && *r <= f64::from(u32::MAX))
        .map(|r| r as u32)
        .ok_or(ValidationError::InvalidRepetitions(number))?;

    let rest_min = match fields.get("rest_min") {
        None | Some(Value::Null) => 0.0,
        Some(value) => value
            .as_f64()
            .filter(|r| *r >= 0.0)
            .ok_or(ValidationError::InvalidRest(number))?,
    };

    let pressure_percentage = fields.get("pressure_percentage").and_then(Value::as_f64);
    let cadence_rpm = fields.get("cadence_rpm").and_then(Value::as_f64);
    if policy.strict {
        if pressure_percentage.is_none() {
            return Err(ValidationError::InvalidPressure(number));
        }
        if cadence_rpm.is_none() {
            return Err(ValidationError::InvalidCadence(number));
        }
    }

    Ok(ExerciseStep {
        exercise: exercise.to_string(),
        intensity,
        duration_min,
        rest_min,
        pressure_percentage,
        cadence_rpm,
        repetitions,
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn count_field(document: &Value, key: &str) -> Option<u32> {
    document
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_document() -> Value {
        json!({
            "run_id": "2bab40c3c3034b2594e51226b71ef1ef",
            "patient_id": "P001",
            "recommended": {
                "schedule": [
                    {
                        "exercise": "COMBO_LIGHT",
                        "intensity": "HIGH",
                        "duration_min": 0.33,
                        "rest_min": 0.17,
                        "pressure_percentage": 90,
                        "cadence_rpm": 5,
                        "repetitions": 35
                    },
                    {
                        "exercise": "WRIST_SUP_PRO",
                        "intensity": "MED",
                        "duration_min": 0.42,
                        "rest_min": 0,
                        "pressure_percentage": 75,
                        "cadence_rpm": 6,
                        "repetitions": 24
                    }
                ],
                "score": 0.3794375065469784
            },
            "shortlist_count": 3,
            "exploration_count": 8
        })
    }

    #[test]
    fn test_accepts_valid_document() {
        let program = validate(&valid_document()).unwrap();

        assert_eq!(program.patient_id, "P001");
        assert_eq!(program.steps().len(), 2);
        assert_eq!(program.steps()[1].intensity, Intensity::Medium);
        assert_eq!(program.steps()[0].repetitions, 35);
        assert_eq!(program.steps()[0].pressure_percentage, Some(90.0));
        assert_eq!(program.shortlist_count, Some(3));
        assert_eq!(program.exploration_count, Some(8));
    }

    #[test]
    fn test_does_not_mutate_input() {
        let document = valid_document();
        let before = document.clone();
        let _ = validate(&document);
        assert_eq!(document, before);
    }

    #[test]
    fn test_rejects_missing_run_id() {
        let mut document = valid_document();
        document.as_object_mut().unwrap().remove("run_id");
        assert_eq!(validate(&document), Err(ValidationError::MissingIdentity));

        let mut document = valid_document();
        document["patient_id"] = json!("");
        assert_eq!(validate(&document), Err(ValidationError::MissingIdentity));
    }

    #[test]
    fn test_rejects_missing_recommended() {
        let mut document = valid_document();
        document["recommended"] = json!("not an object");
        assert_eq!(validate(&document), Err(ValidationError::MissingRecommended));
    }

    #[test]
    fn test_rejects_missing_schedule() {
        let mut document = valid_document();
        document["recommended"] = json!({ "score": 0.5 });
        assert_eq!(validate(&document), Err(ValidationError::MissingSchedule));
    }

    #[test]
    fn test_rejects_empty_schedule() {
        let mut document = valid_document();
        document["recommended"]["schedule"] = json!([]);
        assert_eq!(validate(&document), Err(ValidationError::EmptySchedule));
    }

    #[test]
    fn test_rejects_bad_intensity() {
        let mut document = valid_document();
        document["recommended"]["schedule"][1]["intensity"] = json!("EXTREME");
        assert_eq!(
            validate(&document),
            Err(ValidationError::InvalidIntensity(2))
        );
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let mut document = valid_document();
        document["recommended"]["schedule"][0]["duration_min"] = json!(0);
        assert_eq!(validate(&document), Err(ValidationError::InvalidDuration(1)));

        document["recommended"]["schedule"][0]["duration_min"] = json!("5");
        assert_eq!(validate(&document), Err(ValidationError::InvalidDuration(1)));
    }

    #[test]
    fn test_rejects_non_positive_repetitions() {
        let mut document = valid_document();
        document["recommended"]["schedule"][0]["repetitions"] = json!(-3);
        assert_eq!(
            validate(&document),
            Err(ValidationError::InvalidRepetitions(1))
        );

        document["recommended"]["schedule"][0]["repetitions"] = json!(2.5);
        assert_eq!(
            validate(&document),
            Err(ValidationError::InvalidRepetitions(1))
        );
    }

    #[test]
    fn test_rejection_messages_are_distinguishable() {
        let messages = [
            ValidationError::MissingIdentity,
            ValidationError::EmptySchedule,
            ValidationError::InvalidIntensity(1),
            ValidationError::InvalidDuration(1),
            ValidationError::InvalidRepetitions(1),
        ]
        .iter()
        .map(|e| e.to_string())
        .collect::<std::collections::HashSet<_>>();

        assert_eq!(messages.len(), 5);
    }

    #[test]
    fn test_first_violation_wins() {
        let mut document = valid_document();
        document["recommended"]["schedule"][0]["intensity"] = json!("NONE");
        document["recommended"]["schedule"][0]["duration_min"] = json!(-1);
        assert_eq!(
            validate(&document),
            Err(ValidationError::InvalidIntensity(1))
        );
    }

    #[test]
    fn test_missing_rest_defaults_to_zero() {
        let mut document = valid_document();
        document["recommended"]["schedule"][0]
            .as_object_mut()
            .unwrap()
            .remove("rest_min");
        let program = validate(&document).unwrap();
        assert_eq!(program.steps()[0].rest_min, 0.0);

        document["recommended"]["schedule"][0]["rest_min"] = json!(-0.5);
        assert_eq!(validate(&document), Err(ValidationError::InvalidRest(1)));
    }

    #[test]
    fn test_lenient_accepts_unknown_exercise() {
        let mut document = valid_document();
        document["recommended"]["schedule"][0]["exercise"] = json!("TOE_TAP");
        document["recommended"]["schedule"][0]
            .as_object_mut()
            .unwrap()
            .remove("cadence_rpm");

        let program = validate(&document).unwrap();
        assert_eq!(program.steps()[0].exercise, "TOE_TAP");
        assert_eq!(program.steps()[0].cadence_rpm, None);
    }

    #[test]
    fn test_strict_rejects_unknown_exercise() {
        let mut document = valid_document();
        document["recommended"]["schedule"][1]["exercise"] = json!("TOE_TAP");
        assert_eq!(
            validate_with(&document, ValidationPolicy::strict()),
            Err(ValidationError::UnknownExercise(2, "TOE_TAP".into()))
        );
    }

    #[test]
    fn test_strict_requires_pressure_and_cadence() {
        let mut document = valid_document();
        document["recommended"]["schedule"][0]["pressure_percentage"] = json!("high");
        assert_eq!(
            validate_with(&document, ValidationPolicy::strict()),
            Err(ValidationError::InvalidPressure(1))
        );

        let mut document = valid_document();
        document["recommended"]["schedule"][1]
            .as_object_mut()
            .unwrap()
            .remove("cadence_rpm");
        assert_eq!(
            validate_with(&document, ValidationPolicy::strict()),
            Err(ValidationError::InvalidCadence(2))
        );

        assert!(validate_with(&valid_document(), ValidationPolicy::strict()).is_ok());
    }
}
