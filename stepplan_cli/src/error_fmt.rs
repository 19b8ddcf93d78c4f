//! Human-readable error descriptions and structured JSON error formatting.

use stepplan_core::error::{BuildError, PlannerError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Outer context (e.g. "move CSV row 7") when the typed error was wrapped.
    let at = {
        let outer = err.to_string();
        let inner = err
            .downcast_ref::<PlannerError>()
            .map(ToString::to_string)
            .unwrap_or_default();
        if inner.is_empty() || outer == inner {
            String::new()
        } else {
            format!(" at {outer}")
        }
    };

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSettings => {
                "What happened: The planner was built without machine settings.\nLikely causes: Internal wiring error in the caller.\nHow to fix: Pass settings via with_settings(...) before build().".to_string()
            }
            BuildError::InvalidSettings(msg) => format!(
                "What happened: Invalid machine settings ({msg}).\nLikely causes: Missing or out-of-range values in [machine] or [planner].\nHow to fix: Edit the config file, then rerun `stepplan self-check`."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PlannerError>() {
        return match pe {
            PlannerError::InvalidMove(msg) => format!(
                "What happened: A move was rejected{at}: {msg}.\nLikely causes: A moving row with duration_us = 0 or a non-positive mm column.\nHow to fix: Every row with steps needs duration_us > 0 and mm > 0; fix the row and rerun."
            ),
            PlannerError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Unknown keys, wrong types or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `stepplan self-check`. See etc/stepplan.toml for a sample."
            ),
            PlannerError::Stepper(msg) => format!(
                "What happened: The step generator failed ({msg}).\nLikely causes: The step output rejected a pulse or stopped responding.\nHow to fix: Re-run with --log-level=debug and check the stepper warnings."
            ),
            PlannerError::Disconnected => {
                "What happened: The block consumer went away mid-run.\nLikely causes: The step output was closed.\nHow to fix: Check the step output and rerun.".to_string()
            }
        };
    }

    // String-based heuristics for errors coming from file loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("must have headers 'x,y,z,duration_us,mm'") {
        return "Invalid headers in move CSV. Expected 'x,y,z,duration_us,mm'.".to_string();
    }

    if lower.contains("invalid move csv row") {
        let cause = err.source().map(|s| format!(" ({s})")).unwrap_or_default();
        return format!(
            "What happened: {msg}{cause}.\nLikely causes: A non-numeric value, a negative duration or a missing column.\nHow to fix: Fix that row of the move CSV and rerun."
        );
    }

    if lower.contains("failed to read config") || lower.contains("open move csv") {
        return format!(
            "What happened: {msg}.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the path passed to --config / --moves."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 invalid move, 3 invalid settings, 4 stepper fault, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<PlannerError>() {
        Some(PlannerError::InvalidMove(_)) => 2,
        Some(PlannerError::Config(_)) => 3,
        Some(PlannerError::Stepper(_) | PlannerError::Disconnected) => 4,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidSettings";
    }
    match err.downcast_ref::<PlannerError>() {
        Some(PlannerError::InvalidMove(_)) => "InvalidMove",
        Some(PlannerError::Config(_)) => "InvalidSettings",
        Some(PlannerError::Stepper(_)) => "StepperFault",
        Some(PlannerError::Disconnected) => "Disconnected",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn wrapped_invalid_move_keeps_code_and_row() {
        let err: eyre::Result<()> =
            Err(eyre::Report::new(PlannerError::InvalidMove("duration must be > 0 us".into())));
        let err = err.wrap_err("move CSV row 4").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 2);
        let text = humanize(&err);
        assert!(text.contains("at move CSV row 4"), "{text}");
        assert!(text.contains("duration must be > 0 us"), "{text}");
    }

    #[test]
    fn build_errors_are_settings_errors() {
        let err = eyre::Report::new(BuildError::InvalidSettings("block_buffer_size must be >= 2"));
        assert_eq!(exit_code_for_error(&err), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "InvalidSettings");
    }

    #[test]
    fn unknown_errors_fall_back() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: boom"));
    }
}
