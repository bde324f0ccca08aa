//! Human-readable error descriptions and structured JSON error formatting.

use pourer_core::error::{BuildError, PourError};

/// Stable short name of an error kind, used in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(pe) = err.downcast_ref::<PourError>() {
        return match pe {
            PourError::PlanningFailure { .. } => "PlanningFailure",
            PourError::SensorRead(_) => "SensorRead",
            PourError::Geometry(_) => "Geometry",
            PourError::LocalizationAmbiguous { .. } => "LocalizationAmbiguous",
            PourError::Execution { .. } => "Execution",
            PourError::Cancelled => "Cancelled",
            PourError::DeadlineExceeded => "DeadlineExceeded",
            PourError::InvalidState(_) => "InvalidState",
            PourError::Hardware(_) => "Hardware",
            PourError::Timeout => "Timeout",
            PourError::Config(_) => "Config",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    "Error"
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingPlanner => {
                "What happened: No motion planner was provided to the orchestrator.\nLikely causes: The planner backend failed to start or was not wired into the builder.\nHow to fix: Pass one via with_planner(...).".to_string()
            }
            BuildError::MissingArm => {
                "What happened: No pour arm was provided to the orchestrator.\nLikely causes: The arm backend failed to start or was not wired into the builder.\nHow to fix: Pass one via with_arm(...).".to_string()
            }
            BuildError::MissingGripper => {
                "What happened: No gripper was provided to the orchestrator.\nLikely causes: The gripper backend failed to start or was not wired into the builder.\nHow to fix: Pass one via with_gripper(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML or pour table.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PourError>() {
        return match pe {
            PourError::PlanningFailure { attempts, cause } => format!(
                "What happened: No motion plan found after {attempts} attempt(s) ({cause}).\nLikely causes: Goal inside an obstacle, unreachable pose, or too few attempts.\nHow to fix: Check [places] and [[motion.obstacles]], or raise motion.max_plan_attempts."
            ),
            PourError::LocalizationAmbiguous { what, found } => format!(
                "What happened: Expected exactly one {what}, found {found}.\nLikely causes: Cups missing from or crowding the camera view, or a wrong camera.cup_label.\nHow to fix: Place the cups in view (one cup for touch and calibrate) and rerun."
            ),
            PourError::Execution { index, kind, cause } => format!(
                "What happened: Action {index} ({kind}) failed: {cause}.\nLikely causes: Arm fault, gripper closed on nothing, or a changed scene.\nHow to fix: Check the robot, clear the cell, and start from home."
            ),
            PourError::Cancelled => {
                "What happened: The run was cancelled.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Start a new run; the bottle may still be held.".to_string()
            }
            PourError::DeadlineExceeded => {
                "What happened: The run deadline passed before it finished.\nLikely causes: Deadline shorter than weighing, planning and pouring take.\nHow to fix: Raise --deadline-ms or runner.deadline_ms (0 disables it).".to_string()
            }
            PourError::InvalidState(msg) => format!(
                "What happened: {msg}.\nLikely causes: Macros run out of order.\nHow to fix: Run pour prep before pour, and put back before a new prep."
            ),
            PourError::Timeout => {
                "What happened: A hardware call timed out.\nLikely causes: Backend unreachable or overloaded.\nHow to fix: Check connections and rerun with --log-level=debug.".to_string()
            }
            PourError::SensorRead(msg) => format!(
                "What happened: Scale reading failed ({msg}).\nLikely causes: Wrong weight.field or scale not reporting.\nHow to fix: Check [weight] in the config."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("pour table csv must have headers") {
        return format!(
            "Invalid headers in pour table CSV. Expected '{}'.",
            pourer_config::POUR_TABLE_HEADERS.join(",")
        );
    }

    if lower.contains("parse config") || lower.contains("read config") {
        let mut cause = String::new();
        if let Some(src) = err.source() {
            cause = format!(" Cause: {src}");
        }
        return format!(
            "What happened: Could not load the config file.{cause}\nHow to fix: Check the --config path and the TOML syntax."
        );
    }

    if lower.contains("must") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nHow to fix: Edit the TOML config and try again."
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

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<PourError>() {
        Some(PourError::PlanningFailure { .. }) => 3,
        Some(PourError::LocalizationAmbiguous { .. }) => 4,
        Some(PourError::DeadlineExceeded) => 5,
        Some(PourError::Execution { .. }) => 6,
        Some(PourError::Hardware(_) | PourError::Timeout | PourError::SensorRead(_)) => 7,
        Some(PourError::Cancelled) => 8,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(command: &str, err: &eyre::Report) -> String {
    use serde_json::json;

    let details = match err.downcast_ref::<PourError>() {
        Some(PourError::PlanningFailure { attempts, .. }) => Some(json!({ "attempts": attempts })),
        Some(PourError::LocalizationAmbiguous { what, found }) => {
            Some(json!({ "what": what, "found": found }))
        }
        Some(PourError::Execution { index, kind, .. }) => {
            Some(json!({ "index": index, "kind": kind }))
        }
        _ => None,
    };
    json!({
        "timestamp": crate::run::unix_ms(),
        "command": command,
        "result": null,
        "reason": reason_name(err),
        "details": details,
        "message": humanize(err),
    })
    .to_string()
}
