//! Config mapping, simulated cell assembly, and command execution.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use eyre::{Result, WrapErr};
use nalgebra::Vector3;
use pourer_config::{Config, Perception};
use pourer_core::{CancelToken, Orchestrator, PourOptions, PourerCfg};
use pourer_hardware::{
    SimArm, SimDetector, SimGripper, SimPlanner, SimPointCloud, SimScale, SimScene,
};
use pourer_traits::{Clock, MonotonicClock};
use serde_json::{Value, json};

use crate::cli::Commands;

/// What a command produced: a line for humans and a JSON object.
#[derive(Debug)]
pub struct Outcome {
    pub summary: String,
    pub result: Value,
}

pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Wire the simulated backends described by `[sim]` into an orchestrator.
pub fn build_sim(cfg: &Config, clock: Arc<dyn Clock>) -> Result<Orchestrator> {
    let rt = PourerCfg::try_from(cfg).wrap_err("resolve pour table")?;
    let sim = &cfg.sim;

    let planner = SimPlanner::new(rt.motion.world_frame.clone(), sim.waypoints)
        .failing_seeds_below(sim.planner_fail_seeds_below);
    let delay = Duration::from_millis(sim.move_delay_ms);
    let arm = SimArm::new("arm", rt.places.home.clone(), clock.clone()).with_move_delay(delay);
    let scene = SimScene {
        cups: sim.cups.iter().map(|c| Vector3::from(*c)).collect(),
        cup_radius_mm: sim.cup_radius_mm,
        cup_height_mm: sim.cup_height_mm,
        camera_pose: rt.camera.pose,
    };

    let mut builder = Orchestrator::builder()
        .with_planner(planner)
        .with_arm(arm)
        .with_gripper(SimGripper::new(sim.grab_succeeds))
        .with_clock(clock.clone());
    let scale = SimScale::new(rt.weight.field.clone(), sim.bottle_weight_g, sim.weight_noise_g);
    builder = builder.with_scale(if sim.scale_responds {
        scale
    } else {
        scale.unresponsive()
    });
    if cfg.assist.enabled {
        builder = builder.with_assist_arm(
            SimArm::new("assist", rt.assist.rest.clone(), clock).with_move_delay(delay),
        );
    }
    builder = match sim.perception {
        Perception::Detector => builder.with_detector(SimDetector::new(
            scene,
            rt.camera.intrinsics,
            rt.camera.cup_label.clone(),
        )),
        Perception::PointCloud => builder.with_point_cloud(SimPointCloud::new(scene, 0.5)),
    };
    tracing::debug!(
        cups = sim.cups.len(),
        perception = ?sim.perception,
        assist = cfg.assist.enabled,
        "sim cell assembled"
    );
    builder.with_config(rt).build()
}

/// Cancellation for one command: Ctrl-C flag plus an optional deadline.
pub fn cancel_token(flag: Arc<AtomicBool>, clock: &dyn Clock, deadline_ms: u64) -> CancelToken {
    let token = CancelToken::from_flag(flag);
    if deadline_ms == 0 {
        token
    } else {
        token.with_timeout(clock, Duration::from_millis(deadline_ms))
    }
}

pub fn execute(
    cfg: &Config,
    cmd: &Commands,
    shutdown: Arc<AtomicBool>,
) -> Result<Outcome> {
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let mut orch = build_sim(cfg, clock.clone())?;
    let deadline_ms = match cmd {
        Commands::Pour {
            deadline_ms: Some(ms),
            ..
        } => *ms,
        _ => cfg.runner.deadline_ms,
    };
    let cancel = cancel_token(shutdown, clock.as_ref(), deadline_ms);
    tracing::info!(command = cmd.name(), deadline_ms, "command start");

    let outcome = match cmd {
        Commands::Pour {
            pickup, execute, ..
        } => {
            let report = orch.start_pouring_process(
                PourOptions {
                    pickup: (*pickup).into(),
                    execute: *execute,
                },
                &cancel,
            )?;
            let verb = if report.executed { "poured" } else { "planned" };
            Outcome {
                summary: format!(
                    "{verb} {} cup(s), {} actions, bottle {:.1} g (tilt +{:.1} deg for {} ms)",
                    report.cups.len(),
                    report.actions,
                    report.weight.weight_g,
                    report.weight.params.angle_offset_deg,
                    report.weight.params.duration_ms
                ),
                result: json!({
                    "cups": report.cups.iter().map(vec3_json).collect::<Vec<_>>(),
                    "weight_g": report.weight.weight_g,
                    "angle_offset_deg": report.weight.params.angle_offset_deg,
                    "duration_ms": report.weight.params.duration_ms,
                    "actions": report.actions,
                    "executed": report.executed,
                }),
            }
        }
        Commands::Touch => {
            orch.touch(&cancel)?;
            Outcome {
                summary: "touch complete".into(),
                result: json!({ "done": true }),
            }
        }
        Commands::Demo => {
            orch.full_demo(&cancel)?;
            Outcome {
                summary: "demo complete".into(),
                result: json!({ "done": true }),
            }
        }
        Commands::Weigh => {
            let w = orch.read_weight(&cancel)?;
            Outcome {
                summary: format!(
                    "bottle {:.1} g: tilt +{:.1} deg for {} ms",
                    w.weight_g, w.params.angle_offset_deg, w.params.duration_ms
                ),
                result: json!({
                    "weight_g": w.weight_g,
                    "angle_offset_deg": w.params.angle_offset_deg,
                    "duration_ms": w.params.duration_ms,
                }),
            }
        }
        Commands::Calibrate { samples } => {
            let r = orch.calibrate(*samples, &cancel)?;
            Outcome {
                summary: format!(
                    "cup at ({:.1}, {:.1}, {:.1}) mm, stddev ({:.2}, {:.2}, {:.2}) over {} samples",
                    r.mean.x, r.mean.y, r.mean.z, r.std_dev.x, r.std_dev.y, r.std_dev.z, r.samples
                ),
                result: json!({
                    "samples": r.samples,
                    "mean": vec3_json(&r.mean),
                    "std_dev": vec3_json(&r.std_dev),
                }),
            }
        }
        Commands::SelfCheck => {
            let c = orch.self_check()?;
            Outcome {
                summary: format!(
                    "OK: arm {} joints, assist {}, scale {}, perception {}",
                    c.arm_joints.len(),
                    if c.assist_joints.is_some() { "present" } else { "absent" },
                    c.weight_g.map_or_else(|| "absent".to_string(), |w| format!("{w:.1} g")),
                    c.perception
                ),
                result: json!({
                    "arm_joints": c.arm_joints.as_slice(),
                    "assist_joints": c.assist_joints.as_ref().map(|j| j.as_slice().to_vec()),
                    "weight_g": c.weight_g,
                    "perception": c.perception,
                }),
            }
        }
    };
    tracing::info!(command = cmd.name(), "command done");
    Ok(outcome)
}

/// JSON line for a successful command.
pub fn format_result_json(command: &str, duration_ms: u64, result: &Value) -> String {
    json!({
        "timestamp": unix_ms(),
        "command": command,
        "duration_ms": duration_ms,
        "result": result,
        "reason": null,
    })
    .to_string()
}

fn vec3_json(v: &Vector3<f64>) -> Value {
    json!([v.x, v.y, v.z])
}
