//! World-state construction and the bounded planning retry loop.
use crate::cancel::CancelToken;
use crate::config::MotionCfg;
use crate::error::{PourError, Result};
use pourer_traits::{
    Clock, ConstraintProfile, FrameLink, Geometry, JointPositions, Plan, PlanRequest, Planner,
    Pose, Shape, WorldState,
};
use std::collections::HashSet;

/// Everything that varies between two planning calls of one cycle.
#[derive(Debug, Clone, Copy)]
pub struct MotionGoal<'a> {
    pub start: &'a JointPositions,
    pub pose: &'a Pose,
    pub movable_frame: &'a str,
    pub world: &'a WorldState,
    pub constraints: &'a ConstraintProfile,
}

#[derive(Debug, Clone)]
pub struct MotionRequestBuilder {
    cfg: MotionCfg,
}

impl MotionRequestBuilder {
    pub fn new(cfg: MotionCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &MotionCfg {
        &self.cfg
    }

    /// Static obstacles plus the caller's frame links, validated.
    ///
    /// A link's parent must be a robot frame or a link listed earlier in
    /// `held`. Names (obstacle labels and link names) must be non-empty and
    /// unique.
    pub fn world_state(&self, held: &[FrameLink]) -> Result<WorldState> {
        let mut names: HashSet<&str> = HashSet::new();
        for g in &self.cfg.obstacles {
            validate_geometry(g)?;
            if !names.insert(g.label.as_str()) {
                return Err(geometry_err(format!("duplicate obstacle '{}'", g.label)));
            }
        }

        let robot = self.cfg.robot_frames();
        let mut known: HashSet<&str> = robot.iter().map(String::as_str).collect();
        for link in held {
            if link.name.is_empty() {
                return Err(geometry_err("frame link with empty name".to_string()));
            }
            if known.contains(link.name.as_str()) || !names.insert(link.name.as_str()) {
                return Err(geometry_err(format!("duplicate frame '{}'", link.name)));
            }
            if !known.contains(link.parent.as_str()) {
                return Err(geometry_err(format!(
                    "frame '{}' has unknown parent '{}'",
                    link.name, link.parent
                )));
            }
            if !link.transform.is_finite() {
                return Err(geometry_err(format!(
                    "frame '{}' has a non-finite transform",
                    link.name
                )));
            }
            if let Some(g) = &link.geometry {
                validate_geometry(g)?;
            }
            known.insert(link.name.as_str());
        }

        Ok(WorldState {
            obstacles: self.cfg.obstacles.clone(),
            frames: held.to_vec(),
        })
    }

    /// Plan with seed retry.
    ///
    /// Attempt `n` (0-based) uses seed `initial_seed + n`. Cancellation and
    /// the deadline are checked before every attempt. A plan whose path and
    /// trajectory disagree in length counts as a failed attempt.
    pub fn plan(
        &self,
        planner: &dyn Planner,
        clock: &dyn Clock,
        goal: MotionGoal<'_>,
        cancel: &CancelToken,
    ) -> Result<Plan> {
        let attempts = self.cfg.max_plan_attempts;
        let mut last_cause = String::from("no planning attempts configured");
        for attempt in 0..attempts {
            cancel.check(clock)?;
            let seed = self.cfg.initial_seed.wrapping_add(u64::from(attempt));
            let request = PlanRequest {
                start: goal.start,
                goal: goal.pose,
                movable_frame: goal.movable_frame,
                world: goal.world,
                constraints: goal.constraints,
                seed,
            };
            match planner.plan(&request) {
                Ok(plan) if plan.is_consistent() => {
                    tracing::debug!(
                        attempt,
                        seed,
                        waypoints = plan.len(),
                        frame = goal.movable_frame,
                        constraints = goal.constraints.name(),
                        "planned"
                    );
                    return Ok(plan);
                }
                Ok(plan) => {
                    last_cause = format!(
                        "inconsistent plan: {} path poses vs {} trajectory points",
                        plan.path.len(),
                        plan.trajectory.len()
                    );
                }
                Err(e) => last_cause = e.to_string(),
            }
            tracing::warn!(attempt, seed, cause = %last_cause, "planning attempt failed");
        }
        Err(eyre::Report::new(PourError::PlanningFailure {
            attempts,
            cause: last_cause,
        }))
    }
}

/// Capsule frame for a held (or standing) item such as the bottle.
pub fn held_item_link(
    name: &str,
    parent: &str,
    transform: Pose,
    radius_mm: f64,
    length_mm: f64,
) -> FrameLink {
    FrameLink {
        name: name.to_string(),
        parent: parent.to_string(),
        transform,
        geometry: Some(Geometry {
            label: name.to_string(),
            pose: Pose::identity(),
            shape: Shape::Capsule {
                radius: radius_mm,
                length: length_mm,
            },
        }),
    }
}

fn geometry_err(msg: String) -> eyre::Report {
    eyre::Report::new(PourError::Geometry(msg))
}

fn validate_geometry(g: &Geometry) -> Result<()> {
    if g.label.is_empty() {
        return Err(geometry_err("geometry with empty label".to_string()));
    }
    if !g.pose.is_finite() {
        return Err(geometry_err(format!("'{}' has a non-finite pose", g.label)));
    }
    let dims: &[f64] = match &g.shape {
        Shape::Box { x, y, z } => &[*x, *y, *z],
        Shape::Capsule { radius, length } => &[*radius, *length],
    };
    if dims.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
        return Err(geometry_err(format!(
            "'{}' must have finite, positive dimensions",
            g.label
        )));
    }
    Ok(())
}
