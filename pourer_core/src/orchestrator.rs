//! The pour demo macros: touch, pour prep, pour, put back, full demo, and the
//! multi-cup pouring process.
//!
//! Each macro builds a fresh `ActionSequence` from the arm's live joint state,
//! plans every motion up front, then executes. The only state carried between
//! macros is the prepared (grasped) bottle, which `pour` and `put_back` need.
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use nalgebra::Vector3;
use pourer_traits::{
    Arm, BoundingBox, Clock, ConstraintProfile, Detector, FrameLink, Gripper, JointPositions,
    PointCloudSource, Planner, Pose, Sensor, WorldState,
};

use crate::action::{Action, ActionSequence, Actuators, GripperCommand};
use crate::cancel::CancelToken;
use crate::cluster::ClusterStats;
use crate::config::PourerCfg;
use crate::error::{PourError, Result};
use crate::fork::{Task, fork_join};
use crate::hw_error::map_hw_error;
use crate::localize::{cloud_to_world, fit_cylinder, unproject_detections};
use crate::motion::{MotionGoal, MotionRequestBuilder, held_item_link};
use crate::ordering::sort_by_distance_descending;
use crate::pour_params::{PourParameterModel, PourParameters};
use crate::weight::{WeightSmoother, read_number};

/// Frame name of the bottle in world states.
pub const BOTTLE_FRAME: &str = "bottle";

/// Where the bottle is picked up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pickup {
    Far,
    Mid,
    Scale,
}

impl Pickup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Far => "far",
            Self::Mid => "mid",
            Self::Scale => "scale",
        }
    }
}

impl FromStr for Pickup {
    type Err = PourError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "far" => Ok(Self::Far),
            "mid" => Ok(Self::Mid),
            "scale" => Ok(Self::Scale),
            other => Err(PourError::Config(format!(
                "unknown pickup '{other}' (expected far, mid or scale)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PourOptions {
    pub pickup: Pickup,
    /// `false` plans everything and stops before moving.
    pub execute: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightReport {
    pub weight_g: f64,
    pub params: PourParameters,
}

/// Outcome of `start_pouring_process`.
#[derive(Debug, Clone, PartialEq)]
pub struct PourReport {
    /// Cup rims in service order.
    pub cups: Vec<Vector3<f64>>,
    pub weight: WeightReport,
    /// Planned actions, put-back included.
    pub actions: usize,
    pub executed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    pub samples: usize,
    pub mean: Vector3<f64>,
    pub std_dev: Vector3<f64>,
}

/// Result of probing every collaborator once.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfCheck {
    pub arm_joints: JointPositions,
    pub assist_joints: Option<JointPositions>,
    pub weight_g: Option<f64>,
    pub perception: &'static str,
}

/// Indices into a prep sequence that put-back reverses.
#[derive(Debug, Clone, PartialEq)]
struct PrepMarks {
    grasp: usize,
    lift: usize,
    pour_moves: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Prepared {
    sequence: ActionSequence,
    marks: PrepMarks,
    pickup: Pickup,
    weight: WeightReport,
}

/// Poses around the bottle for one pickup location.
struct GraspGeometry {
    base: Vector3<f64>,
    pregrasp: Pose,
    grasp: Pose,
    lift: Pose,
}

pub struct Orchestrator {
    pub(crate) planner: Box<dyn Planner>,
    pub(crate) arm: Box<dyn Arm>,
    pub(crate) gripper: Box<dyn Gripper>,
    pub(crate) assist: Option<Box<dyn Arm>>,
    pub(crate) scale: Option<Box<dyn Sensor>>,
    pub(crate) detector: Option<Box<dyn Detector>>,
    pub(crate) cloud: Option<Box<dyn PointCloudSource>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) cfg: PourerCfg,
    pub(crate) motion: MotionRequestBuilder,
    pub(crate) params: PourParameterModel,
    pub(crate) smoother: WeightSmoother,
    prepared: Option<Prepared>,
}

impl core::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("assist", &self.assist.is_some())
            .field("scale", &self.scale.is_some())
            .field("detector", &self.detector.is_some())
            .field("point_cloud", &self.cloud.is_some())
            .field("prepared", &self.prepared.as_ref().map(|p| p.pickup))
            .finish()
    }
}

fn hw(e: pourer_traits::BoxError) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        planner: Box<dyn Planner>,
        arm: Box<dyn Arm>,
        gripper: Box<dyn Gripper>,
        assist: Option<Box<dyn Arm>>,
        scale: Option<Box<dyn Sensor>>,
        detector: Option<Box<dyn Detector>>,
        cloud: Option<Box<dyn PointCloudSource>>,
        clock: Arc<dyn Clock>,
        cfg: PourerCfg,
        params: PourParameterModel,
    ) -> Self {
        let smoother = WeightSmoother::new(
            cfg.weight.samples,
            Duration::from_millis(cfg.weight.delay_ms),
        );
        Self {
            planner,
            arm,
            gripper,
            assist,
            scale,
            detector,
            cloud,
            clock,
            motion: MotionRequestBuilder::new(cfg.motion.clone()),
            cfg,
            params,
            smoother,
            prepared: None,
        }
    }

    pub fn config(&self) -> &PourerCfg {
        &self.cfg
    }

    pub fn pour_model(&self) -> &PourParameterModel {
        &self.params
    }

    /// Whether a bottle is held after a successful pour prep.
    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // ── Perception and sensing ──────────────────────────────────────────────

    /// Cup rim centers in the world frame, farthest first.
    ///
    /// Uses the detector when one is configured, the point-cloud cylinder fit
    /// otherwise. The cloud path yields at most one cup.
    pub fn locate_cups(&mut self) -> Result<Vec<Vector3<f64>>> {
        let camera = &self.cfg.camera;
        let mut cups: Vec<Vector3<f64>> = if let Some(detector) = self.detector.as_deref_mut() {
            let boxes: Vec<BoundingBox> = detector
                .detect()
                .map_err(hw)?
                .into_iter()
                .filter(|b| b.label == camera.cup_label)
                .collect();
            unproject_detections(&boxes, camera)
                .iter()
                .map(|p| camera.pose.transform_point(&p.position))
                .collect()
        } else if let Some(source) = self.cloud.as_deref_mut() {
            let cloud = source.next_cloud().map_err(hw)?;
            let obs = fit_cylinder(&cloud_to_world(&cloud, &camera.pose), &self.cfg.cylinder);
            if obs.found { vec![obs.top()] } else { Vec::new() }
        } else {
            return Err(eyre::Report::new(PourError::Config(
                "no detector or point-cloud source configured".into(),
            )));
        };
        sort_by_distance_descending(&mut cups);
        tracing::debug!(count = cups.len(), "cups located");
        Ok(cups)
    }

    /// Smoothed scale reading and the pour parameters it implies.
    pub fn read_weight(&mut self, cancel: &CancelToken) -> Result<WeightReport> {
        let Some(scale) = self.scale.as_deref_mut() else {
            return Err(eyre::Report::new(PourError::Config(
                "no scale configured".into(),
            )));
        };
        let weight_g =
            self.smoother
                .read_field(scale, &self.cfg.weight.field, self.clock.as_ref(), cancel)?;
        let params = self.params.parameters(weight_g.round() as i32);
        tracing::info!(
            weight_g,
            angle_offset_deg = params.angle_offset_deg,
            duration_ms = params.duration_ms,
            "bottle weighed"
        );
        Ok(WeightReport { weight_g, params })
    }

    /// Localize the single cup `samples` times and report the spread.
    /// Reporting only; nothing downstream consumes it.
    pub fn calibrate(&mut self, samples: usize, cancel: &CancelToken) -> Result<CalibrationReport> {
        if samples == 0 {
            return Err(eyre::Report::new(PourError::Config(
                "calibration needs at least one sample".into(),
            )));
        }
        let mut stats = ClusterStats::new();
        for _ in 0..samples {
            cancel.check(self.clock.as_ref())?;
            let cups = self.locate_cups()?;
            match cups.as_slice() {
                [cup] => stats.push(*cup),
                other => {
                    return Err(eyre::Report::new(PourError::LocalizationAmbiguous {
                        what: "cup",
                        found: other.len(),
                    }));
                }
            }
        }
        let (mean, std_dev) = (stats.mean(), stats.std_dev());
        tracing::info!(
            samples,
            mean_x = mean.x,
            mean_y = mean.y,
            mean_z = mean.z,
            sd_x = std_dev.x,
            sd_y = std_dev.y,
            sd_z = std_dev.z,
            "calibration done"
        );
        Ok(CalibrationReport {
            samples: stats.len(),
            mean,
            std_dev,
        })
    }

    /// Query every collaborator once without moving anything.
    pub fn self_check(&mut self) -> Result<SelfCheck> {
        let arm_joints = self.arm.joint_positions().map_err(hw)?;
        let assist_joints = match self.assist.as_deref_mut() {
            Some(a) => Some(a.joint_positions().map_err(hw)?),
            None => None,
        };
        let weight_g = match self.scale.as_deref_mut() {
            Some(s) => Some(read_number(s, &self.cfg.weight.field)?),
            None => None,
        };
        let perception = if self.detector.is_some() {
            "detector"
        } else if self.cloud.is_some() {
            "point_cloud"
        } else {
            "none"
        };
        Ok(SelfCheck {
            arm_joints,
            assist_joints,
            weight_g,
            perception,
        })
    }

    // ── Macros ──────────────────────────────────────────────────────────────

    /// Hover over the only cup, descend to just above its rim, and retrace.
    pub fn touch(&mut self, cancel: &CancelToken) -> Result<()> {
        tracing::info!("touch: start");
        let cups = self.locate_cups()?;
        let [cup] = cups.as_slice() else {
            return Err(eyre::Report::new(PourError::LocalizationAmbiguous {
                what: "cup",
                found: cups.len(),
            }));
        };
        let places = &self.cfg.places;
        let near = cup + Vector3::z() * places.touch_offset_mm;
        let above = near + Vector3::z() * places.approach_mm;

        let start = self.arm.joint_positions().map_err(hw)?;
        let world = self.motion.world_state(&[])?;
        let mut seq = ActionSequence::new(start);
        self.plan_to(&mut seq, &Pose::at(above), &world, &ConstraintProfile::Free, cancel)?;
        self.plan_to(&mut seq, &Pose::at(near), &world, &self.linear(), cancel)?;
        seq.add_reverse(0, 1)?;
        self.run(&seq, 0..seq.len(), cancel)?;
        tracing::info!("touch: done");
        Ok(())
    }

    /// Weigh, grasp the bottle at `pickup`, lift it, and carry it upright to
    /// the pour pose over the farthest cup.
    pub fn pour_prep(&mut self, pickup: Pickup, cancel: &CancelToken) -> Result<()> {
        if self.prepared.is_some() {
            return Err(eyre::Report::new(PourError::InvalidState(
                "a bottle is already held; put it back first".into(),
            )));
        }
        tracing::info!(pickup = pickup.as_str(), "pour prep: start");
        let weight = self.read_weight(cancel)?;
        let cups = self.locate_cups()?;
        let Some(&cup) = cups.first() else {
            return Err(eyre::Report::new(PourError::LocalizationAmbiguous {
                what: "cup",
                found: 0,
            }));
        };
        let start = self.arm.joint_positions().map_err(hw)?;
        let (sequence, marks) = self.plan_prep(start, pickup, &[cup], cancel)?;
        self.run(&sequence, 0..sequence.len(), cancel)?;
        self.prepared = Some(Prepared {
            sequence,
            marks,
            pickup,
            weight,
        });
        tracing::info!("pour prep: done");
        Ok(())
    }

    /// Tilt, hold for the weight-derived duration, and return upright.
    /// Requires a prior `pour_prep`.
    pub fn pour(&mut self, cancel: &CancelToken) -> Result<()> {
        let Some(prepared) = self.prepared.as_ref() else {
            return Err(eyre::Report::new(PourError::InvalidState(
                "pour requires a prepared bottle; run pour prep first".into(),
            )));
        };
        let params = prepared.weight.params;
        tracing::info!("pour: start");
        self.pour_step(params, cancel)?;
        tracing::info!("pour: done");
        Ok(())
    }

    /// Retrace the prep motions, release the bottle where it was picked up,
    /// and return home.
    pub fn put_back(&mut self, cancel: &CancelToken) -> Result<()> {
        let Some(prepared) = self.prepared.clone() else {
            return Err(eyre::Report::new(PourError::InvalidState(
                "put back requires a held bottle; run pour prep first".into(),
            )));
        };
        tracing::info!(pickup = prepared.pickup.as_str(), "put back: start");
        let mut seq = prepared.sequence;
        let range = self.plan_put_back(&mut seq, &prepared.marks, prepared.pickup, cancel)?;
        self.run(&seq, range, cancel)?;
        self.prepared = None;
        tracing::info!("put back: done");
        Ok(())
    }

    /// Touch, pour prep (far pickup), pour, put back. Stops at the first error.
    pub fn full_demo(&mut self, cancel: &CancelToken) -> Result<()> {
        tracing::info!("full demo: start");
        self.touch(cancel)?;
        self.pour_prep(Pickup::Far, cancel)?;
        self.pour(cancel)?;
        self.put_back(cancel)?;
        tracing::info!("full demo: done");
        Ok(())
    }

    /// Serve every located cup, farthest first, from one bottle.
    ///
    /// The whole cycle (grasp, one carry per cup, put back) is planned before
    /// anything moves. With `execute == false` the plan is only reported. The
    /// scale is re-read before every pour after the first.
    pub fn start_pouring_process(
        &mut self,
        opts: PourOptions,
        cancel: &CancelToken,
    ) -> Result<PourReport> {
        if self.prepared.is_some() {
            return Err(eyre::Report::new(PourError::InvalidState(
                "a bottle is already held; put it back first".into(),
            )));
        }
        tracing::info!(
            pickup = opts.pickup.as_str(),
            execute = opts.execute,
            "pouring process: start"
        );
        let cups = self.locate_cups()?;
        if cups.is_empty() {
            return Err(eyre::Report::new(PourError::LocalizationAmbiguous {
                what: "cup",
                found: 0,
            }));
        }
        let weight = self.read_weight(cancel)?;
        let start = self.arm.joint_positions().map_err(hw)?;
        let (mut seq, marks) = self.plan_prep(start, opts.pickup, &cups, cancel)?;
        self.plan_put_back(&mut seq, &marks, opts.pickup, cancel)?;

        let report = PourReport {
            cups,
            weight,
            actions: seq.len(),
            executed: opts.execute,
        };
        if !opts.execute {
            tracing::info!(actions = report.actions, "pouring process: planned only");
            return Ok(report);
        }

        let mut next = 0;
        for (i, &carry) in marks.pour_moves.iter().enumerate() {
            self.run(&seq, next..carry + 1, cancel)?;
            let params = if i == 0 {
                weight.params
            } else {
                self.read_weight(cancel)?.params
            };
            tracing::info!(cup = i, "pouring");
            self.pour_step(params, cancel)?;
            next = carry + 1;
        }
        self.run(&seq, next..seq.len(), cancel)?;
        tracing::info!(cups = report.cups.len(), "pouring process: done");
        Ok(report)
    }

    // ── Building blocks ─────────────────────────────────────────────────────

    fn linear(&self) -> ConstraintProfile {
        let m = self.motion.cfg();
        ConstraintProfile::Linear {
            line_tolerance_mm: m.line_tolerance_mm,
            orientation_tolerance_deg: m.line_orientation_tolerance_deg,
        }
    }

    fn carry(&self) -> ConstraintProfile {
        ConstraintProfile::OrientationOnly {
            tolerance_deg: self.cfg.pour.upright_tolerance_deg,
        }
    }

    fn grasp_geometry(&self, pickup: Pickup) -> GraspGeometry {
        let places = &self.cfg.places;
        let base = match pickup {
            Pickup::Far => places.pickup_far,
            Pickup::Mid => places.pickup_mid,
            Pickup::Scale => places.pickup_scale,
        };
        let grasp = base.translated(Vector3::z() * places.grasp_height_mm);
        // Approach along the line from the robot base to the bottle.
        let reach = Vector3::new(base.position.x, base.position.y, 0.0);
        let dir = if reach.norm() > 1e-9 {
            reach.normalize()
        } else {
            Vector3::y()
        };
        GraspGeometry {
            base: base.position,
            pregrasp: grasp.translated(-dir * places.approach_mm),
            lift: grasp.translated(Vector3::z() * places.lift_mm),
            grasp,
        }
    }

    /// Gripper pose that puts the bottle lip over `cup`.
    fn pour_pose(&self, cup: &Vector3<f64>) -> Pose {
        let pour = &self.cfg.pour;
        let toward_robot = Vector3::new(-cup.x, -cup.y, 0.0);
        let dir = if toward_robot.norm() > 1e-9 {
            toward_robot.normalize()
        } else {
            -Vector3::y()
        };
        Pose::at(cup + Vector3::z() * pour.pour_height_mm + dir * pour.lip_offset_mm)
    }

    fn standing_bottle(&self, g: &GraspGeometry) -> FrameLink {
        let p = &self.cfg.places;
        held_item_link(
            BOTTLE_FRAME,
            &self.motion.cfg().world_frame,
            Pose::at(g.base + Vector3::z() * (p.bottle_length_mm / 2.0)),
            p.bottle_radius_mm,
            p.bottle_length_mm,
        )
    }

    fn held_bottle(&self) -> FrameLink {
        let p = &self.cfg.places;
        held_item_link(
            BOTTLE_FRAME,
            &self.motion.cfg().gripper_frame,
            Pose::from_position(0.0, 0.0, p.bottle_length_mm / 2.0 - p.grasp_height_mm),
            p.bottle_radius_mm,
            p.bottle_length_mm,
        )
    }

    fn plan_to(
        &self,
        seq: &mut ActionSequence,
        pose: &Pose,
        world: &WorldState,
        constraints: &ConstraintProfile,
        cancel: &CancelToken,
    ) -> Result<()> {
        let frame = &self.motion.cfg().gripper_frame;
        let plan = self.motion.plan(
            self.planner.as_ref(),
            self.clock.as_ref(),
            MotionGoal {
                start: seq.current(),
                pose,
                movable_frame: frame,
                world,
                constraints,
            },
            cancel,
        )?;
        seq.add(Action::MotionPlan {
            target_frame: frame.clone(),
            plan,
        });
        Ok(())
    }

    /// Open, approach, grasp, lift, then one upright carry per cup.
    fn plan_prep(
        &self,
        start: JointPositions,
        pickup: Pickup,
        cups: &[Vector3<f64>],
        cancel: &CancelToken,
    ) -> Result<(ActionSequence, PrepMarks)> {
        let g = self.grasp_geometry(pickup);
        let standing = self.motion.world_state(&[self.standing_bottle(&g)])?;
        let held = self.motion.world_state(&[self.held_bottle()])?;
        let touch_bottle = ConstraintProfile::LinearWithAllowedCollision {
            frame_a: self.motion.cfg().gripper_frame.clone(),
            frame_b: BOTTLE_FRAME.to_string(),
        };

        let mut seq = ActionSequence::new(start);
        seq.add(Action::Gripper(GripperCommand::Open));
        self.plan_to(&mut seq, &g.pregrasp, &standing, &ConstraintProfile::Free, cancel)?;
        let grasp = seq.len();
        self.plan_to(&mut seq, &g.grasp, &standing, &touch_bottle, cancel)?;
        seq.add(Action::Gripper(GripperCommand::Grab));
        let lift = seq.len();
        self.plan_to(&mut seq, &g.lift, &held, &self.linear(), cancel)?;
        let mut pour_moves = Vec::with_capacity(cups.len());
        for cup in cups {
            pour_moves.push(seq.len());
            self.plan_to(&mut seq, &self.pour_pose(cup), &held, &self.carry(), cancel)?;
        }
        Ok((
            seq,
            PrepMarks {
                grasp,
                lift,
                pour_moves,
            },
        ))
    }

    /// Append the way back: retrace to the grasp pose, release, back out,
    /// go home. Returns the range of appended actions.
    fn plan_put_back(
        &self,
        seq: &mut ActionSequence,
        marks: &PrepMarks,
        pickup: Pickup,
        cancel: &CancelToken,
    ) -> Result<Range<usize>> {
        let from = seq.len();
        let single_carry_last =
            marks.pour_moves.len() == 1 && marks.pour_moves[0] + 1 == seq.len();
        if single_carry_last {
            // carry back to the lift pose, then lower
            seq.add_reverse(marks.lift, marks.pour_moves[0])?;
        } else {
            let held = self.motion.world_state(&[self.held_bottle()])?;
            let lift = self.grasp_geometry(pickup).lift;
            self.plan_to(seq, &lift, &held, &self.carry(), cancel)?;
            seq.add_reverse(marks.lift, marks.lift)?;
        }
        seq.add(Action::Gripper(GripperCommand::Open));
        seq.add_reverse(marks.grasp, marks.grasp)?;
        seq.add(Action::JointMove {
            target: self.cfg.places.home.clone(),
        });
        Ok(from..seq.len())
    }

    fn run(
        &mut self,
        seq: &ActionSequence,
        range: Range<usize>,
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut ctx = Actuators {
            arm: self.arm.as_mut(),
            gripper: self.gripper.as_mut(),
            clock: self.clock.as_ref(),
        };
        seq.execute_range(&mut ctx, range, cancel)
    }

    /// Move the pour arm and the assist arm together.
    fn both_arms(
        &mut self,
        arm_target: &JointPositions,
        assist_target: &JointPositions,
    ) -> Result<()> {
        let arm = self.arm.as_mut();
        let mut tasks: Vec<Task<'_>> = Vec::with_capacity(2);
        tasks.push((
            "pour_arm",
            Box::new(move || arm.move_to_joint_positions(arm_target)),
        ));
        match self.assist.as_deref_mut() {
            Some(assist) => tasks.push((
                "assist_arm",
                Box::new(move || assist.move_to_joint_positions(assist_target)),
            )),
            None => tracing::debug!("no assist arm; pour arm moves alone"),
        }
        fork_join(tasks).map_err(eyre::Report::new)
    }

    /// Tilt + balance, hold, upright + rest. An interrupted hold still tries
    /// to bring the bottle upright before reporting the interruption.
    fn pour_step(&mut self, params: PourParameters, cancel: &CancelToken) -> Result<()> {
        cancel.check(self.clock.as_ref())?;
        let upright = self.arm.joint_positions().map_err(hw)?;
        let wrist = self.cfg.pour.wrist_joint;
        let tilt_deg = self.cfg.pour.base_tilt_deg + params.angle_offset_deg;
        let mut tilted = upright.clone();
        let Some(joint) = tilted.0.get_mut(wrist) else {
            return Err(eyre::Report::new(PourError::Config(format!(
                "wrist joint {wrist} out of range for a {}-joint arm",
                upright.len()
            ))));
        };
        *joint += tilt_deg;
        let balance = self.cfg.assist.balance.clone();
        let rest = self.cfg.assist.rest.clone();

        tracing::info!(tilt_deg, duration_ms = params.duration_ms, "tilting");
        self.both_arms(&tilted, &balance)?;
        let hold = cancel.sleep(self.clock.as_ref(), Duration::from_millis(params.duration_ms));
        if let Err(e) = &hold {
            tracing::warn!(error = %e, "pour interrupted; returning upright");
        }
        let back = self.both_arms(&upright, &rest);
        match (hold, back) {
            (Err(e), back) => {
                if let Err(b) = back {
                    tracing::warn!(error = %b, "return to upright failed");
                }
                Err(eyre::Report::new(e))
            }
            (Ok(()), back) => back,
        }
    }
}
