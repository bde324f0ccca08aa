//! Simulated planner, arm and gripper.
//!
//! Toy kinematics: the first three joints carry the gripper position in
//! millimetres, the remaining joints (wrist and beyond) are left as they
//! were. Good enough to drive the orchestrator end to end and to see where
//! the arm went.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nalgebra::{Point3, Vector3};
use pourer_traits::{
    Arm, BoxError, Clock, ConstraintProfile, Gripper, JointPositions, Plan, PlanRequest, Planner,
    Pose, Shape, WorldState,
};

use crate::error::HwError;

pub struct SimPlanner {
    world_frame: String,
    waypoints: usize,
    fail_seeds_below: u64,
}

impl SimPlanner {
    pub fn new(world_frame: impl Into<String>, waypoints: usize) -> Self {
        Self {
            world_frame: world_frame.into(),
            waypoints: waypoints.max(2),
            fail_seeds_below: 0,
        }
    }

    /// Every attempt seeded below `seed` reports no path.
    pub fn failing_seeds_below(mut self, seed: u64) -> Self {
        self.fail_seeds_below = seed;
        self
    }

    /// First world-fixed geometry containing `p`, skipping frames the
    /// constraints allow contact with.
    fn collision(&self, world: &WorldState, allowed: &[&str], p: &Vector3<f64>) -> Option<String> {
        let fixed = world
            .frames
            .iter()
            .filter(|f| f.parent == self.world_frame && !allowed.contains(&f.name.as_str()))
            .filter_map(|f| {
                f.geometry
                    .as_ref()
                    .map(|g| (g.label.as_str(), f.transform.compose(&g.pose), g.shape))
            });
        world
            .obstacles
            .iter()
            .map(|g| (g.label.as_str(), g.pose, g.shape))
            .chain(fixed)
            .find(|(_, pose, shape)| contains(pose, shape, p))
            .map(|(label, _, _)| label.to_string())
    }
}

fn contains(pose: &Pose, shape: &Shape, p: &Vector3<f64>) -> bool {
    let local = pose.to_isometry().inverse_transform_point(&Point3::from(*p)).coords;
    match *shape {
        Shape::Box { x, y, z } => {
            local.x.abs() <= x / 2.0 && local.y.abs() <= y / 2.0 && local.z.abs() <= z / 2.0
        }
        Shape::Capsule { radius, length } => {
            let along = local.z.clamp(-length / 2.0, length / 2.0);
            (local - Vector3::new(0.0, 0.0, along)).norm() <= radius
        }
    }
}

fn allowed_frames<'a>(c: &'a ConstraintProfile, out: &mut Vec<&'a str>) {
    match c {
        ConstraintProfile::LinearWithAllowedCollision { frame_a, frame_b } => {
            out.push(frame_a);
            out.push(frame_b);
        }
        ConstraintProfile::Combined(parts) => {
            for part in parts {
                allowed_frames(part, out);
            }
        }
        _ => {}
    }
}

impl Planner for SimPlanner {
    fn plan(&self, req: &PlanRequest<'_>) -> Result<Plan, BoxError> {
        tracing::debug!(
            seed = req.seed,
            frame = req.movable_frame,
            constraints = req.constraints.name(),
            "sim plan"
        );
        if req.seed < self.fail_seeds_below {
            return Err(Box::new(HwError::NoPath { seed: req.seed }));
        }
        let mut allowed = Vec::new();
        allowed_frames(req.constraints, &mut allowed);
        if let Some(label) = self.collision(req.world, &allowed, &req.goal.position) {
            return Err(Box::new(HwError::GoalInCollision(label)));
        }

        let start = req.start.as_slice();
        let mut end = start.to_vec();
        end.resize(end.len().max(3), 0.0);
        end[..3].copy_from_slice(req.goal.position.as_slice());

        let n = self.waypoints;
        let mut plan = Plan::default();
        for i in 0..n {
            let t = i as f64 / (n - 1) as f64;
            let joints: Vec<f64> = end
                .iter()
                .enumerate()
                .map(|(k, e)| {
                    let s = start.get(k).copied().unwrap_or(0.0);
                    s + (e - s) * t
                })
                .collect();
            let at = Vector3::new(joints[0], joints[1], joints[2]);
            plan.path.push(Pose::new(at, req.goal.orientation));
            plan.trajectory.push(JointPositions::new(joints));
        }
        Ok(plan)
    }
}

/// Arm whose joint state lives behind a shared handle.
pub struct SimArm {
    name: &'static str,
    state: Arc<Mutex<JointPositions>>,
    clock: Arc<dyn Clock>,
    move_delay: Duration,
}

impl SimArm {
    pub fn new(name: &'static str, start: JointPositions, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(start)),
            clock,
            move_delay: Duration::ZERO,
        }
    }

    /// Time each move takes on the arm's clock.
    pub fn with_move_delay(mut self, delay: Duration) -> Self {
        self.move_delay = delay;
        self
    }

    /// Shared view of the joint state, still valid after the arm is boxed.
    pub fn handle(&self) -> Arc<Mutex<JointPositions>> {
        self.state.clone()
    }
}

impl Arm for SimArm {
    fn move_to_joint_positions(&mut self, positions: &JointPositions) -> Result<(), BoxError> {
        if positions.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(Box::new(HwError::Fault(format!(
                "{}: non-finite joint target",
                self.name
            ))));
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| HwError::Fault(format!("{}: state poisoned", self.name)))?;
        if state.len() != positions.len() {
            return Err(Box::new(HwError::Fault(format!(
                "{}: expected {} joints, got {}",
                self.name,
                state.len(),
                positions.len()
            ))));
        }
        self.clock.sleep(self.move_delay);
        *state = positions.clone();
        tracing::trace!(arm = self.name, joints = ?positions.as_slice(), "sim move");
        Ok(())
    }

    fn joint_positions(&mut self) -> Result<JointPositions, BoxError> {
        let state = self
            .state
            .lock()
            .map_err(|_| HwError::Fault(format!("{}: state poisoned", self.name)))?;
        Ok(state.clone())
    }
}

/// Gripper that either always catches the bottle or always closes empty.
#[derive(Debug)]
pub struct SimGripper {
    catches: bool,
    holding: bool,
}

impl SimGripper {
    pub fn new(catches: bool) -> Self {
        Self {
            catches,
            holding: false,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }
}

impl Gripper for SimGripper {
    fn open(&mut self) -> Result<(), BoxError> {
        self.holding = false;
        tracing::debug!("sim gripper open");
        Ok(())
    }

    fn grab(&mut self) -> Result<bool, BoxError> {
        self.holding = self.catches;
        tracing::debug!(holding = self.holding, "sim gripper grab");
        Ok(self.holding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pourer_traits::{FrameLink, Geometry, ManualClock};
    use rstest::rstest;

    fn table() -> Geometry {
        Geometry {
            label: "table".into(),
            pose: Pose::from_position(0.0, 0.0, -10.0),
            shape: Shape::Box {
                x: 1000.0,
                y: 1000.0,
                z: 20.0,
            },
        }
    }

    fn bottle() -> FrameLink {
        FrameLink {
            name: "bottle".into(),
            parent: "world".into(),
            transform: Pose::from_position(0.0, 500.0, 125.0),
            geometry: Some(Geometry {
                label: "bottle".into(),
                pose: Pose::identity(),
                shape: Shape::Capsule {
                    radius: 40.0,
                    length: 250.0,
                },
            }),
        }
    }

    fn request<'a>(
        start: &'a JointPositions,
        goal: &'a Pose,
        world: &'a WorldState,
        constraints: &'a ConstraintProfile,
        seed: u64,
    ) -> PlanRequest<'a> {
        PlanRequest {
            start,
            goal,
            movable_frame: "gripper",
            world,
            constraints,
            seed,
        }
    }

    #[test]
    fn plan_ends_at_goal_and_keeps_wrist() {
        let planner = SimPlanner::new("world", 5);
        let start = JointPositions::new([0.0, 0.0, 300.0, 45.0]);
        let goal = Pose::from_position(100.0, 200.0, 150.0);
        let world = WorldState::default();
        let plan = planner
            .plan(&request(&start, &goal, &world, &ConstraintProfile::Free, 0))
            .unwrap();
        assert_eq!(plan.len(), 5);
        assert!(plan.is_consistent());
        assert_eq!(plan.trajectory[0], start);
        assert_eq!(plan.end(), Some(&JointPositions::new([100.0, 200.0, 150.0, 45.0])));
    }

    #[test]
    fn low_seeds_fail_until_threshold() {
        let planner = SimPlanner::new("world", 3).failing_seeds_below(2);
        let start = JointPositions::new([0.0; 6]);
        let goal = Pose::from_position(0.0, 0.0, 100.0);
        let world = WorldState::default();
        for seed in 0..2 {
            let err = planner
                .plan(&request(&start, &goal, &world, &ConstraintProfile::Free, seed))
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<HwError>(),
                Some(HwError::NoPath { .. })
            ));
        }
        assert!(planner
            .plan(&request(&start, &goal, &world, &ConstraintProfile::Free, 2))
            .is_ok());
    }

    fn touch_bottle() -> ConstraintProfile {
        ConstraintProfile::LinearWithAllowedCollision {
            frame_a: "gripper".into(),
            frame_b: "bottle".into(),
        }
    }

    fn held_bottle() -> FrameLink {
        FrameLink {
            parent: "gripper".into(),
            ..bottle()
        }
    }

    #[rstest]
    #[case::clear_goal(
        vec![table()],
        vec![],
        (0.0, 0.0, 100.0),
        ConstraintProfile::Free,
        None
    )]
    #[case::goal_in_table(
        vec![table()],
        vec![],
        (0.0, 0.0, -5.0),
        ConstraintProfile::Free,
        Some("table")
    )]
    #[case::standing_bottle_blocks(
        vec![table()],
        vec![bottle()],
        (0.0, 500.0, 120.0),
        ConstraintProfile::Free,
        Some("bottle")
    )]
    #[case::allowed_contact(
        vec![table()],
        vec![bottle()],
        (0.0, 500.0, 120.0),
        touch_bottle(),
        None
    )]
    #[case::allowed_inside_combined(
        vec![table()],
        vec![bottle()],
        (0.0, 500.0, 120.0),
        ConstraintProfile::Combined(vec![
            touch_bottle(),
            ConstraintProfile::OrientationOnly { tolerance_deg: 5.0 },
        ]),
        None
    )]
    #[case::attached_frame_ignored(
        vec![],
        vec![held_bottle()],
        (0.0, 500.0, 120.0),
        ConstraintProfile::Free,
        None
    )]
    fn goal_collision_cases(
        #[case] obstacles: Vec<Geometry>,
        #[case] frames: Vec<FrameLink>,
        #[case] goal: (f64, f64, f64),
        #[case] constraints: ConstraintProfile,
        #[case] blocked_by: Option<&str>,
    ) {
        let planner = SimPlanner::new("world", 3);
        let start = JointPositions::new([0.0; 6]);
        let goal = Pose::from_position(goal.0, goal.1, goal.2);
        let world = WorldState { obstacles, frames };
        let result = planner.plan(&request(&start, &goal, &world, &constraints, 0));
        match (result, blocked_by) {
            (Ok(plan), None) => assert!(plan.is_consistent()),
            (Err(e), Some(label)) => {
                assert_eq!(e.to_string(), format!("goal collides with '{label}'"))
            }
            (r, expected) => panic!("expected {expected:?}, got {:?}", r.map(|p| p.len())),
        }
    }

    #[test]
    fn arm_moves_take_clock_time() {
        let clock = Arc::new(ManualClock::new());
        let mut arm = SimArm::new("arm", JointPositions::new([0.0; 3]), clock.clone())
            .with_move_delay(Duration::from_millis(40));
        let handle = arm.handle();
        let path = [
            JointPositions::new([1.0, 0.0, 0.0]),
            JointPositions::new([2.0, 0.0, 0.0]),
        ];
        arm.move_through_joint_positions(&path).unwrap();
        assert_eq!(*handle.lock().unwrap(), path[1]);
        assert_eq!(clock.elapsed(), Duration::from_millis(80));
    }

    #[rstest]
    #[case::too_few(vec![0.0; 3], "device fault: assist: expected 6 joints, got 3")]
    #[case::too_many(vec![0.0; 7], "device fault: assist: expected 6 joints, got 7")]
    #[case::non_finite(
        vec![0.0, f64::NAN, 0.0, 0.0, 0.0, 0.0],
        "device fault: assist: non-finite joint target"
    )]
    fn arm_rejects_bad_targets(#[case] target: Vec<f64>, #[case] message: &str) {
        let clock = Arc::new(ManualClock::new());
        let mut arm = SimArm::new("assist", JointPositions::new([0.0; 6]), clock);
        let err = arm
            .move_to_joint_positions(&JointPositions::new(target))
            .unwrap_err();
        assert_eq!(err.to_string(), message);
        assert_eq!(arm.joint_positions().unwrap(), JointPositions::new([0.0; 6]));
    }

    #[test]
    fn gripper_reports_configured_outcome() {
        let mut g = SimGripper::new(false);
        assert!(!g.grab().unwrap());
        let mut g = SimGripper::new(true);
        assert!(g.grab().unwrap());
        assert!(g.is_holding());
        g.open().unwrap();
        assert!(!g.is_holding());
    }
}
