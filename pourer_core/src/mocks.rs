//! Test and helper mocks for pourer_core
//!
//! In-memory collaborators with shared logs, so a test can hand one to the
//! orchestrator and still inspect what happened afterwards.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pourer_traits::{
    Arm, BoundingBox, BoxError, Detector, Gripper, JointPositions, Plan, PlanRequest, Planner,
    PointCloud, PointCloudSource, Pose, Reading, Sensor,
};

/// Straight-line planner over a toy joint space: the first three joints
/// track the goal position, the rest are carried over from the start.
pub struct LinePlanner {
    pub waypoints: usize,
    /// Attempts whose seed is below this fail.
    pub fail_seeds_below: u64,
    requests: Arc<Mutex<Vec<(u64, &'static str)>>>,
}

impl LinePlanner {
    pub fn new(waypoints: usize) -> Self {
        Self {
            waypoints: waypoints.max(2),
            fail_seeds_below: 0,
            requests: Arc::default(),
        }
    }

    /// `(seed, constraint profile name)` of every request seen.
    pub fn requests(&self) -> Arc<Mutex<Vec<(u64, &'static str)>>> {
        self.requests.clone()
    }
}

impl Planner for LinePlanner {
    fn plan(&self, req: &PlanRequest<'_>) -> Result<Plan, BoxError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push((req.seed, req.constraints.name()));
        }
        if req.seed < self.fail_seeds_below {
            return Err(format!("no path found (seed {})", req.seed).into());
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
            plan.path.push(Pose::from_position(joints[0], joints[1], joints[2]));
            plan.trajectory.push(JointPositions::new(joints));
        }
        Ok(plan)
    }
}

/// Arm that records every commanded configuration.
#[derive(Clone)]
pub struct RecordingArm {
    state: Arc<Mutex<Vec<JointPositions>>>,
    fail_after: Option<usize>,
}

impl RecordingArm {
    pub fn new(start: JointPositions) -> Self {
        Self {
            state: Arc::new(Mutex::new(vec![start])),
            fail_after: None,
        }
    }

    /// Fail every move once `n` moves have succeeded.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Configurations visited, starting with the initial one.
    pub fn history(&self) -> Vec<JointPositions> {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Arm for RecordingArm {
    fn move_to_joint_positions(&mut self, positions: &JointPositions) -> Result<(), BoxError> {
        let mut s = self.state.lock().map_err(|_| "arm state poisoned")?;
        if self.fail_after.is_some_and(|n| s.len() > n) {
            return Err("arm fault".into());
        }
        s.push(positions.clone());
        Ok(())
    }

    fn joint_positions(&mut self) -> Result<JointPositions, BoxError> {
        let s = self.state.lock().map_err(|_| "arm state poisoned")?;
        Ok(s.last().cloned().unwrap_or_default())
    }
}

/// Gripper that logs commands and reports a configurable grab outcome.
#[derive(Clone)]
pub struct RecordingGripper {
    log: Arc<Mutex<Vec<&'static str>>>,
    holds: bool,
}

impl RecordingGripper {
    pub fn new(holds: bool) -> Self {
        Self {
            log: Arc::default(),
            holds,
        }
    }

    pub fn log(&self) -> Vec<&'static str> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, what: &'static str) -> Result<(), BoxError> {
        self.log
            .lock()
            .map_err(|_| "gripper log poisoned")?
            .push(what);
        Ok(())
    }
}

impl Gripper for RecordingGripper {
    fn open(&mut self) -> Result<(), BoxError> {
        self.push("open")
    }

    fn grab(&mut self) -> Result<bool, BoxError> {
        self.push("grab")?;
        Ok(self.holds)
    }
}

/// Sensor returning the same numeric field on every read.
pub struct FixedScale {
    pub field: String,
    pub grams: f64,
}

impl Sensor for FixedScale {
    fn readings(&mut self) -> Result<HashMap<String, Reading>, BoxError> {
        Ok(HashMap::from([(self.field.clone(), Reading::Number(self.grams))]))
    }
}

/// Detector returning the same boxes on every call.
pub struct FixedDetector(pub Vec<BoundingBox>);

impl Detector for FixedDetector {
    fn detect(&mut self) -> Result<Vec<BoundingBox>, BoxError> {
        Ok(self.0.clone())
    }
}

/// Point-cloud source returning the same cloud on every call.
pub struct FixedCloud(pub PointCloud);

impl PointCloudSource for FixedCloud {
    fn next_cloud(&mut self) -> Result<PointCloud, BoxError> {
        Ok(self.0.clone())
    }
}
