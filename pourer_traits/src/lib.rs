//! Interfaces to the subsystems the pour engine drives but does not implement:
//! motion planning, arms, grippers, sensors and perception.
pub mod clock;
pub mod geometry;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use geometry::{
    BoundingBox, CameraIntrinsics, ConstraintProfile, FrameLink, Geometry, JointPositions, Plan,
    PointCloud, Pose, Reading, Shape, WorldState,
};

use std::collections::HashMap;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One planning call.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub start: &'a JointPositions,
    pub goal: &'a Pose,
    pub movable_frame: &'a str,
    pub world: &'a WorldState,
    pub constraints: &'a ConstraintProfile,
    pub seed: u64,
}

pub trait Planner: Send + Sync {
    fn plan(&self, request: &PlanRequest<'_>) -> Result<Plan, BoxError>;
}

pub trait Arm: Send {
    fn move_to_joint_positions(&mut self, positions: &JointPositions) -> Result<(), BoxError>;

    /// Follow a joint-space trajectory waypoint by waypoint.
    fn move_through_joint_positions(
        &mut self,
        waypoints: &[JointPositions],
    ) -> Result<(), BoxError> {
        for wp in waypoints {
            self.move_to_joint_positions(wp)?;
        }
        Ok(())
    }

    fn joint_positions(&mut self) -> Result<JointPositions, BoxError>;
}

pub trait Gripper: Send {
    fn open(&mut self) -> Result<(), BoxError>;
    /// Close on an object; `Ok(false)` when nothing was caught.
    fn grab(&mut self) -> Result<bool, BoxError>;
}

pub trait Sensor: Send {
    fn readings(&mut self) -> Result<HashMap<String, Reading>, BoxError>;
}

pub trait Detector: Send {
    fn detect(&mut self) -> Result<Vec<BoundingBox>, BoxError>;
}

pub trait PointCloudSource: Send {
    fn next_cloud(&mut self) -> Result<PointCloud, BoxError>;
}
