//! Type-state builder for `Orchestrator`.
//!
//! The builder enforces at compile time that a planner, an arm and a gripper
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use pourer_traits::{
    Arm, Clock, Detector, Gripper, MonotonicClock, Planner, PointCloudSource, Sensor,
};

use crate::config::PourerCfg;
use crate::error::{BuildError, Result};
use crate::orchestrator::Orchestrator;
use crate::pour_params::PourParameterModel;

impl Orchestrator {
    /// Start building an Orchestrator.
    pub fn builder() -> OrchestratorBuilder<Missing, Missing, Missing> {
        OrchestratorBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Orchestrator`. Configuration is validated on `build()`.
pub struct OrchestratorBuilder<P, A, G> {
    planner: Option<Box<dyn Planner>>,
    arm: Option<Box<dyn Arm>>,
    gripper: Option<Box<dyn Gripper>>,
    assist: Option<Box<dyn Arm>>,
    scale: Option<Box<dyn Sensor>>,
    detector: Option<Box<dyn Detector>>,
    cloud: Option<Box<dyn PointCloudSource>>,
    clock: Option<Arc<dyn Clock>>,
    cfg: Option<PourerCfg>,
    _p: PhantomData<P>,
    _a: PhantomData<A>,
    _g: PhantomData<G>,
}

impl Default for OrchestratorBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            planner: None,
            arm: None,
            gripper: None,
            assist: None,
            scale: None,
            detector: None,
            cloud: None,
            clock: None,
            cfg: None,
            _p: PhantomData,
            _a: PhantomData,
            _g: PhantomData,
        }
    }
}

/// Static checks on a runtime configuration. Bucket tables are checked by
/// `PourParameterModel::new`.
fn validate(cfg: &PourerCfg) -> Result<()> {
    let invalid = |msg| Err(eyre::Report::new(BuildError::InvalidConfig(msg)));
    if cfg.motion.max_plan_attempts == 0 {
        return invalid("max_plan_attempts must be >= 1");
    }
    let k = &cfg.camera.intrinsics;
    if !(k.fx > 0.0 && k.fy > 0.0 && k.fx.is_finite() && k.fy.is_finite()) {
        return invalid("camera focal lengths must be finite and > 0");
    }
    if !(cfg.camera.camera_to_surface_mm > cfg.camera.object_height_mm) {
        return invalid("camera must sit above the assumed object height");
    }
    if cfg.weight.samples == 0 {
        return invalid("weight samples must be >= 1");
    }
    if cfg.pour.wrist_joint >= cfg.places.home.len() {
        return invalid("wrist joint index outside the arm's joints");
    }
    if !(cfg.pour.base_tilt_deg.is_finite() && cfg.pour.upright_tolerance_deg > 0.0) {
        return invalid("pour tilt must be finite and upright tolerance > 0");
    }
    let cyl = &cfg.cylinder;
    if (0..3).any(|i| cyl.roi_min[i] >= cyl.roi_max[i]) {
        return invalid("cylinder region of interest is empty");
    }
    if !(cyl.cluster_tolerance_mm > 0.0) {
        return invalid("cluster tolerance must be > 0");
    }
    Ok(())
}

impl<P, A, G> OrchestratorBuilder<P, A, G> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Orchestrator> {
        let planner = self
            .planner
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPlanner))?;
        let arm = self
            .arm
            .ok_or_else(|| eyre::Report::new(BuildError::MissingArm))?;
        let gripper = self
            .gripper
            .ok_or_else(|| eyre::Report::new(BuildError::MissingGripper))?;

        let cfg = self.cfg.unwrap_or_default();
        validate(&cfg)?;
        let params = PourParameterModel::new(cfg.pour.buckets.clone())?;
        let clock: Arc<dyn Clock> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(Orchestrator::from_parts(
            planner,
            arm,
            gripper,
            self.assist,
            self.scale,
            self.detector,
            self.cloud,
            clock,
            cfg,
            params,
        ))
    }
}

/// Chainable setters that do not affect type-state.
impl<P, A, G> OrchestratorBuilder<P, A, G> {
    pub fn with_config(mut self, cfg: PourerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }
    /// Second arm that counter-balances the pour.
    pub fn with_assist_arm(mut self, arm: impl Arm + 'static) -> Self {
        self.assist = Some(Box::new(arm));
        self
    }
    pub fn with_scale(mut self, scale: impl Sensor + 'static) -> Self {
        self.scale = Some(Box::new(scale));
        self
    }
    /// Takes precedence over a point-cloud source for localization.
    pub fn with_detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }
    pub fn with_point_cloud(mut self, source: impl PointCloudSource + 'static) -> Self {
        self.cloud = Some(Box::new(source));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<A, G> OrchestratorBuilder<Missing, A, G> {
    pub fn with_planner(self, planner: impl Planner + 'static) -> OrchestratorBuilder<Set, A, G> {
        OrchestratorBuilder {
            planner: Some(Box::new(planner)),
            arm: self.arm,
            gripper: self.gripper,
            assist: self.assist,
            scale: self.scale,
            detector: self.detector,
            cloud: self.cloud,
            clock: self.clock,
            cfg: self.cfg,
            _p: PhantomData,
            _a: PhantomData,
            _g: PhantomData,
        }
    }
}

impl<P, G> OrchestratorBuilder<P, Missing, G> {
    pub fn with_arm(self, arm: impl Arm + 'static) -> OrchestratorBuilder<P, Set, G> {
        OrchestratorBuilder {
            planner: self.planner,
            arm: Some(Box::new(arm)),
            gripper: self.gripper,
            assist: self.assist,
            scale: self.scale,
            detector: self.detector,
            cloud: self.cloud,
            clock: self.clock,
            cfg: self.cfg,
            _p: PhantomData,
            _a: PhantomData,
            _g: PhantomData,
        }
    }
}

impl<P, A> OrchestratorBuilder<P, A, Missing> {
    pub fn with_gripper(self, gripper: impl Gripper + 'static) -> OrchestratorBuilder<P, A, Set> {
        OrchestratorBuilder {
            planner: self.planner,
            arm: self.arm,
            gripper: Some(Box::new(gripper)),
            assist: self.assist,
            scale: self.scale,
            detector: self.detector,
            cloud: self.cloud,
            clock: self.clock,
            cfg: self.cfg,
            _p: PhantomData,
            _a: PhantomData,
            _g: PhantomData,
        }
    }
}

impl OrchestratorBuilder<Set, Set, Set> {
    /// Validate and build. Only available when planner, arm and gripper are set.
    pub fn build(self) -> Result<Orchestrator> {
        self.try_build()
    }
}
