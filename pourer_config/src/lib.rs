#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and pour-table parsing for the pour cell.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; an empty file yields the demo-cell defaults.
//! - The pour-table CSV loader enforces headers and per-row sanity; table
//!   shape (contiguity, continuity) is checked when the engine is built.
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One weight bucket of the pour table, as written in TOML or CSV.
///
/// Expected CSV headers:
/// lower_g,upper_g,angle_offset_deg,duration_lower_ms,duration_upper_ms
///
/// Example:
/// lower_g,upper_g,angle_offset_deg,duration_lower_ms,duration_upper_ms
/// 850,1000,0.0,1800,1500
/// 700,850,10.0,2200,1800
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct BucketRow {
    pub lower_g: i32,
    pub upper_g: i32,
    pub angle_offset_deg: f64,
    pub duration_lower_ms: u64,
    pub duration_upper_ms: u64,
}

pub const POUR_TABLE_HEADERS: [&str; 5] = [
    "lower_g",
    "upper_g",
    "angle_offset_deg",
    "duration_lower_ms",
    "duration_upper_ms",
];

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Box,
    Capsule,
}

/// Static obstacle. Boxes need `size`; capsules need `radius` and `length`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ObstacleCfg {
    pub label: String,
    pub kind: ShapeKind,
    #[serde(default)]
    pub position: [f64; 3],
    /// Roll, pitch, yaw in degrees.
    #[serde(default)]
    pub rpy_deg: [f64; 3],
    pub size: Option<[f64; 3]>,
    pub radius: Option<f64>,
    pub length: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MotionCfg {
    pub max_plan_attempts: u32,
    pub initial_seed: u64,
    pub world_frame: String,
    pub arm_frame: String,
    pub gripper_frame: String,
    pub extra_frames: Vec<String>,
    pub line_tolerance_mm: f64,
    pub line_orientation_tolerance_deg: f64,
    /// Replaces the built-in cell obstacles when present.
    pub obstacles: Option<Vec<ObstacleCfg>>,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            max_plan_attempts: 10,
            initial_seed: 0,
            world_frame: "world".into(),
            arm_frame: "arm".into(),
            gripper_frame: "gripper".into(),
            extra_frames: Vec::new(),
            line_tolerance_mm: 5.0,
            line_orientation_tolerance_deg: 2.0,
            obstacles: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PourCfg {
    pub wrist_joint: usize,
    pub base_tilt_deg: f64,
    pub pour_height_mm: f64,
    pub lip_offset_mm: f64,
    pub upright_tolerance_deg: f64,
    /// Inline table; the built-in table is used when neither this nor
    /// `table_csv` is set.
    pub buckets: Option<Vec<BucketRow>>,
    pub table_csv: Option<PathBuf>,
}

impl Default for PourCfg {
    fn default() -> Self {
        Self {
            wrist_joint: 3,
            base_tilt_deg: 90.0,
            pour_height_mm: 120.0,
            lip_offset_mm: 80.0,
            upright_tolerance_deg: 5.0,
            buckets: None,
            table_csv: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CameraCfg {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
    /// Camera origin in world (mm).
    pub position: [f64; 3],
    /// Camera orientation in world, roll/pitch/yaw degrees.
    pub rpy_deg: [f64; 3],
    pub camera_to_surface_mm: f64,
    pub object_height_mm: f64,
    pub cup_label: String,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            fx: 600.0,
            fy: 600.0,
            cx: 320.0,
            cy: 240.0,
            width: 640,
            height: 480,
            position: [0.0, 400.0, 1000.0],
            rpy_deg: [180.0, 0.0, 0.0],
            camera_to_surface_mm: 1000.0,
            object_height_mm: 100.0,
            cup_label: "cup".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CylinderCfg {
    pub roi_min: [f64; 3],
    pub roi_max: [f64; 3],
    pub ground_z_mm: f64,
    pub ground_margin_mm: f64,
    pub cluster_tolerance_mm: f64,
    pub min_points: usize,
    pub expected_radius_mm: f64,
    pub radius_tolerance_mm: f64,
    pub expected_height_mm: f64,
    pub height_tolerance_mm: f64,
}

impl Default for CylinderCfg {
    fn default() -> Self {
        Self {
            roi_min: [-600.0, -200.0, -10.0],
            roi_max: [600.0, 800.0, 400.0],
            ground_z_mm: 0.0,
            ground_margin_mm: 5.0,
            cluster_tolerance_mm: 15.0,
            min_points: 30,
            expected_radius_mm: 40.0,
            radius_tolerance_mm: 10.0,
            expected_height_mm: 100.0,
            height_tolerance_mm: 20.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WeightCfg {
    /// Numeric reading field that carries grams.
    pub field: String,
    pub samples: usize,
    pub delay_ms: u64,
}

impl Default for WeightCfg {
    fn default() -> Self {
        Self {
            field: "weight_g".into(),
            samples: 10,
            delay_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlacesCfg {
    pub home: Vec<f64>,
    pub pickup_far: [f64; 3],
    pub pickup_mid: [f64; 3],
    pub pickup_scale: [f64; 3],
    pub approach_mm: f64,
    pub lift_mm: f64,
    pub touch_offset_mm: f64,
    pub grasp_height_mm: f64,
    pub bottle_radius_mm: f64,
    pub bottle_length_mm: f64,
}

impl Default for PlacesCfg {
    fn default() -> Self {
        Self {
            home: vec![90.0, 400.0, 300.0, 0.0, 0.0, 0.0],
            pickup_far: [0.0, 650.0, 0.0],
            pickup_mid: [0.0, 500.0, 0.0],
            pickup_scale: [300.0, 350.0, 0.0],
            approach_mm: 100.0,
            lift_mm: 80.0,
            touch_offset_mm: 10.0,
            grasp_height_mm: 120.0,
            bottle_radius_mm: 40.0,
            bottle_length_mm: 250.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AssistCfg {
    /// Whether a second, counter-balancing arm is present.
    pub enabled: bool,
    pub balance: Vec<f64>,
    pub rest: Vec<f64>,
}

impl Default for AssistCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            balance: vec![0.0, -20.0, 40.0, 0.0, 30.0, 0.0],
            rest: vec![0.0; 6],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Perception {
    #[default]
    Detector,
    PointCloud,
}

/// Knobs of the simulated backends.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub bottle_weight_g: f64,
    /// Peak amplitude of the deterministic scale noise.
    pub weight_noise_g: f64,
    /// Cup base positions on the table (mm).
    pub cups: Vec<[f64; 3]>,
    pub cup_radius_mm: f64,
    pub cup_height_mm: f64,
    pub perception: Perception,
    /// Planning attempts with a seed below this value fail.
    pub planner_fail_seeds_below: u64,
    /// Waypoints per simulated plan.
    pub waypoints: usize,
    /// Per-waypoint move time of the simulated arms.
    pub move_delay_ms: u64,
    /// Whether the simulated gripper catches something on grab.
    pub grab_succeeds: bool,
    /// `false` simulates a scale that no longer answers (reads time out).
    pub scale_responds: bool,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            bottle_weight_g: 800.0,
            weight_noise_g: 3.0,
            cups: vec![[-250.0, 450.0, 0.0]],
            cup_radius_mm: 40.0,
            cup_height_mm: 100.0,
            perception: Perception::Detector,
            planner_fail_seeds_below: 0,
            waypoints: 8,
            move_delay_ms: 0,
            grab_succeeds: true,
            scale_responds: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RunnerCfg {
    /// Deadline for one CLI command in ms (0 = none).
    pub deadline_ms: u64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub motion: MotionCfg,
    pub pour: PourCfg,
    pub camera: CameraCfg,
    pub cylinder: CylinderCfg,
    pub weight: WeightCfg,
    pub places: PlacesCfg,
    pub assist: AssistCfg,
    pub sim: SimCfg,
    pub logging: Logging,
    pub runner: RunnerCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read a pour table CSV with exact headers (see `BucketRow`).
pub fn load_pour_table_csv(path: &Path) -> eyre::Result<Vec<BucketRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open pour table CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != POUR_TABLE_HEADERS {
        eyre::bail!(
            "pour table CSV must have headers '{}', got: {}",
            POUR_TABLE_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<BucketRow>().enumerate() {
        match rec {
            Ok(row) => {
                if row.lower_g >= row.upper_g {
                    eyre::bail!(
                        "CSV row {}: lower_g ({}) must be < upper_g ({})",
                        idx + 2,
                        row.lower_g,
                        row.upper_g
                    );
                }
                if !row.angle_offset_deg.is_finite() {
                    eyre::bail!("CSV row {}: angle_offset_deg must be finite", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("pour table CSV {:?} has no rows", path);
    }
    Ok(rows)
}

impl Config {
    /// The configured pour table: CSV file, inline buckets, or `None` for
    /// the built-in table.
    pub fn pour_buckets(&self) -> eyre::Result<Option<Vec<BucketRow>>> {
        match (&self.pour.table_csv, &self.pour.buckets) {
            (Some(path), _) => load_pour_table_csv(path).map(Some),
            (None, Some(rows)) => Ok(Some(rows.clone())),
            (None, None) => Ok(None),
        }
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Motion
        let m = &self.motion;
        if m.max_plan_attempts == 0 {
            eyre::bail!("motion.max_plan_attempts must be >= 1");
        }
        if m.world_frame.is_empty() || m.arm_frame.is_empty() || m.gripper_frame.is_empty() {
            eyre::bail!("motion frame names must not be empty");
        }
        if !(m.line_tolerance_mm > 0.0 && m.line_orientation_tolerance_deg > 0.0) {
            eyre::bail!("motion line tolerances must be > 0");
        }
        if let Some(obstacles) = &m.obstacles {
            for o in obstacles {
                validate_obstacle(o)?;
            }
        }

        // Pour
        let p = &self.pour;
        if p.wrist_joint >= self.places.home.len() {
            eyre::bail!(
                "pour.wrist_joint ({}) must index into places.home ({} joints)",
                p.wrist_joint,
                self.places.home.len()
            );
        }
        if !p.base_tilt_deg.is_finite() || !(p.upright_tolerance_deg > 0.0) {
            eyre::bail!("pour.base_tilt_deg must be finite and pour.upright_tolerance_deg > 0");
        }
        if p.pour_height_mm < 0.0 || p.lip_offset_mm < 0.0 {
            eyre::bail!("pour.pour_height_mm and pour.lip_offset_mm must be >= 0");
        }
        if p.table_csv.is_some() && p.buckets.is_some() {
            eyre::bail!("set either pour.buckets or pour.table_csv, not both");
        }
        if let Some(rows) = &p.buckets {
            if rows.is_empty() {
                eyre::bail!("pour.buckets must not be empty");
            }
            if rows.iter().any(|r| r.lower_g >= r.upper_g) {
                eyre::bail!("pour.buckets: lower_g must be < upper_g");
            }
        }

        // Camera
        let c = &self.camera;
        if !(c.fx > 0.0 && c.fy > 0.0) {
            eyre::bail!("camera.fx and camera.fy must be > 0");
        }
        if c.width == 0 || c.height == 0 {
            eyre::bail!("camera.width and camera.height must be > 0");
        }
        if !(c.camera_to_surface_mm > c.object_height_mm) {
            eyre::bail!("camera.camera_to_surface_mm must exceed camera.object_height_mm");
        }

        // Cylinder
        let cy = &self.cylinder;
        if (0..3).any(|i| cy.roi_min[i] >= cy.roi_max[i]) {
            eyre::bail!("cylinder.roi_min must be < cylinder.roi_max on every axis");
        }
        if !(cy.cluster_tolerance_mm > 0.0) {
            eyre::bail!("cylinder.cluster_tolerance_mm must be > 0");
        }
        if cy.min_points < 3 {
            eyre::bail!("cylinder.min_points must be >= 3");
        }
        if cy.radius_tolerance_mm < 0.0 || cy.height_tolerance_mm < 0.0 {
            eyre::bail!("cylinder tolerances must be >= 0");
        }

        // Weight
        if self.weight.samples == 0 {
            eyre::bail!("weight.samples must be >= 1");
        }
        if self.weight.field.is_empty() {
            eyre::bail!("weight.field must not be empty");
        }

        // Places
        let pl = &self.places;
        if pl.bottle_radius_mm <= 0.0 || pl.bottle_length_mm <= 0.0 {
            eyre::bail!("places.bottle_radius_mm and places.bottle_length_mm must be > 0");
        }
        if pl.approach_mm < 0.0 || pl.lift_mm < 0.0 || pl.touch_offset_mm < 0.0 {
            eyre::bail!("places offsets must be >= 0");
        }

        // Assist
        if self.assist.enabled && self.assist.balance.len() != self.assist.rest.len() {
            eyre::bail!("assist.balance and assist.rest must have the same joint count");
        }

        // Sim
        if self.sim.weight_noise_g < 0.0 {
            eyre::bail!("sim.weight_noise_g must be >= 0");
        }
        if self.sim.waypoints < 2 {
            eyre::bail!("sim.waypoints must be >= 2");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{r}'");
        }

        Ok(())
    }
}

fn validate_obstacle(o: &ObstacleCfg) -> eyre::Result<()> {
    if o.label.is_empty() {
        eyre::bail!("motion.obstacles: label must not be empty");
    }
    let dims: Vec<f64> = match o.kind {
        ShapeKind::Box => match o.size {
            Some(s) => s.to_vec(),
            None => eyre::bail!("motion.obstacles '{}': box needs size", o.label),
        },
        ShapeKind::Capsule => match (o.radius, o.length) {
            (Some(r), Some(l)) => vec![r, l],
            _ => eyre::bail!(
                "motion.obstacles '{}': capsule needs radius and length",
                o.label
            ),
        },
    };
    if dims.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
        eyre::bail!(
            "motion.obstacles '{}': dimensions must be finite and > 0",
            o.label
        );
    }
    Ok(())
}
