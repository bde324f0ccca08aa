#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Pour orchestration engine (hardware-agnostic).
//!
//! All robot interactions go through the traits in `pourer_traits`: planner,
//! arms, gripper, scale, detector, point-cloud source and clock.
//!
//! ## Architecture
//!
//! - **Actions** (`action`): tagged actions, reversible append-only sequences,
//!   fail-fast execution
//! - **Motion** (`motion`): world-state construction and the bounded,
//!   cancellable seed-retry planning loop
//! - **Pour table** (`pour_params`): bottle weight to tilt offset and duration
//! - **Localization** (`localize`): box unprojection and cylinder fitting
//! - **Sensing** (`weight`, `cluster`): smoothed weight, point statistics
//! - **Macros** (`orchestrator`): touch, pour prep, pour, put back, full demo,
//!   multi-cup pouring process
//!
//! ## Units
//!
//! Millimetres for lengths, degrees for joints and angular tolerances,
//! grams for weight, milliseconds for durations.

pub mod action;
pub mod builder;
pub mod cancel;
pub mod cluster;
pub mod config;
pub mod conversions;
pub mod error;
pub mod fork;
pub mod hw_error;
pub mod localize;
pub mod mocks;
pub mod motion;
pub mod orchestrator;
pub mod ordering;
pub mod pour_params;
pub mod weight;

pub use action::{Action, ActionSequence, Actuators, GripperCommand};
pub use builder::OrchestratorBuilder;
pub use cancel::CancelToken;
pub use cluster::ClusterStats;
pub use config::PourerCfg;
pub use error::{BuildError, PourError, Report, Result};
pub use localize::CupObservation;
pub use motion::{MotionGoal, MotionRequestBuilder};
pub use orchestrator::{
    CalibrationReport, Orchestrator, Pickup, PourOptions, PourReport, SelfCheck, WeightReport,
};
pub use pour_params::{PourParameterModel, PourParameters, WeightBucket};
pub use weight::WeightSmoother;
