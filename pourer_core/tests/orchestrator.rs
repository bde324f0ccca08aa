mod common;

use std::time::Duration;

use common::{cloud_rig, cup_cloud, rig, rig_with, cup_box};
use pourer_core::config::PourerCfg;
use pourer_core::mocks::LinePlanner;
use pourer_core::{CancelToken, Pickup, PourError, PourOptions};
use pourer_traits::JointPositions;
use rstest::rstest;

const WRIST: usize = 3;

fn pour_error(err: &eyre::Report) -> &PourError {
    err.downcast_ref::<PourError>()
        .unwrap_or_else(|| panic!("expected PourError, got {err:?}"))
}

fn tilted(history: &[JointPositions]) -> usize {
    history.iter().filter(|j| j.0[WRIST] > 45.0).count()
}

#[test]
fn touch_goes_down_and_retraces() {
    let mut r = rig(&[(-250.0, 450.0)], 800.0);
    r.orch.touch(&CancelToken::new()).unwrap();

    let history = r.arm.history();
    let home = PourerCfg::default().places.home;
    // 2 plans out, 2 mirrored back, 8 waypoints each
    assert_eq!(history.len(), 1 + 4 * 8);
    assert_eq!(history.last(), Some(&home));
    // lowest point sits touch_offset above the rim
    let lowest = history.iter().map(|j| j.0[2]).fold(f64::INFINITY, f64::min);
    assert!((lowest - 110.0).abs() < 1e-6, "lowest={lowest}");
    assert!(r.gripper.log().is_empty());
}

#[rstest]
#[case(&[], 0)]
#[case(&[(-250.0, 450.0), (250.0, 500.0)], 2)]
fn touch_needs_exactly_one_cup(#[case] cups: &[(f64, f64)], #[case] found: usize) {
    let mut r = rig(cups, 800.0);
    let err = r.orch.touch(&CancelToken::new()).unwrap_err();
    assert_eq!(
        pour_error(&err),
        &PourError::LocalizationAmbiguous { what: "cup", found }
    );
    assert_eq!(r.arm.history().len(), 1);
}

#[test]
fn pour_and_put_back_need_prep() {
    let mut r = rig(&[(-250.0, 450.0)], 800.0);
    for err in [
        r.orch.pour(&CancelToken::new()).unwrap_err(),
        r.orch.put_back(&CancelToken::new()).unwrap_err(),
    ] {
        assert!(matches!(pour_error(&err), PourError::InvalidState(_)));
    }
    assert_eq!(r.arm.history().len(), 1);
}

#[test]
fn full_demo_grabs_pours_and_returns_home() {
    let mut r = rig(&[(-250.0, 450.0)], 800.0);
    r.orch.full_demo(&CancelToken::new()).unwrap();

    assert_eq!(r.gripper.log(), vec!["open", "grab", "open"]);
    assert!(!r.orch.is_prepared());

    let history = r.arm.history();
    let cfg = PourerCfg::default();
    assert_eq!(history.last(), Some(&cfg.places.home));
    // 800 g falls in the 700..850 bucket: +10 deg on top of the base tilt
    let tilts: Vec<f64> = history
        .iter()
        .map(|j| j.0[WRIST])
        .filter(|w| *w > 45.0)
        .collect();
    assert_eq!(tilts, vec![100.0]);

    let assist = r.assist.history();
    assert_eq!(
        &assist[1..],
        &[cfg.assist.balance.clone(), cfg.assist.rest.clone()]
    );
}

#[test]
fn second_prep_is_rejected_until_put_back() {
    let mut r = rig(&[(-250.0, 450.0)], 800.0);
    let cancel = CancelToken::new();
    r.orch.pour_prep(Pickup::Mid, &cancel).unwrap();
    assert!(r.orch.is_prepared());
    let err = r.orch.pour_prep(Pickup::Far, &cancel).unwrap_err();
    assert!(matches!(pour_error(&err), PourError::InvalidState(_)));
    r.orch.put_back(&cancel).unwrap();
    assert!(!r.orch.is_prepared());
    r.orch.pour_prep(Pickup::Scale, &cancel).unwrap();
}

#[test]
fn empty_grab_stops_prep_at_grab_action() {
    let cfg = PourerCfg::default();
    let clock = std::sync::Arc::new(pourer_traits::ManualClock::new());
    let mut orch = pourer_core::Orchestrator::builder()
        .with_planner(LinePlanner::new(4))
        .with_arm(pourer_core::mocks::RecordingArm::new(cfg.places.home.clone()))
        .with_gripper(pourer_core::mocks::RecordingGripper::new(false))
        .with_scale(pourer_core::mocks::FixedScale {
            field: cfg.weight.field.clone(),
            grams: 800.0,
        })
        .with_detector(pourer_core::mocks::FixedDetector(vec![cup_box(-250.0, 450.0)]))
        .with_clock(clock)
        .with_config(cfg)
        .build()
        .unwrap();
    let err = orch.pour_prep(Pickup::Far, &CancelToken::new()).unwrap_err();
    assert!(matches!(
        pour_error(&err),
        PourError::Execution {
            index: 3,
            kind: "gripper_grab",
            ..
        }
    ));
    assert!(!orch.is_prepared());
}

#[test]
fn dry_run_plans_everything_and_moves_nothing() {
    let mut r = rig(&[(100.0, 300.0), (-250.0, 600.0)], 800.0);
    let report = r
        .orch
        .start_pouring_process(
            PourOptions {
                pickup: Pickup::Scale,
                execute: false,
            },
            &CancelToken::new(),
        )
        .unwrap();

    assert!(!report.executed);
    // farthest first
    assert!(report.cups[0].norm() > report.cups[1].norm());
    assert!((report.cups[0].y - 600.0).abs() < 1e-6);
    // open, pregrasp, grasp, grab, lift, 2 carries; back to lift, lower,
    // open, back out, home
    assert_eq!(report.actions, 12);
    assert_eq!(report.weight.params.angle_offset_deg, 10.0);
    assert_eq!(r.arm.history().len(), 1);
    assert!(r.gripper.log().is_empty());
}

#[test]
fn process_serves_every_cup() {
    let mut r = rig(&[(100.0, 300.0), (-250.0, 600.0), (250.0, 450.0)], 800.0);
    let report = r
        .orch
        .start_pouring_process(
            PourOptions {
                pickup: Pickup::Far,
                execute: true,
            },
            &CancelToken::new(),
        )
        .unwrap();

    assert!(report.executed);
    assert_eq!(report.cups.len(), 3);
    assert_eq!(tilted(&r.arm.history()), 3);
    assert_eq!(r.gripper.log(), vec!["open", "grab", "open"]);
    assert_eq!(r.arm.history().last(), Some(&PourerCfg::default().places.home));
    assert!(!r.orch.is_prepared());
}

#[test]
fn process_without_cups_is_ambiguous() {
    let mut r = rig(&[], 800.0);
    let err = r
        .orch
        .start_pouring_process(
            PourOptions {
                pickup: Pickup::Far,
                execute: true,
            },
            &CancelToken::new(),
        )
        .unwrap_err();
    assert_eq!(
        pour_error(&err),
        &PourError::LocalizationAmbiguous {
            what: "cup",
            found: 0
        }
    );
}

#[test]
fn planner_failures_are_retried_with_new_seeds() {
    let mut planner = LinePlanner::new(4);
    planner.fail_seeds_below = 2;
    let requests = planner.requests();
    let mut r = rig_with(
        PourerCfg::default(),
        vec![cup_box(-250.0, 450.0)],
        800.0,
        planner,
    );
    r.orch.touch(&CancelToken::new()).unwrap();
    let seeds: Vec<u64> = requests.lock().unwrap().iter().map(|(s, _)| *s).collect();
    assert_eq!(seeds, vec![0, 1, 2, 0, 1, 2]);
}

#[test]
fn exhausted_planning_reports_attempts() {
    let mut cfg = PourerCfg::default();
    cfg.motion.max_plan_attempts = 3;
    let mut planner = LinePlanner::new(4);
    planner.fail_seeds_below = u64::MAX;
    let mut r = rig_with(cfg, vec![cup_box(-250.0, 450.0)], 800.0, planner);
    let err = r.orch.touch(&CancelToken::new()).unwrap_err();
    assert!(matches!(
        pour_error(&err),
        PourError::PlanningFailure { attempts: 3, .. }
    ));
    assert_eq!(r.arm.history().len(), 1);
}

#[test]
fn deadline_during_hold_still_returns_upright() {
    let mut r = rig(&[(-250.0, 450.0)], 800.0);
    r.orch.pour_prep(Pickup::Far, &CancelToken::new()).unwrap();

    // 800 g pours for ~1.9 s; give it half a second
    let cancel = CancelToken::new().with_timeout(r.orch.clock(), Duration::from_millis(500));
    let err = r.orch.pour(&cancel).unwrap_err();
    assert_eq!(pour_error(&err), &PourError::DeadlineExceeded);

    let history = r.arm.history();
    assert_eq!(tilted(&history), 1);
    assert_eq!(history.last().map(|j| j.0[WRIST]), Some(0.0));
    assert_eq!(
        r.assist.history().last(),
        Some(&PourerCfg::default().assist.rest)
    );
    assert!(r.clock.elapsed() >= Duration::from_millis(500));
    // still holding the bottle
    assert!(r.orch.is_prepared());
}

#[test]
fn cancelled_token_stops_before_any_motion() {
    let mut r = rig(&[(-250.0, 450.0)], 800.0);
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = r.orch.full_demo(&cancel).unwrap_err();
    assert_eq!(pour_error(&err), &PourError::Cancelled);
    assert_eq!(r.arm.history().len(), 1);
}

#[rstest]
#[case(925.0, 0.0, 1650)]
#[case(775.0, 10.0, 2000)]
#[case(2000.0, 0.0, 1500)]
#[case(100.0, 30.0, 3300)]
fn read_weight_maps_to_pour_parameters(
    #[case] grams: f64,
    #[case] angle: f64,
    #[case] duration_ms: u64,
) {
    let mut r = rig(&[], grams);
    let w = r.orch.read_weight(&CancelToken::new()).unwrap();
    assert!((w.weight_g - grams).abs() < 1e-9);
    assert_eq!(w.params.angle_offset_deg, angle);
    assert_eq!(w.params.duration_ms, duration_ms);
    // 10 samples, 9 gaps of 50 ms
    assert_eq!(r.clock.elapsed(), Duration::from_millis(450));
}

#[test]
fn calibration_reports_spread_of_repeated_localization() {
    let mut r = rig(&[(-250.0, 450.0)], 800.0);
    let report = r.orch.calibrate(5, &CancelToken::new()).unwrap();
    assert_eq!(report.samples, 5);
    assert!((report.mean.x + 250.0).abs() < 1e-6);
    assert!((report.mean.y - 450.0).abs() < 1e-6);
    assert!((report.mean.z - 100.0).abs() < 1e-6);
    assert!(report.std_dev.norm() < 1e-9);

    let err = r.orch.calibrate(0, &CancelToken::new()).unwrap_err();
    assert!(matches!(pour_error(&err), PourError::Config(_)));
}

#[test]
fn point_cloud_strategy_finds_cup_rim() {
    let mut orch = cloud_rig(cup_cloud(-250.0, 450.0, 40.0, 100.0));
    let cups = orch.locate_cups().unwrap();
    assert_eq!(cups.len(), 1);
    assert!((cups[0].x + 250.0).abs() < 1e-6, "{:?}", cups[0]);
    assert!((cups[0].y - 450.0).abs() < 1e-6, "{:?}", cups[0]);
    assert!((cups[0].z - 100.0).abs() < 1e-6, "{:?}", cups[0]);
}

#[test]
fn point_cloud_without_cup_is_empty() {
    let mut orch = cloud_rig(pourer_traits::PointCloud::default());
    assert!(orch.locate_cups().unwrap().is_empty());
    // no scale configured
    let err = orch.read_weight(&CancelToken::new()).unwrap_err();
    assert!(matches!(pour_error(&err), PourError::Config(_)));
}

#[test]
fn self_check_probes_every_collaborator() {
    let mut r = rig(&[(-250.0, 450.0)], 812.5);
    let check = r.orch.self_check().unwrap();
    assert_eq!(check.arm_joints, PourerCfg::default().places.home);
    assert_eq!(check.assist_joints, Some(PourerCfg::default().assist.rest));
    assert_eq!(check.weight_g, Some(812.5));
    assert_eq!(check.perception, "detector");
}
