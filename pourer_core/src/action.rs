//! Composite robot actions and their sequencing.
//!
//! An `ActionSequence` is append-only: reversal appends mirrored copies and
//! never rewrites what is already there, so indices handed out earlier stay
//! valid for the lifetime of the sequence.
use crate::cancel::CancelToken;
use crate::error::{PourError, Result};
use pourer_traits::{Arm, BoxError, Clock, Gripper, JointPositions, Plan};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperCommand {
    Open,
    Grab,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Follow a planned trajectory; `target_frame` is the frame the planner moved.
    MotionPlan { target_frame: String, plan: Plan },
    Gripper(GripperCommand),
    /// Direct joint-space move, no planning.
    JointMove { target: JointPositions },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MotionPlan { .. } => "motion_plan",
            Self::Gripper(GripperCommand::Open) => "gripper_open",
            Self::Gripper(GripperCommand::Grab) => "gripper_grab",
            Self::JointMove { .. } => "joint_move",
        }
    }

    /// Mirror for playback in reverse. Only motion changes direction;
    /// discrete commands are copied as they are.
    pub fn reversed(&self) -> Action {
        match self {
            Self::MotionPlan { target_frame, plan } => Self::MotionPlan {
                target_frame: target_frame.clone(),
                plan: plan.reversed(),
            },
            other => other.clone(),
        }
    }
}

/// Hardware an `ActionSequence` runs against.
pub struct Actuators<'a> {
    pub arm: &'a mut dyn Arm,
    pub gripper: &'a mut dyn Gripper,
    pub clock: &'a dyn Clock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionSequence {
    start: JointPositions,
    actions: Vec<Action>,
}

impl ActionSequence {
    pub fn new(start: JointPositions) -> Self {
        Self {
            start,
            actions: Vec::new(),
        }
    }

    pub fn add(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Append mirrored copies of `actions[start_idx..=stop_idx]`, last first.
    ///
    /// Rejects out-of-range or inverted indices without touching the sequence.
    pub fn add_reverse(&mut self, start_idx: usize, stop_idx: usize) -> Result<()> {
        if start_idx > stop_idx || stop_idx >= self.actions.len() {
            return Err(eyre::Report::new(PourError::InvalidState(format!(
                "cannot reverse actions {start_idx}..={stop_idx} of a {}-action sequence",
                self.actions.len()
            ))));
        }
        let mirrored: Vec<Action> = self.actions[start_idx..=stop_idx]
            .iter()
            .rev()
            .map(Action::reversed)
            .collect();
        self.actions.extend(mirrored);
        Ok(())
    }

    /// Configuration the arm is in after the last planned motion, or the
    /// start configuration if nothing has been planned yet.
    pub fn current(&self) -> &JointPositions {
        self.actions
            .iter()
            .rev()
            .find_map(|a| match a {
                Action::MotionPlan { plan, .. } => plan.end(),
                _ => None,
            })
            .unwrap_or(&self.start)
    }

    pub fn start(&self) -> &JointPositions {
        &self.start
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every action in order; stop at the first failure.
    pub fn execute(&self, ctx: &mut Actuators<'_>, cancel: &CancelToken) -> Result<()> {
        self.execute_range(ctx, 0..self.actions.len(), cancel)
    }

    /// Run a contiguous slice of the sequence. Reported indices are positions
    /// in the whole sequence. Nothing is rolled back on failure.
    pub fn execute_range(
        &self,
        ctx: &mut Actuators<'_>,
        range: Range<usize>,
        cancel: &CancelToken,
    ) -> Result<()> {
        let Some(slice) = self.actions.get(range.clone()) else {
            return Err(eyre::Report::new(PourError::InvalidState(format!(
                "range {range:?} outside a {}-action sequence",
                self.actions.len()
            ))));
        };
        for (offset, action) in slice.iter().enumerate() {
            let index = range.start + offset;
            cancel.check(ctx.clock)?;
            tracing::debug!(index, kind = action.kind(), "executing action");
            if let Err(cause) = run_one(action, ctx) {
                tracing::warn!(index, kind = action.kind(), %cause, "action failed");
                return Err(eyre::Report::new(PourError::Execution {
                    index,
                    kind: action.kind(),
                    cause,
                }));
            }
        }
        Ok(())
    }
}

fn run_one(action: &Action, ctx: &mut Actuators<'_>) -> std::result::Result<(), String> {
    let res: std::result::Result<(), BoxError> = match action {
        Action::MotionPlan { plan, .. } => ctx.arm.move_through_joint_positions(&plan.trajectory),
        Action::JointMove { target } => ctx.arm.move_to_joint_positions(target),
        Action::Gripper(GripperCommand::Open) => ctx.gripper.open(),
        Action::Gripper(GripperCommand::Grab) => match ctx.gripper.grab() {
            Ok(true) => Ok(()),
            Ok(false) => Err("gripper closed on nothing".into()),
            Err(e) => Err(e),
        },
    };
    res.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pourer_traits::{ManualClock, Pose};

    #[derive(Default)]
    struct RecordingArm {
        moves: Vec<JointPositions>,
        fail_on: Option<f64>,
    }

    impl Arm for RecordingArm {
        fn move_to_joint_positions(
            &mut self,
            p: &JointPositions,
        ) -> std::result::Result<(), BoxError> {
            if self.fail_on == p.as_slice().first().copied() {
                return Err("joint limit".into());
            }
            self.moves.push(p.clone());
            Ok(())
        }
        fn joint_positions(&mut self) -> std::result::Result<JointPositions, BoxError> {
            Ok(self.moves.last().cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct CountingGripper {
        opens: usize,
        grabs: usize,
        holds: bool,
    }

    impl Gripper for CountingGripper {
        fn open(&mut self) -> std::result::Result<(), BoxError> {
            self.opens += 1;
            Ok(())
        }
        fn grab(&mut self) -> std::result::Result<bool, BoxError> {
            self.grabs += 1;
            Ok(self.holds)
        }
    }

    fn jm(v: f64) -> Action {
        Action::JointMove {
            target: JointPositions::new([v]),
        }
    }

    fn motion(from: f64, to: f64) -> Action {
        Action::MotionPlan {
            target_frame: "gripper".into(),
            plan: Plan {
                path: vec![
                    Pose::from_position(from, 0.0, 0.0),
                    Pose::from_position(to, 0.0, 0.0),
                ],
                trajectory: vec![JointPositions::new([from]), JointPositions::new([to])],
            },
        }
    }

    #[test]
    fn fail_fast_reports_index_and_skips_rest() {
        let mut seq = ActionSequence::new(JointPositions::new([0.0]));
        for v in [1.0, 2.0, 3.0, 4.0] {
            seq.add(jm(v));
        }
        let mut arm = RecordingArm {
            fail_on: Some(3.0),
            ..Default::default()
        };
        let mut gripper = CountingGripper::default();
        let clock = ManualClock::new();
        let mut ctx = Actuators {
            arm: &mut arm,
            gripper: &mut gripper,
            clock: &clock,
        };
        let err = seq.execute(&mut ctx, &CancelToken::new()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PourError>(),
            Some(&PourError::Execution {
                index: 2,
                kind: "joint_move",
                cause: "joint limit".into()
            })
        );
        assert_eq!(arm.moves.len(), 2);
    }

    #[test]
    fn reverse_mirrors_range_last_first() {
        let mut seq = ActionSequence::new(JointPositions::new([0.0]));
        seq.add(motion(0.0, 1.0));
        seq.add(Action::Gripper(GripperCommand::Grab));
        seq.add(motion(1.0, 2.0));
        seq.add_reverse(0, 2).unwrap();

        assert_eq!(seq.len(), 6);
        assert_eq!(seq.actions()[3], motion(2.0, 1.0));
        // grab stays grab
        assert_eq!(seq.actions()[4], Action::Gripper(GripperCommand::Grab));
        assert_eq!(seq.actions()[5], motion(1.0, 0.0));
        assert_eq!(seq.current().as_slice(), &[0.0]);
    }

    #[test]
    fn reversing_twice_restores_original_motion() {
        let m = motion(3.0, 7.0);
        assert_eq!(m.reversed().reversed(), m);
    }

    #[test]
    fn bad_reverse_range_leaves_sequence_alone() {
        let mut seq = ActionSequence::new(JointPositions::new([0.0]));
        seq.add(motion(0.0, 1.0));
        seq.add(motion(1.0, 2.0));
        assert!(seq.add_reverse(1, 0).is_err());
        assert!(seq.add_reverse(0, 2).is_err());
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn current_skips_discrete_actions() {
        let mut seq = ActionSequence::new(JointPositions::new([9.0]));
        assert_eq!(seq.current().as_slice(), &[9.0]);
        seq.add(Action::Gripper(GripperCommand::Open));
        assert_eq!(seq.current().as_slice(), &[9.0]);
        seq.add(motion(9.0, 5.0));
        seq.add(jm(1.0));
        seq.add(Action::Gripper(GripperCommand::Grab));
        assert_eq!(seq.current().as_slice(), &[5.0]);
    }

    #[test]
    fn empty_grab_is_an_execution_failure() {
        let mut seq = ActionSequence::new(JointPositions::new([0.0]));
        seq.add(Action::Gripper(GripperCommand::Open));
        seq.add(Action::Gripper(GripperCommand::Grab));
        let mut arm = RecordingArm::default();
        let mut gripper = CountingGripper::default();
        let clock = ManualClock::new();
        let mut ctx = Actuators {
            arm: &mut arm,
            gripper: &mut gripper,
            clock: &clock,
        };
        let err = seq.execute(&mut ctx, &CancelToken::new()).unwrap_err();
        assert!(err.to_string().contains("gripper_grab"), "{err}");
        assert_eq!((gripper.opens, gripper.grabs), (1, 1));
    }

    #[test]
    fn execute_range_reports_global_index_and_honours_cancel() {
        let mut seq = ActionSequence::new(JointPositions::new([0.0]));
        seq.add(jm(1.0));
        seq.add(motion(1.0, 2.0));
        seq.add(jm(3.0));
        let mut arm = RecordingArm {
            fail_on: Some(3.0),
            ..Default::default()
        };
        let mut gripper = CountingGripper {
            holds: true,
            ..Default::default()
        };
        let clock = ManualClock::new();
        let mut ctx = Actuators {
            arm: &mut arm,
            gripper: &mut gripper,
            clock: &clock,
        };
        let err = seq.execute_range(&mut ctx, 1..3, &CancelToken::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PourError>(),
            Some(PourError::Execution { index: 2, .. })
        ));

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = seq.execute(&mut ctx, &cancel).unwrap_err();
        assert_eq!(err.downcast_ref::<PourError>(), Some(&PourError::Cancelled));
        assert!(seq.execute_range(&mut ctx, 2..9, &CancelToken::new()).is_err());
    }
}
