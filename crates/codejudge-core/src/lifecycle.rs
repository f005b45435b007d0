//! Evaluation lifecycle state machine.
//!
//! `transition` is pure: it decides the next state and which writes have to
//! land before that state is adopted. Applying the effects is the
//! orchestrator's job.

use crate::error::{EvalError, Result};
use crate::model::{EvaluationState, JudgeResult};

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Begin a run.
    Start,
    /// The pipeline finished and the judge answered.
    Judged(JudgeResult),
    /// Confirm the terminal state.
    Confirm,
}

impl LifecycleEvent {
    fn label(&self) -> &'static str {
        match self {
            LifecycleEvent::Start => "start",
            LifecycleEvent::Judged(_) => "judged",
            LifecycleEvent::Confirm => "confirm",
        }
    }
}

/// A write the orchestrator must persist.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PersistState(EvaluationState),
    PersistResult(JudgeResult),
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: EvaluationState,
    pub effects: Vec<Effect>,
    /// The run is complete once these effects land.
    pub done: bool,
}

pub fn transition(state: EvaluationState, event: LifecycleEvent) -> Result<Transition> {
    match (state, event) {
        (EvaluationState::NotEvaluated, LifecycleEvent::Start) => Ok(Transition {
            next: EvaluationState::UnderEvaluation,
            effects: vec![Effect::PersistState(EvaluationState::UnderEvaluation)],
            done: false,
        }),
        (EvaluationState::UnderEvaluation, LifecycleEvent::Judged(result)) => Ok(Transition {
            next: EvaluationState::Evaluated,
            effects: vec![Effect::PersistResult(result)],
            done: false,
        }),
        (EvaluationState::Evaluated, LifecycleEvent::Confirm) => Ok(Transition {
            next: EvaluationState::Evaluated,
            effects: vec![Effect::PersistState(EvaluationState::Evaluated)],
            done: true,
        }),
        (state, event) => Err(EvalError::InvalidTransition {
            state,
            event: event.label(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_forward_through_all_states() {
        let t = transition(EvaluationState::NotEvaluated, LifecycleEvent::Start).unwrap();
        assert_eq!(t.next, EvaluationState::UnderEvaluation);
        assert_eq!(
            t.effects,
            vec![Effect::PersistState(EvaluationState::UnderEvaluation)]
        );
        assert!(!t.done);

        let result = JudgeResult {
            score: Some(90.0),
            reasoning: Some("good".into()),
            suggestion: None,
        };
        let t = transition(t.next, LifecycleEvent::Judged(result.clone())).unwrap();
        assert_eq!(t.next, EvaluationState::Evaluated);
        assert_eq!(t.effects, vec![Effect::PersistResult(result)]);
        assert!(!t.done);

        let t = transition(t.next, LifecycleEvent::Confirm).unwrap();
        assert_eq!(t.next, EvaluationState::Evaluated);
        assert_eq!(t.effects, vec![Effect::PersistState(EvaluationState::Evaluated)]);
        assert!(t.done);
    }

    #[test]
    fn rejects_skipped_steps() {
        let err = transition(
            EvaluationState::NotEvaluated,
            LifecycleEvent::Judged(JudgeResult::default()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EvalError::InvalidTransition {
                state: EvaluationState::NotEvaluated,
                event: "judged"
            }
        ));
        assert!(transition(EvaluationState::NotEvaluated, LifecycleEvent::Confirm).is_err());
        assert!(transition(EvaluationState::UnderEvaluation, LifecycleEvent::Start).is_err());
        assert!(transition(EvaluationState::Evaluated, LifecycleEvent::Start).is_err());
    }
}
