//! One-step lookahead shared by the planning solvers.
//!
//! ```text
//! Q(s, a) = Σ P(s' | s, a) · [ r + γ · V(s') ]
//! ```
//!
//! [`argmax`] is the only place actions are compared. It is used for
//! policy improvement, value-iteration extraction and Q-learning alike.

use crate::mdp::error::{Result, SolverError};
use crate::mdp::model::{StateSpace, TransitionModel};
use crate::mdp::storage::ValueTable;

/// Two values closer than this are treated as equal when choosing actions.
pub const VALUE_TOLERANCE: f64 = 1e-9;

/// Allowed deviation of a transition set's total probability from 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Pick the first item with the highest value.
///
/// A later item replaces the incumbent only if it is better by more than
/// [`VALUE_TOLERANCE`], so near-equal values always resolve to the earlier
/// item regardless of rounding noise.
pub fn argmax<T, I>(items: I) -> Option<(T, f64)>
where
    I: IntoIterator<Item = (T, f64)>,
{
    let mut best: Option<(T, f64)> = None;
    for (item, value) in items {
        let replace = match &best {
            Some((_, incumbent)) => value > *incumbent + VALUE_TOLERANCE,
            None => true,
        };
        if replace {
            best = Some((item, value));
        }
    }
    best
}

/// Expected discounted return of playing `action` in `state`.
///
/// Successor values come from `values`, which the caller keeps fixed for a
/// whole sweep.
pub fn q_value<M: TransitionModel>(
    model: &M,
    values: &ValueTable<M::State>,
    discount: f64,
    state: &M::State,
    action: &M::Action,
) -> Result<f64> {
    let transitions = model.transitions(state, action);
    debug_assert!(
        (transitions.iter().map(|t| t.probability).sum::<f64>() - 1.0).abs()
            <= PROBABILITY_TOLERANCE,
        "transition probabilities for {} do not sum to 1",
        model.state_description(state)
    );

    let mut total = 0.0;
    for transition in &transitions {
        let next = &transition.outcome.next_state;
        let next_value = values.get(next).ok_or_else(|| SolverError::UnknownState {
            state: model.state_description(next),
        })?;
        total += transition.probability * (transition.outcome.reward + discount * next_value);
    }
    Ok(total)
}

/// Best action at `state` by one-step lookahead, with its Q-value.
pub fn greedy_action<M: TransitionModel>(
    model: &M,
    values: &ValueTable<M::State>,
    discount: f64,
    state: &M::State,
) -> Result<(M::Action, f64)> {
    let actions = legal_actions(model, state)?;
    let mut scored = Vec::with_capacity(actions.len());
    for action in actions {
        let q = q_value(model, values, discount, state, &action)?;
        scored.push((action, q));
    }
    argmax(scored).ok_or_else(|| SolverError::NoLegalActions {
        state: model.state_description(state),
    })
}

/// Legal actions of a state the caller has already found non-terminal.
///
/// An empty list here means the model's terminality check and its action
/// list disagree, which is reported instead of being papered over.
pub fn legal_actions<P: StateSpace>(space: &P, state: &P::State) -> Result<Vec<P::Action>> {
    let actions = space.legal_actions(state);
    if actions.is_empty() {
        return Err(SolverError::NoLegalActions {
            state: space.state_description(state),
        });
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::table::TableMdp;

    #[test]
    fn test_argmax_first_max_wins() {
        let items = vec![("a", 1.0), ("b", 3.0), ("c", 3.0), ("d", 2.0)];
        assert_eq!(argmax(items), Some(("b", 3.0)));
    }

    #[test]
    fn test_argmax_ignores_rounding_noise() {
        let items = vec![("a", 0.3), ("b", 0.1 + 0.2)];
        assert_eq!(argmax(items).map(|(a, _)| a), Some("a"));
    }

    #[test]
    fn test_argmax_empty_and_negative() {
        assert_eq!(argmax(Vec::<(u8, f64)>::new()), None);
        assert_eq!(argmax(vec![(1, -5.0), (2, -7.0)]), Some((1, -5.0)));
    }

    #[test]
    fn test_q_value_weights_outcomes() {
        let mdp = TableMdp::new()
            .with_transition("s", "go", 0.25, 4.0, "t")
            .with_transition("s", "go", 0.75, 0.0, "u")
            .with_terminal("t")
            .with_terminal("u");
        let mut values = ValueTable::new(mdp.states());
        values.set(&"u", 2.0);

        let q = q_value(&mdp, &values, 0.5, &"s", &"go").unwrap();
        assert!((q - (0.25 * 4.0 + 0.75 * 0.5 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_successor_is_an_error() {
        let mdp = TableMdp::new()
            .with_transition("s", "go", 1.0, 1.0, "t")
            .with_terminal("t");
        let values = ValueTable::new(vec!["s"]);
        let err = q_value(&mdp, &values, 0.9, &"s", &"go").unwrap_err();
        assert!(matches!(err, SolverError::UnknownState { .. }));
    }

    #[test]
    fn test_missing_actions_is_an_error() {
        let mdp = TableMdp::new().with_transition("s", "go", 1.0, 1.0, "dead_end");
        let err = legal_actions(&mdp, &"dead_end").unwrap_err();
        assert!(matches!(err, SolverError::NoLegalActions { .. }));
    }
}
