//! Property-based tests for the draft lifecycle state machine
//!
//! Random sequences of votes and cancel attempts are applied to a draft and
//! checked against a simple model of what should have happened.

use draft_allocation::{Draft, DraftError, DraftStatus};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

const OPTIONS: [&str; 3] = ["A", "B", "C"];
const CREATOR: &str = "admin";

#[derive(Debug, Clone)]
enum Action {
    Vote { voter: u8, ranking: Vec<&'static str> },
    Cancel { by_creator: bool },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        8 => (0u8..5, Just(OPTIONS.to_vec()).prop_shuffle())
            .prop_map(|(voter, ranking)| Action::Vote { voter, ranking }),
        1 => any::<bool>().prop_map(|by_creator| Action::Cancel { by_creator }),
    ]
}

fn new_draft(required: u32) -> Draft {
    Draft::new("draft_prop".into(), "Props", required, OPTIONS, CREATOR.into()).unwrap()
}

proptest! {
    /// Property: a draft completes exactly when the required number of distinct
    /// voters is reached, unless it was cancelled first
    #[test]
    fn prop_completes_at_required_distinct_voters(
        required in 1u32..=5,
        actions in prop::collection::vec(action_strategy(), 0..20),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut draft = new_draft(required);
        let mut voters = BTreeSet::new();
        let mut cancelled = false;

        for action in actions {
            let was_open = draft.status() == DraftStatus::Open;
            match action {
                Action::Vote { voter, ranking } => {
                    let result = draft.record_vote(&format!("voter_{voter}"), &ranking, &mut rng);
                    if was_open {
                        voters.insert(voter);
                        let completed = result.unwrap();
                        prop_assert_eq!(completed, voters.len() == required as usize);
                    } else {
                        let is_invalid_state = matches!(result, Err(DraftError::InvalidState { .. }));
                        prop_assert!(is_invalid_state);
                    }
                }
                Action::Cancel { by_creator } => {
                    let requested_by = if by_creator { CREATOR } else { "intruder" };
                    let result = draft.cancel(requested_by);
                    match (by_creator, was_open) {
                        (false, _) => {
                            let is_unauthorized = matches!(result, Err(DraftError::Unauthorized { .. }));
                            prop_assert!(is_unauthorized);
                        }
                        (true, true) => {
                            prop_assert!(result.is_ok());
                            cancelled = true;
                        }
                        (true, false) => {
                            let is_invalid_state = matches!(result, Err(DraftError::InvalidState { .. }));
                            prop_assert!(is_invalid_state);
                        }
                    }
                }
            }

            let expected = if cancelled {
                DraftStatus::Cancelled
            } else if voters.len() >= required as usize {
                DraftStatus::Completed
            } else {
                DraftStatus::Open
            };
            prop_assert_eq!(draft.status(), expected);
            prop_assert_eq!(draft.assignment().is_empty(), expected != DraftStatus::Completed);
        }
    }

    /// Property: once terminal, nothing about the draft changes
    #[test]
    fn prop_terminal_states_are_closed(
        cancel_first in any::<bool>(),
        actions in prop::collection::vec(action_strategy(), 0..20),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut draft = new_draft(1);
        if cancel_first {
            draft.cancel(CREATOR).unwrap();
        } else {
            draft.record_vote("first", &OPTIONS, &mut rng).unwrap();
        }
        let frozen = draft.clone();

        for action in actions {
            match action {
                Action::Vote { voter, ranking } => {
                    let _ = draft.record_vote(&format!("voter_{voter}"), &ranking, &mut rng);
                }
                Action::Cancel { by_creator } => {
                    let _ = draft.cancel(if by_creator { CREATOR } else { "intruder" });
                }
            }
            prop_assert!(!draft.check_readiness(&mut rng));
            prop_assert_eq!(&draft, &frozen);
        }
    }
}
