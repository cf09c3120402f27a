//! Ranked-preference allocation.
//!
//! Rank positions are resolved in order: every still unassigned voter claims
//! their choice for the current rank, uncontested claims are granted outright
//! and contested ones go to a uniformly random contender. Losers fall through
//! to their next rank in the following round.
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// One voter's preference order. Index 0 is the first choice.
pub type Ranking = Vec<String>;

/// What a voter ends up with once allocation has run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum Outcome {
    #[n(0)]
    Assigned(#[n(0)] String),
    #[n(1)]
    Unassigned,
}

impl Outcome {
    pub fn option(&self) -> Option<&str> {
        match self {
            Outcome::Assigned(option) => Some(option),
            Outcome::Unassigned => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Assigned(option) => f.write_str(option),
            Outcome::Unassigned => f.write_str("-"),
        }
    }
}

/// Assigns each voter at most one option with no option handed out twice.
///
/// Choices that are not (or no longer) in the pool are skipped for that
/// round. Every key of `votes` is present in the result.
pub fn allocate<R: Rng + ?Sized>(
    votes: &BTreeMap<String, Ranking>,
    options: &[String],
    rng: &mut R,
) -> BTreeMap<String, Outcome> {
    let mut assigned: BTreeMap<String, Outcome> = BTreeMap::new();
    let mut remaining: BTreeSet<&str> = options.iter().map(String::as_str).collect();

    for rank in 0..options.len() {
        if remaining.is_empty() {
            break;
        }

        let mut claims: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (identity, ranking) in votes {
            if assigned.contains_key(identity) {
                continue;
            }
            if let Some(choice) = ranking.get(rank) {
                if remaining.contains(choice.as_str()) {
                    claims
                        .entry(choice.as_str())
                        .or_default()
                        .push(identity.as_str());
                }
            }
        }

        for (choice, contenders) in claims {
            let winner = match contenders.as_slice() {
                [] => continue,
                [only] => *only,
                many => {
                    let winner = many[rng.gen_range(0..many.len())];
                    debug!(
                        rank = rank + 1,
                        option = choice,
                        contenders = many.len(),
                        winner,
                        "conflict resolved"
                    );
                    winner
                }
            };
            remaining.remove(choice);
            assigned.insert(winner.to_string(), Outcome::Assigned(choice.to_string()));
        }
    }

    for identity in votes.keys() {
        assigned
            .entry(identity.clone())
            .or_insert(Outcome::Unassigned);
    }

    assigned
}
