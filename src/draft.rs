//! Draft aggregate and its lifecycle rules
use super::allocation::{self, Outcome, Ranking};
use super::error::{DraftError, ValidationError};
use super::utils::sanitize_title;
use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DraftStatus {
    #[n(0)]
    Open,
    #[n(1)]
    Completed,
    #[n(2)]
    Cancelled,
}

impl DraftStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DraftStatus::Open)
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftStatus::Open => "open",
            DraftStatus::Completed => "completed",
            DraftStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// One ranked-preference draft, from option definition to final assignment.
// Stored as CBOR keyed by `id`
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Draft {
    #[n(0)]
    id: String,
    #[n(1)]
    title: String,
    #[n(2)]
    created_at: TimeStamp<Utc>,
    #[n(3)]
    created_by: String,
    #[n(4)]
    required_participants: u32,
    #[n(5)]
    options: Vec<String>,
    #[n(6)]
    status: DraftStatus,
    #[n(7)]
    votes: BTreeMap<String, Ranking>, // last write wins per voter
    #[n(8)]
    assignment: BTreeMap<String, Outcome>, // empty until completed
}

/// Completed-draft view: who got what, next to what they asked for.
#[derive(Debug, PartialEq, Eq)]
pub struct DraftResults<'a> {
    pub assignment: &'a BTreeMap<String, Outcome>,
    pub rankings: &'a BTreeMap<String, Ranking>,
}

impl Draft {
    /// Validates the creation input and returns an open draft with no votes.
    ///
    /// Options are trimmed before the blank and duplicate checks. The title is
    /// sanitized and never rejected.
    pub fn new<I, S>(
        id: String,
        title: &str,
        required_participants: u32,
        options: I,
        created_by: String,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if required_participants == 0 {
            return Err(ValidationError::NoParticipants);
        }

        let mut seen = BTreeSet::new();
        let mut labels = Vec::new();
        for option in options {
            let label = option.as_ref().trim();
            if label.is_empty() {
                return Err(ValidationError::BlankOption);
            }
            if !seen.insert(label.to_string()) {
                return Err(ValidationError::DuplicateOption(label.to_string()));
            }
            labels.push(label.to_string());
        }
        if labels.is_empty() {
            return Err(ValidationError::EmptyOptions);
        }

        Ok(Self {
            id,
            title: sanitize_title(title),
            created_at: TimeStamp::new(),
            created_by,
            required_participants,
            options: labels,
            status: DraftStatus::Open,
            votes: BTreeMap::new(),
            assignment: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn created_at(&self) -> &TimeStamp<Utc> {
        &self.created_at
    }
    pub fn created_by(&self) -> &str {
        &self.created_by
    }
    pub fn required_participants(&self) -> u32 {
        self.required_participants
    }
    pub fn options(&self) -> &[String] {
        &self.options
    }
    pub fn status(&self) -> DraftStatus {
        self.status
    }
    pub fn votes(&self) -> &BTreeMap<String, Ranking> {
        &self.votes
    }
    pub fn assignment(&self) -> &BTreeMap<String, Outcome> {
        &self.assignment
    }

    /// Identities that have voted, without their rankings.
    pub fn roster(&self) -> impl Iterator<Item = &str> {
        self.votes.keys().map(String::as_str)
    }

    /// Votes still missing before allocation runs.
    pub fn remaining_votes(&self) -> u32 {
        let cast = u32::try_from(self.votes.len()).unwrap_or(u32::MAX);
        self.required_participants.saturating_sub(cast)
    }

    pub fn results(&self) -> Option<DraftResults<'_>> {
        (self.status == DraftStatus::Completed).then_some(DraftResults {
            assignment: &self.assignment,
            rankings: &self.votes,
        })
    }

    /// Checks that `ranking` is a permutation of this draft's options.
    pub fn validate_ranking<S: AsRef<str>>(&self, ranking: &[S]) -> Result<Ranking, ValidationError> {
        if ranking.len() != self.options.len() {
            return Err(ValidationError::RankingLength {
                expected: self.options.len(),
                actual: ranking.len(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut checked = Vec::with_capacity(ranking.len());
        for choice in ranking {
            let choice = choice.as_ref().trim();
            if !self.options.iter().any(|o| o == choice) {
                return Err(ValidationError::UnknownOption(choice.to_string()));
            }
            if !seen.insert(choice) {
                return Err(ValidationError::DuplicateRanking(choice.to_string()));
            }
            checked.push(choice.to_string());
        }
        Ok(checked)
    }

    /// Stores (or overwrites) a voter's ranking, then runs the readiness check.
    ///
    /// Returns `true` when this vote completed the draft.
    pub fn record_vote<S, R>(
        &mut self,
        identity: &str,
        ranking: &[S],
        rng: &mut R,
    ) -> Result<bool, DraftError>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        self.ensure_open("vote on")?;

        let identity = identity.trim();
        if identity.is_empty() {
            return Err(ValidationError::BlankIdentity.into());
        }
        let ranking = self.validate_ranking(ranking)?;
        self.votes.insert(identity.to_string(), ranking);

        Ok(self.check_readiness(rng))
    }

    /// Runs allocation and completes the draft once enough distinct voters
    /// are in. A no-op on anything but an open draft.
    pub fn check_readiness<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.status != DraftStatus::Open
            || self.required_participants == 0
            || self.votes.len() < self.required_participants as usize
        {
            return false;
        }

        self.assignment = allocation::allocate(&self.votes, &self.options, rng);
        self.status = DraftStatus::Completed;
        info!(draft_id = %self.id, voters = self.votes.len(), "draft completed");
        true
    }

    /// Cancels an open draft. Only the creator may do so.
    pub fn cancel(&mut self, requested_by: &str) -> Result<(), DraftError> {
        if requested_by != self.created_by {
            return Err(DraftError::Unauthorized {
                draft_id: self.id.clone(),
                requested_by: requested_by.to_string(),
            });
        }
        self.ensure_open("cancel")?;

        self.status = DraftStatus::Cancelled;
        info!(draft_id = %self.id, "draft cancelled");
        Ok(())
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), DraftError> {
        if self.status.is_terminal() {
            return Err(DraftError::InvalidState {
                draft_id: self.id.clone(),
                status: self.status,
                action,
            });
        }
        Ok(())
    }
}
