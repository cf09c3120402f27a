use super::draft::DraftStatus;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A draft needs at least one option")]
    EmptyOptions,
    #[error("Option labels must not be blank")]
    BlankOption,
    #[error("Option '{0}' was given more than once")]
    DuplicateOption(String),
    #[error("Required participant count must be at least 1")]
    NoParticipants,
    #[error("Voter name must not be blank")]
    BlankIdentity,
    #[error("Ranking has {actual} entries but the draft has {expected} options")]
    RankingLength { expected: usize, actual: usize },
    #[error("Ranking names '{0}', which is not an option of this draft")]
    UnknownOption(String),
    #[error("Ranking names '{0}' at more than one position")]
    DuplicateRanking(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode draft: {0}")]
    Encode(String),
    #[error("failed to decode draft: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("draft store lock was poisoned")]
    Poisoned,
}

#[derive(thiserror::Error, Debug)]
pub enum DraftError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Cannot {action} draft {draft_id}: it is {status}")]
    InvalidState {
        draft_id: String,
        status: DraftStatus,
        action: &'static str,
    },
    #[error("{requested_by} is not allowed to cancel draft {draft_id}")]
    Unauthorized {
        draft_id: String,
        requested_by: String,
    },
    #[error("Draft {0} does not exist")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
