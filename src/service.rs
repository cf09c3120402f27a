//! Service layer API for the draft lifecycle
use super::config::Config;
use super::draft::{Draft, DraftStatus};
use super::error::{DraftError, StoreError};
use super::store::{DraftStore, SledStore};
use super::utils;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Result of a vote or readiness check: the draft as committed and whether
/// this call moved it from open to completed.
#[derive(Debug)]
pub struct Submission {
    pub draft: Draft,
    pub completed: bool,
}

/// One page of the draft history, newest first. Pages are 1-based.
#[derive(Debug)]
pub struct HistoryPage {
    pub drafts: Vec<Draft>,
    pub page: usize,
    pub total_pages: usize,
}

pub struct DraftService<S, R = StdRng> {
    store: S,
    rng: Mutex<R>,
    recent_limit: usize,
    history_page_size: usize,
}

impl DraftService<SledStore> {
    /// Opens the sled database named by the config.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let db = sled::open(&config.db_path)?;
        let store = SledStore::new(Arc::new(db))?;
        Ok(Self::new(store).with_listing(config.recent_limit, config.history_page_size))
    }
}

impl<S: DraftStore> DraftService<S> {
    pub fn new(store: S) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }
}

impl<S: DraftStore, R: Rng> DraftService<S, R> {
    /// Uses `rng` for conflict resolution. Seed it to make allocations reproducible.
    pub fn with_rng(store: S, rng: R) -> Self {
        let defaults = Config::default();
        Self {
            store,
            rng: Mutex::new(rng),
            recent_limit: defaults.recent_limit,
            history_page_size: defaults.history_page_size,
        }
    }

    pub fn with_listing(mut self, recent_limit: usize, history_page_size: usize) -> Self {
        self.recent_limit = recent_limit.max(1);
        self.history_page_size = history_page_size.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a new open draft
    pub fn create_draft<I, T>(
        &self,
        title: &str,
        required_participants: u32,
        options: I,
        created_by: &str,
    ) -> Result<Draft, DraftError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let draft_id = utils::new_uuid_to_bech32("draft")?;
        let draft = Draft::new(
            draft_id,
            title,
            required_participants,
            options,
            created_by.to_string(),
        )?;

        self.store.insert(&draft)?;
        info!(
            draft_id = draft.id(),
            title = draft.title(),
            required = required_participants,
            options = draft.options().len(),
            created_by,
            "draft created"
        );

        Ok(draft)
    }

    /// Record (or replace) a voter's ranking; completes the draft when it was
    /// the last vote needed.
    pub fn submit_vote<T: AsRef<str>>(
        &self,
        draft_id: &str,
        identity: &str,
        ranking: &[T],
    ) -> Result<Submission, DraftError> {
        let (draft, completed) = self
            .store
            .update(draft_id, |draft| {
                let mut rng = self.rng.lock().map_err(|_| StoreError::Poisoned)?;
                draft.record_vote(identity, ranking, &mut *rng)
            })
            .inspect_err(|e| warn!(draft_id, identity, error = %e, "vote rejected"))?;

        debug!(draft_id, identity, votes = draft.votes().len(), "vote recorded");
        Ok(Submission { draft, completed })
    }

    /// Run allocation if enough votes are in. Idempotent once the draft left `Open`.
    pub fn check_readiness(&self, draft_id: &str) -> Result<Submission, DraftError> {
        let (draft, completed) = self.store.update(draft_id, |draft| {
            let mut rng = self.rng.lock().map_err(|_| StoreError::Poisoned)?;
            Ok(draft.check_readiness(&mut *rng))
        })?;

        Ok(Submission { draft, completed })
    }

    /// Cancel an open draft. Only its creator may do this.
    pub fn cancel_draft(&self, draft_id: &str, requested_by: &str) -> Result<Draft, DraftError> {
        let (draft, ()) = self
            .store
            .update(draft_id, |draft| draft.cancel(requested_by))
            .inspect_err(|e| warn!(draft_id, requested_by, error = %e, "cancel rejected"))?;

        Ok(draft)
    }

    pub fn get_draft(&self, draft_id: &str) -> Result<Draft, DraftError> {
        self.store
            .load(draft_id)?
            .ok_or_else(|| DraftError::NotFound(draft_id.to_string()))
    }

    /// All drafts, newest first.
    pub fn drafts(&self) -> Result<Vec<Draft>, DraftError> {
        let mut drafts = self.store.list()?;
        drafts.sort_by(|a, b| b.created_at().cmp(a.created_at()));
        Ok(drafts)
    }

    /// The few newest drafts, whatever their status.
    pub fn recent(&self) -> Result<Vec<Draft>, DraftError> {
        let mut drafts = self.drafts()?;
        drafts.truncate(self.recent_limit);
        Ok(drafts)
    }

    /// Drafts still collecting votes, newest first.
    pub fn open_drafts(&self) -> Result<Vec<Draft>, DraftError> {
        let mut drafts = self.drafts()?;
        drafts.retain(|d| d.status() == DraftStatus::Open);
        Ok(drafts)
    }

    /// Open drafts created by `creator`: the ones they can still cancel.
    pub fn open_drafts_by(&self, creator: &str) -> Result<Vec<Draft>, DraftError> {
        let mut drafts = self.open_drafts()?;
        drafts.retain(|d| d.created_by() == creator);
        Ok(drafts)
    }

    /// Out of range pages are clamped to the nearest valid one.
    pub fn history_page(&self, page: usize) -> Result<HistoryPage, DraftError> {
        let drafts = self.drafts()?;
        let total_pages = drafts.len().div_ceil(self.history_page_size).max(1);
        let page = page.clamp(1, total_pages);

        let drafts = drafts
            .into_iter()
            .skip((page - 1) * self.history_page_size)
            .take(self.history_page_size)
            .collect();

        Ok(HistoryPage {
            drafts,
            page,
            total_pages,
        })
    }
}
