//! Draft persistence
//!
//! Every store offers a per-draft atomic read-modify-write through
//! [`DraftStore::update`]. A failed mutation leaves the stored draft untouched.
use super::draft::Draft;
use super::error::{DraftError, StoreError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

const DRAFTS_TREE: &str = "drafts";

pub trait DraftStore {
    /// Stores a freshly created draft.
    fn insert(&self, draft: &Draft) -> Result<(), StoreError>;

    fn load(&self, draft_id: &str) -> Result<Option<Draft>, StoreError>;

    /// Every stored draft, in no particular order.
    fn list(&self) -> Result<Vec<Draft>, StoreError>;

    /// Applies `mutate` to the current state of a draft and persists the
    /// result atomically. `mutate` may run more than once when a concurrent
    /// writer gets in first; only the attempt that commits is observable.
    fn update<T, F>(&self, draft_id: &str, mutate: F) -> Result<(Draft, T), DraftError>
    where
        F: FnMut(&mut Draft) -> Result<T, DraftError>;
}

fn encode(draft: &Draft) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(draft).map_err(|e| StoreError::Encode(e.to_string()))
}

/// sled backed store. Drafts are CBOR encoded under their id.
pub struct SledStore {
    instance: Arc<sled::Db>,
    drafts: sled::Tree,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        let drafts = instance.open_tree(DRAFTS_TREE)?;
        Ok(Self { instance, drafts })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.instance.flush()?;
        Ok(())
    }
}

impl DraftStore for SledStore {
    fn insert(&self, draft: &Draft) -> Result<(), StoreError> {
        self.drafts.insert(draft.id().as_bytes(), encode(draft)?)?;
        Ok(())
    }

    fn load(&self, draft_id: &str) -> Result<Option<Draft>, StoreError> {
        match self.drafts.get(draft_id.as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<Draft>, StoreError> {
        let mut drafts = Vec::new();
        for entry in self.drafts.iter() {
            let (_, bytes) = entry?;
            drafts.push(minicbor::decode(&bytes)?);
        }
        Ok(drafts)
    }

    fn update<T, F>(&self, draft_id: &str, mut mutate: F) -> Result<(Draft, T), DraftError>
    where
        F: FnMut(&mut Draft) -> Result<T, DraftError>,
    {
        // optimistic: re-run the mutation until the swap lands on the bytes we read
        loop {
            let current = self
                .drafts
                .get(draft_id.as_bytes())
                .map_err(StoreError::from)?
                .ok_or_else(|| DraftError::NotFound(draft_id.to_string()))?;

            let mut draft: Draft = minicbor::decode(&current).map_err(StoreError::from)?;
            let value = mutate(&mut draft)?;
            let updated = encode(&draft)?;

            let swap = self
                .drafts
                .compare_and_swap(draft_id.as_bytes(), Some(&current[..]), Some(updated))
                .map_err(StoreError::from)?;
            match swap {
                Ok(()) => return Ok((draft, value)),
                Err(_) => debug!(draft_id, "concurrent draft update, retrying"),
            }
        }
    }
}

/// Process-local store, mostly for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    drafts: Mutex<BTreeMap<String, Draft>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryStore {
    fn insert(&self, draft: &Draft) -> Result<(), StoreError> {
        let mut drafts = self.drafts.lock().map_err(|_| StoreError::Poisoned)?;
        drafts.insert(draft.id().to_string(), draft.clone());
        Ok(())
    }

    fn load(&self, draft_id: &str) -> Result<Option<Draft>, StoreError> {
        let drafts = self.drafts.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(drafts.get(draft_id).cloned())
    }

    fn list(&self) -> Result<Vec<Draft>, StoreError> {
        let drafts = self.drafts.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(drafts.values().cloned().collect())
    }

    fn update<T, F>(&self, draft_id: &str, mut mutate: F) -> Result<(Draft, T), DraftError>
    where
        F: FnMut(&mut Draft) -> Result<T, DraftError>,
    {
        let mut drafts = self.drafts.lock().map_err(|_| StoreError::Poisoned)?;
        let stored = drafts
            .get_mut(draft_id)
            .ok_or_else(|| DraftError::NotFound(draft_id.to_string()))?;

        let mut draft = stored.clone();
        let value = mutate(&mut draft)?;
        *stored = draft.clone();
        Ok((draft, value))
    }
}
