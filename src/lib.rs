pub mod allocation;
pub mod config;
pub mod draft;
pub mod error;
pub mod service;
pub mod store;
pub mod utils;

pub use allocation::{Outcome, Ranking, allocate};
pub use draft::{Draft, DraftResults, DraftStatus};
pub use error::{DraftError, StoreError, ValidationError};
pub use service::{DraftService, HistoryPage, Submission};
pub use store::{DraftStore, MemoryStore, SledStore};
