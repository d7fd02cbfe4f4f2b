//! The book catalog: readiness, uploads and deletion.

mod manager;
mod readiness;

pub use manager::{DeleteOutcome, LibraryManager};
pub use readiness::{BookReadinessTracker, LibraryTotals};
