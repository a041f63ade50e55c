//! Application services for board synchronization.

mod events;
mod sync;
mod triggers;

pub use events::{SyncEvent, SyncStatus};
pub use sync::{SyncController, SyncError, SyncResult};
pub use triggers::{DragEnd, DragOutcome};
