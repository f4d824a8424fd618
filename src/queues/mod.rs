//! The three monitor-protected queues connecting splitter, workers, and
//! muxer (spec §2, §5): M→S (free slots), SW→W (scan/decode work), W→M
//! (decoded sub-blocks + released slots).

mod delivery;
mod scanwork;
mod slot;

pub use delivery::{Drain, DeliveryMonitor};
pub use scanwork::{ScanWorkMonitor, WorkItem};
pub use slot::{SlotMonitor, MIN_SLOTS};
