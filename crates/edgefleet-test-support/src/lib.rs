//! Shared test doubles for the Edgefleet gateway service.

mod clock;
mod container;
mod repository;

pub use clock::{FixedClock, ManualClock};
pub use container::{FailingContainerManager, RecordingContainerManager};
pub use repository::{
    ConflictingEventRepository, EmptyEventRepository, FailingEventRepository,
    RecordingEventRepository,
};
