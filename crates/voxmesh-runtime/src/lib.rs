//! Dirty tracking, work routing, and mesh worker units with their transports.
#![forbid(unsafe_code)]

mod dirty;
mod protocol;
mod transport;
mod worker;

pub use dirty::{
    DirtyStats, DirtyTracker, Dispatch, MarkOutcome, SectionStatus, affected_sections, route,
};
pub use protocol::{WorkerEvent, WorkerMsg};
pub use transport::{LocalTransport, ThreadTransport, Transport};
pub use worker::{WorkerConfig, WorkerState, WorkerUnit};
