//! Domain-aware URL dispatch to a browser automation channel.
//!
//! This crate provides:
//! - [`channel`]: the [`BrowserChannel`] seam and the `osascript` implementation
//! - [`plan`]: host grouping and the batch/pause layout
//! - [`pacer`]: randomized pause sampling
//! - [`scheduler`]: the serial, paced executor and its report

pub mod channel;
pub mod clock;
pub mod pacer;
pub mod plan;
pub mod scheduler;

pub use channel::{AppleScriptChannel, BrowserChannel};
pub use clock::{Clock, TokioClock};
pub use pacer::Pacer;
pub use plan::{DispatchBatch, DomainGroup, Pause, UNKNOWN_HOST, group_by_host};
pub use scheduler::{
    BatchOutcome, DispatchReport, Scheduler, SilentStatus, StatusReporter, UrlStatus,
};
