//! Trait definitions for the reelwright run-progress engine.
//!
//! The engine talks to the outside world through two seams: [`RunApi`], the
//! remote job service, and [`Clock`], the source of wall-clock time used for
//! every timing decision. Keeping both behind traits lets the decision logic
//! run against canned snapshots and a fake clock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use traits::RunApi;
