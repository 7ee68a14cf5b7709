//! Reply scheduling
//!
//! # Modules
//!
//! - [`quota`]: splits the run budget between the global feed and creators
//! - [`orchestrator`]: the run loop that picks sources, filters candidates
//!   and posts replies
//!
//! # Example
//!
//! ```
//! use replybot::scheduler::Quota;
//!
//! let quota = Quota::plan(10, 60);
//! assert_eq!((quota.global, quota.creator), (6, 4));
//! ```

pub mod orchestrator;
pub mod quota;

pub use orchestrator::{LogReporter, ProgressReporter, SchedulerSettings, TargetScheduler};
pub use quota::Quota;
