//! Campaign orchestration: runs a golden baseline once, then drives `injectN` fault-injection
//! trials against it, either sequentially in-process or as sibling processes, logging each trial
//! to a shared log.

mod golden;
mod log;
mod outcome;
mod runner;

pub use golden::{run_golden, GoldenRun};
pub use log::{append_to_log, format_trial_report, join_fragment, sibling_log_path, TrialReport};
pub use outcome::Outcome;
pub use runner::{execute_trial, CampaignRunner};
