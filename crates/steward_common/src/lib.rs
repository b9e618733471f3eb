//! Steward Common - policy engines and shared types for Steward
//!
//! The kernel retention planner and the reboot inference engine are pure
//! functions over collected facts; they never run external tools.
//! Parsers and the signal adapter turn tool output into their inputs.

pub mod config;
pub mod error;
pub mod parsers;
pub mod reboot;
pub mod report;
pub mod retention;
pub mod signals;
pub mod version;

pub use config::Config;
pub use error::{Result, StewardError};
pub use reboot::{evaluate, RebootAdvisory, RebootReason, RebootSignals, RebootVerdict};
pub use report::{MaintenanceReport, StepKind, StepReport, StepStatus};
pub use retention::{
    plan, InstalledKernelSet, KernelRetentionPlanner, RetentionPlan, DEFAULT_KEEP_KERNELS,
};
pub use signals::RebootFacts;
pub use version::{compare_versions, KernelIdentifier};
