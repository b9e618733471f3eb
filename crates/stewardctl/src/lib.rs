//! stewardctl - Debian maintenance orchestrator
//!
//! Library half of the binary so the pipeline can be driven from
//! integration tests with a fake command runner.

pub mod cli;
pub mod commands;
pub mod display;
pub mod errors;
pub mod lock;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod runner;
pub mod steps;

pub use orchestrator::{Env, NoopObserver, Orchestrator, RunOptions, Session, StepObserver};
pub use prompt::{AutoConfirm, Confirm, TerminalConfirm};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, FakeRunner, SystemRunner};
