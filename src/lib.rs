//! FlowPilot - declarative browser-flow automation runner and scheduler

pub mod action;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod executor;
pub mod flow;
pub mod init;
pub mod parser;
pub mod result;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod trigger;
pub mod validate;

pub use action::Action;
pub use compiler::{CompiledScript, Compiler};
pub use engine::{create_engine, AutomationEngine, EngineRun, MockEngine, RobotEngine, RunOptions};
pub use error::{FixSuggestion, FlowError, ValidationError};
pub use executor::FlowExecutor;
pub use flow::{Browser, Flow, Step};
pub use result::{ExecutionResult, Statistics};
pub use scheduler::{FlowScheduler, ScheduledTask, TaskUpdate};
pub use status::{StatusChannel, StatusEvent, StatusKind};
pub use store::{FlowStore, FlowSummary};
pub use trigger::TriggerSpec;
