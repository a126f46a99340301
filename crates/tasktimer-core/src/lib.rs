//! # Tasktimer Core Library
//!
//! Runs a day's schedule of timed tasks as a sequence of countdowns, driving
//! desktop notifications and an audible alarm. The `tasktimer` CLI is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Countdown**: a per-task state machine ticking once per second that
//!   listens for a skip line and the process interrupt between ticks
//! - **Notifications**: one channel per on-screen slot over a pluggable
//!   transport (`notify-send`, tracing log, in-memory recorder)
//! - **Timeline**: a persistent slot per task showing upcoming/completed
//! - **Storage**: TOML-based configuration
//! - **Generator**: turns a to-do list into a schedule through an
//!   OpenAI-compatible API
//!
//! ## Key Components
//!
//! - [`ScheduleRunner`]: runs every task of a [`Schedule`] in order
//! - [`TaskCountdown`]: countdown state machine for one task
//! - [`NotificationChannel`]: at most one notification per slot
//! - [`TimelineTracker`]: per-task timeline slots
//! - [`Config`]: application configuration management

pub mod alarm;
pub mod error;
pub mod generator;
pub mod input;
pub mod notify;
pub mod schedule;
pub mod storage;
pub mod timeline;
pub mod timer;

pub use alarm::{AlarmSignal, SilentAlarm, SoundAlarm};
pub use error::{ConfigError, CoreError, GeneratorError, NotifyError, Result, ScheduleError};
pub use generator::{ChatCompletionsGenerator, PlanRequest, ScheduleGenerator};
pub use input::{LineInput, OperatorInput};
pub use notify::{NotificationChannel, NotificationTransport, SlotId};
pub use schedule::{Schedule, Task};
pub use storage::{Backend, Config};
pub use timeline::{TimelineStatus, TimelineTracker};
pub use timer::{
    Console, CountdownOutcome, RunContext, RunOutcome, RunSummary, RunnerConfig, ScheduleRunner,
    StopPoint, TaskCountdown, TimerState,
};
