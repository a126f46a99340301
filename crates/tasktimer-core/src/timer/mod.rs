mod console;
mod countdown;
mod runner;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::alarm::AlarmSignal;
use crate::input::OperatorInput;
use crate::notify::NotificationTransport;

pub use console::Console;
pub use countdown::{CountdownOutcome, TaskCountdown, TimerState, TICK};
pub use runner::{RunOutcome, RunSummary, RunnerConfig, ScheduleRunner, StopPoint};

/// Everything a run talks to outside its own state.
///
/// `cancel` is the process-level interrupt. Every suspension point of a run
/// listens to it, so a cancelled run still executes its cleanup.
pub struct RunContext {
    pub transport: Arc<dyn NotificationTransport>,
    pub alarm: Arc<dyn AlarmSignal>,
    pub input: Box<dyn OperatorInput>,
    pub console: Console,
    pub cancel: CancellationToken,
}
