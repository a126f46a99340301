//! Countdown for a single task.
//!
//! ## State Transitions
//!
//! ```text
//! Pending -> Running -> (Skipped | Expired | Interrupted)
//! Pending -> Skipped                 (duration <= 0, nothing shown)
//! ```
//!
//! Each tick waits on one `select!` racing the tick deadline, the operator's
//! next line and the interrupt token, so a skip is seen as soon as it is
//! typed. The countdown slot is closed on every exit from `Running`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::RunContext;
use crate::notify::{Notice, NotificationChannel, SlotId, Urgency};
use crate::schedule::Task;

/// Length of one countdown tick.
pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Pending,
    Running { remaining_secs: u64 },
    /// Ended early by the operator, or never started (invalid duration).
    Skipped,
    /// Reached zero.
    Expired,
    /// Ended by the process-level interrupt.
    Interrupted,
}

/// How a countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownOutcome {
    pub state: TimerState,
    /// Seconds counted down.
    pub ticks: u64,
    pub alarmed: bool,
    /// The operator confirmed the alarm (or input was closed).
    pub acknowledged: bool,
}

enum Slice {
    Elapsed,
    Skip,
    Interrupted,
}

pub struct TaskCountdown<'a> {
    task: &'a Task,
    next_task_info: &'a str,
    allow_skip: bool,
    tick: Duration,
    state: TimerState,
    ticks: u64,
}

impl<'a> TaskCountdown<'a> {
    pub fn new(task: &'a Task, next_task_info: &'a str) -> Self {
        Self {
            task,
            next_task_info,
            allow_skip: true,
            tick: TICK,
            state: TimerState::Pending,
            ticks: 0,
        }
    }

    pub fn allow_skip(mut self, allow: bool) -> Self {
        self.allow_skip = allow;
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run the countdown to its end, including the alarm and its
    /// acknowledgment when the task expires.
    ///
    /// # Cancel safety
    ///
    /// Not cancel safe. The countdown and alarm slots are closed by code
    /// that runs after the wait, so dropping this future mid-await leaves
    /// them on screen. Stop a countdown through `ctx.cancel` instead.
    pub async fn run(&mut self, ctx: &mut RunContext) -> CountdownOutcome {
        let task: &'a Task = self.task;
        let name = &task.name;
        let Some(total_secs) = task.duration_secs() else {
            warn!(task = %name, duration = task.duration_minutes, "invalid duration, task skipped");
            ctx.console
                .line(&format!("Skipping task '{name}' with invalid duration."));
            self.state = TimerState::Skipped;
            return self.outcome(false, false);
        };

        ctx.console.line(&format!(
            "\n---\nStarting task: '{name}' for {} minutes.",
            task.duration_minutes
        ));
        ctx.console.line(&format!("Next up: {}", self.next_task_info));
        if self.allow_skip {
            ctx.console
                .line("Press [Enter] at any time to finish this task early and move on.");
        }
        info!(task = %name, secs = total_secs, "countdown started");

        let mut active = NotificationChannel::new(SlotId::active(), ctx.transport.clone());
        let opening = Notice::new(
            format!("Starting Task: {name}"),
            format!(
                "Time remaining: {:02}:00\nNext: {}",
                task.duration_minutes, self.next_task_info
            ),
        )
        .urgency(Urgency::Critical)
        .icon("dialog-information");
        if let Err(e) = active.show(opening).await {
            warn!(slot = %active.slot(), error = %e, "countdown notification failed");
        }

        self.state = TimerState::Running {
            remaining_secs: total_secs,
        };
        self.tick_loop(ctx, &mut active, total_secs).await;

        // Reached from every loop exit, interrupts included.
        active.close().await;

        match self.state {
            TimerState::Expired => {
                info!(task = %name, "countdown expired");
                let acknowledged = self.sound_alarm(ctx).await;
                self.outcome(true, acknowledged)
            }
            TimerState::Skipped => {
                info!(task = %name, ticks = self.ticks, "countdown skipped");
                self.outcome(false, false)
            }
            _ => {
                info!(task = %name, ticks = self.ticks, "countdown interrupted");
                self.outcome(false, false)
            }
        }
    }

    async fn tick_loop(
        &mut self,
        ctx: &mut RunContext,
        active: &mut NotificationChannel,
        total_secs: u64,
    ) {
        let mut remaining = total_secs;
        let mut deadline = Instant::now();
        let mut listening = self.allow_skip;

        while remaining > 0 {
            deadline += self.tick;
            let slice = self.wait_slice(ctx, deadline, &mut listening).await;
            if self.ends(ctx, slice) {
                return;
            }

            remaining -= 1;
            self.ticks += 1;
            self.state = TimerState::Running {
                remaining_secs: remaining,
            };

            let countdown = format!("{:02}:{:02} remaining", remaining / 60, remaining % 60);
            if remaining > 0 {
                let slice = self
                    .refresh_listening(ctx, active, &countdown, &mut listening)
                    .await;
                if self.ends(ctx, slice) {
                    return;
                }
            }
            ctx.console.status(&format!("⏳ {countdown}"));
        }

        self.state = TimerState::Expired;
    }

    /// Wait until `deadline`, a skip line or the interrupt, whichever is
    /// first. A skip that is ready together with the deadline wins.
    async fn wait_slice(
        &self,
        ctx: &mut RunContext,
        deadline: Instant,
        listening: &mut bool,
    ) -> Slice {
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Slice::Interrupted,
                line = ctx.input.next_line(), if *listening => match line {
                    Some(_) => return Slice::Skip,
                    None => {
                        debug!("operator input closed, skipping disabled");
                        *listening = false;
                    }
                },
                _ = tokio::time::sleep_until(deadline) => return Slice::Elapsed,
            }
        }
    }

    /// Apply a finished slice. Returns true when the countdown must stop.
    fn ends(&mut self, ctx: &mut RunContext, slice: Slice) -> bool {
        match slice {
            Slice::Elapsed => false,
            Slice::Skip => {
                ctx.console.line("\n⏩ Skipping to the next task!");
                self.state = TimerState::Skipped;
                true
            }
            Slice::Interrupted => {
                self.state = TimerState::Interrupted;
                true
            }
        }
    }

    /// Refresh the countdown slot while still listening for a skip line and
    /// the interrupt. A slow transport call is abandoned when either arrives.
    async fn refresh_listening(
        &self,
        ctx: &mut RunContext,
        active: &mut NotificationChannel,
        countdown: &str,
        listening: &mut bool,
    ) -> Slice {
        let refresh = self.refresh(active, countdown);
        tokio::pin!(refresh);
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Slice::Interrupted,
                line = ctx.input.next_line(), if *listening => match line {
                    Some(_) => {
                        debug!("countdown update abandoned for skip");
                        return Slice::Skip;
                    }
                    None => {
                        debug!("operator input closed, skipping disabled");
                        *listening = false;
                    }
                },
                _ = &mut refresh => return Slice::Elapsed,
            }
        }
    }

    async fn refresh(&self, active: &mut NotificationChannel, countdown: &str) {
        let title = format!("Current Task: {}", self.task.name);
        let body = format!("<b>{countdown}</b>\nNext: {}", self.next_task_info);

        let result = if active.is_open() {
            active.update(&title, &body).await
        } else {
            // The opening show failed; try to get the slot back on screen.
            let notice = Notice::new(title, body)
                .urgency(Urgency::Critical)
                .icon("dialog-information");
            active.show(notice).await
        };
        if let Err(e) = result {
            warn!(slot = %active.slot(), error = %e, "countdown update failed");
        }
    }

    /// Announce expiry and block until the operator acknowledges.
    async fn sound_alarm(&self, ctx: &mut RunContext) -> bool {
        ctx.console.line("\r✅ Task complete!                     ");

        let mut alarm = NotificationChannel::new(SlotId::alarm(), ctx.transport.clone());
        let notice = Notice::new(
            format!("Finished: {}", self.task.name),
            format!("Take a break! \nNext up is: {}", self.next_task_info),
        )
        .urgency(Urgency::Critical)
        .icon("dialog-warning");
        if !self.allow_skip {
            let stale = ctx.input.discard_pending();
            if stale > 0 {
                debug!(lines = stale, "discarded input typed during countdown");
            }
        }

        if let Err(e) = alarm.show(notice).await {
            warn!(slot = %alarm.slot(), error = %e, "alarm notification failed");
        }
        ctx.alarm.play();

        ctx.console
            .status("🚨 ALARM! Press Enter to stop the alarm and start the next task...");
        let acknowledged = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => false,
            line = ctx.input.next_line() => {
                if line.is_none() {
                    warn!("operator input closed, continuing without acknowledgment");
                }
                true
            }
        };

        alarm.close().await;
        acknowledged
    }

    fn outcome(&self, alarmed: bool, acknowledged: bool) -> CountdownOutcome {
        CountdownOutcome {
            state: self.state,
            ticks: self.ticks,
            alarmed,
            acknowledged,
        }
    }
}
