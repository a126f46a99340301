//! Runs a schedule's tasks one after another.
//!
//! Tasks run strictly in file order. Before task `i` starts, task `i-1` is
//! marked completed on the timeline; after the last task the last slot is
//! marked and a short-lived "finished" notice is shown.

use std::time::Duration;

use tracing::info;

use super::countdown::{CountdownOutcome, TaskCountdown, TimerState, TICK};
use super::RunContext;
use crate::notify::{Notice, NotificationChannel, SlotId, Urgency};
use crate::schedule::Schedule;
use crate::timeline::{TimelineTracker, DEFAULT_SHOW_DELAY};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Whether a line of input ends the running task early.
    pub allow_skip: bool,
    /// Show the per-task timeline slots.
    pub timeline: bool,
    pub timeline_delay: Duration,
    /// Auto-expiry of the end-of-schedule notice.
    pub final_expiry: Duration,
    pub tick: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            allow_skip: true,
            timeline: true,
            timeline_delay: DEFAULT_SHOW_DELAY,
            final_expiry: Duration::from_secs(5),
            tick: TICK,
        }
    }
}

/// Where an interrupted run was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPoint {
    BetweenTasks,
    Countdown,
    Acknowledgment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task ran (or there was nothing to run).
    Completed,
    /// The operator interrupted the run.
    Stopped { task_index: usize, at: StopPoint },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// One entry per task that was started, in order.
    pub tasks: Vec<CountdownOutcome>,
}

pub struct ScheduleRunner {
    schedule: Schedule,
    config: RunnerConfig,
    ctx: RunContext,
    timeline: TimelineTracker,
}

impl ScheduleRunner {
    pub fn new(schedule: Schedule, config: RunnerConfig, ctx: RunContext) -> Self {
        let mut timeline =
            TimelineTracker::new(ctx.transport.clone()).with_delay(config.timeline_delay);
        if !config.timeline {
            timeline = timeline.hidden();
        }
        Self {
            schedule,
            config,
            ctx,
            timeline,
        }
    }

    pub fn timeline(&self) -> &TimelineTracker {
        &self.timeline
    }

    pub async fn run(&mut self) -> RunSummary {
        let mut outcomes = Vec::with_capacity(self.schedule.len());

        if self.schedule.is_empty() {
            self.ctx.console.line("No tasks found in the schedule file.");
            return summary(RunOutcome::Completed, outcomes);
        }
        if self.ctx.cancel.is_cancelled() {
            return self.stopped(0, StopPoint::BetweenTasks, outcomes);
        }

        if self.config.timeline {
            self.ctx
                .console
                .line("Queueing timeline notifications for today's schedule...");
        }
        self.timeline.initialize(&self.schedule.tasks).await;

        for index in 0..self.schedule.len() {
            if self.ctx.cancel.is_cancelled() {
                return self.stopped(index, StopPoint::BetweenTasks, outcomes);
            }
            if index > 0 {
                self.timeline.mark_completed(index - 1).await;
            }
            self.timeline.mark_active(index);

            let next_task_info = self.schedule.next_task_info(index);
            let outcome = TaskCountdown::new(&self.schedule.tasks[index], &next_task_info)
                .allow_skip(self.config.allow_skip)
                .tick(self.config.tick)
                .run(&mut self.ctx)
                .await;
            outcomes.push(outcome);

            if outcome.state == TimerState::Interrupted {
                return self.stopped(index, StopPoint::Countdown, outcomes);
            }
            if outcome.alarmed && !outcome.acknowledged {
                return self.stopped(index, StopPoint::Acknowledgment, outcomes);
            }
        }

        self.timeline.mark_completed(self.schedule.len() - 1).await;
        self.ctx
            .console
            .line("\n---\n🎉 All tasks completed! Great work. ---");
        self.show_finished().await;
        info!(tasks = outcomes.len(), "schedule finished");

        summary(RunOutcome::Completed, outcomes)
    }

    /// The one notice allowed to expire on its own; nothing closes it.
    async fn show_finished(&self) {
        let mut finished = NotificationChannel::new(SlotId::finished(), self.ctx.transport.clone());
        let notice = Notice::new("Schedule Finished!", "All tasks for today are complete.")
            .urgency(Urgency::Critical)
            .expires_after(self.config.final_expiry)
            .icon("emblem-ok");
        if let Err(e) = finished.show(notice).await {
            tracing::warn!(slot = %finished.slot(), error = %e, "final notification failed");
        }
    }

    fn stopped(
        &mut self,
        task_index: usize,
        at: StopPoint,
        outcomes: Vec<CountdownOutcome>,
    ) -> RunSummary {
        info!(task_index, at = ?at, "run stopped by user");
        self.ctx
            .console
            .line("\n\nTimer stopped by user. Exiting gracefully.");
        summary(RunOutcome::Stopped { task_index, at }, outcomes)
    }
}

fn summary(outcome: RunOutcome, tasks: Vec<CountdownOutcome>) -> RunSummary {
    RunSummary { outcome, tasks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmSignal, SilentAlarm};
    use crate::input::LineInput;
    use crate::notify::memory::{CallKind, MemoryTransport};
    use crate::schedule::Task;
    use crate::timeline::TimelineStatus;
    use crate::timer::Console;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedSender;
    use tokio_util::sync::CancellationToken;

    fn runner(schedule: Schedule, transport: Arc<MemoryTransport>) -> ScheduleRunner {
        let (operator, input) = LineInput::channel();
        drop(operator);
        let ctx = RunContext {
            transport,
            alarm: Arc::new(SilentAlarm),
            input: Box::new(input),
            console: Console::sink(),
            cancel: CancellationToken::new(),
        };
        ScheduleRunner::new(schedule, RunnerConfig::default(), ctx)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_schedule_shows_nothing() {
        let transport = Arc::new(MemoryTransport::new());
        let summary = runner(Schedule::default(), transport.clone()).run().await;

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert!(summary.tasks.is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_tasks_are_passed_over() {
        let transport = Arc::new(MemoryTransport::new());
        let schedule = Schedule::new(vec![Task::new("zero", 0), Task::new("one", 1)]);
        let mut runner = runner(schedule, transport.clone());

        let summary = runner.run().await;

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.tasks[0].state, TimerState::Skipped);
        assert_eq!(summary.tasks[1].state, TimerState::Expired);
        assert_eq!(transport.count(&SlotId::active(), CallKind::Notify), 1);
        assert_eq!(transport.count(&SlotId::timeline(0), CallKind::Notify), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_notice_expires_by_itself() {
        let transport = Arc::new(MemoryTransport::new());
        let schedule = Schedule::new(vec![Task::new("one", 1)]);
        runner(schedule, transport.clone()).run().await;

        let finished: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|c| c.slot == SlotId::finished())
            .collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].title, "Schedule Finished!");
        assert_eq!(finished[0].urgency, Some(Urgency::Critical));
        assert_eq!(
            finished[0].expiry,
            Some(crate::notify::Expiry::After(Duration::from_secs(5)))
        );
    }

    /// Alarm that either answers itself or hits Ctrl-C when it rings.
    struct ScriptedAlarm {
        plays: AtomicUsize,
        operator: UnboundedSender<String>,
        interrupt: Option<CancellationToken>,
    }

    impl AlarmSignal for ScriptedAlarm {
        fn play(&self) {
            self.plays.fetch_add(1, Ordering::SeqCst);
            match &self.interrupt {
                Some(cancel) => cancel.cancel(),
                None => {
                    let _ = self.operator.send(String::new());
                }
            }
        }
    }

    struct Harness {
        transport: Arc<MemoryTransport>,
        alarm: Arc<ScriptedAlarm>,
        operator: UnboundedSender<String>,
        cancel: CancellationToken,
        runner: ScheduleRunner,
    }

    fn harness(schedule: Schedule, interrupt_on_alarm: bool) -> Harness {
        let transport = Arc::new(MemoryTransport::new());
        let (operator, input) = LineInput::channel();
        let cancel = CancellationToken::new();
        let alarm = Arc::new(ScriptedAlarm {
            plays: AtomicUsize::new(0),
            operator: operator.clone(),
            interrupt: interrupt_on_alarm.then(|| cancel.clone()),
        });
        let ctx = RunContext {
            transport: transport.clone(),
            alarm: alarm.clone(),
            input: Box::new(input),
            console: Console::sink(),
            cancel: cancel.clone(),
        };
        Harness {
            transport,
            alarm,
            operator,
            cancel,
            runner: ScheduleRunner::new(schedule, RunnerConfig::default(), ctx),
        }
    }

    fn two_tasks() -> Schedule {
        Schedule::new(vec![
            Task::new("A", 1).with_start_time("09:00"),
            Task::new("B", 2).with_start_time("09:01"),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn runs_every_task_to_the_end() {
        let mut h = harness(two_tasks(), false);

        let summary = h.runner.run().await;

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.tasks.len(), 2);
        assert_eq!(summary.tasks[0].ticks, 60);
        assert_eq!(summary.tasks[1].ticks, 120);
        assert_eq!(h.alarm.plays.load(Ordering::SeqCst), 2);

        let t = &h.transport;
        assert_eq!(t.count(&SlotId::timeline(0), CallKind::Notify), 2);
        assert_eq!(t.count(&SlotId::timeline(1), CallKind::Notify), 2);
        assert_eq!(t.count(&SlotId::active(), CallKind::Notify), 2);
        assert_eq!(t.total(CallKind::Update), 59 + 119);
        assert_eq!(t.count(&SlotId::alarm(), CallKind::Notify), 2);
        assert_eq!(t.count(&SlotId::finished(), CallKind::Notify), 1);

        // Only the timeline and the final notice stay on screen.
        assert_eq!(t.visible(&SlotId::active()), 0);
        assert_eq!(t.visible(&SlotId::alarm()), 0);
        assert_eq!(t.visible(&SlotId::timeline(0)), 1);
        assert_eq!(t.visible(&SlotId::timeline(1)), 1);

        // A task is marked completed only after its alarm is acknowledged
        // and before the next countdown appears.
        let sequence: Vec<_> = t
            .calls()
            .into_iter()
            .filter(|c| c.kind != CallKind::Update)
            .map(|c| (c.kind, c.slot))
            .collect();
        assert_eq!(
            sequence,
            vec![
                (CallKind::Notify, SlotId::timeline(0)),
                (CallKind::Notify, SlotId::timeline(1)),
                (CallKind::Notify, SlotId::active()),
                (CallKind::Close, SlotId::active()),
                (CallKind::Notify, SlotId::alarm()),
                (CallKind::Close, SlotId::alarm()),
                (CallKind::Notify, SlotId::timeline(0)),
                (CallKind::Notify, SlotId::active()),
                (CallKind::Close, SlotId::active()),
                (CallKind::Notify, SlotId::alarm()),
                (CallKind::Close, SlotId::alarm()),
                (CallKind::Notify, SlotId::timeline(1)),
                (CallKind::Notify, SlotId::finished()),
            ]
        );

        let timeline = h.runner.timeline();
        assert_eq!(timeline.status(0), Some(TimelineStatus::Completed));
        assert_eq!(timeline.status(1), Some(TimelineStatus::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_moves_on_without_alarm() {
        let mut h = harness(two_tasks(), false);
        let operator = h.operator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10_500)).await;
            let _ = operator.send(String::new());
        });

        let summary = h.runner.run().await;

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.tasks[0].state, TimerState::Skipped);
        assert_eq!(summary.tasks[0].ticks, 10);
        assert_eq!(summary.tasks[1].state, TimerState::Expired);
        assert_eq!(h.alarm.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_mid_countdown_stops_the_run() {
        let mut h = harness(two_tasks(), false);
        let cancel = h.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            cancel.cancel();
        });

        let summary = h.runner.run().await;

        assert_eq!(
            summary.outcome,
            RunOutcome::Stopped {
                task_index: 0,
                at: StopPoint::Countdown
            }
        );
        assert_eq!(summary.tasks.len(), 1);
        assert_eq!(h.transport.count(&SlotId::active(), CallKind::Close), 1);
        assert_eq!(h.transport.visible(&SlotId::active()), 0);
        assert_eq!(h.transport.count(&SlotId::finished(), CallKind::Notify), 0);
        assert_eq!(h.runner.timeline().status(1), Some(TimelineStatus::Upcoming));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_while_alarm_rings_stops_the_run() {
        let mut h = harness(two_tasks(), true);

        let summary = h.runner.run().await;

        assert_eq!(
            summary.outcome,
            RunOutcome::Stopped {
                task_index: 0,
                at: StopPoint::Acknowledgment
            }
        );
        assert!(summary.tasks[0].alarmed);
        assert!(!summary.tasks[0].acknowledged);
        assert_eq!(h.transport.visible(&SlotId::alarm()), 0);
        assert_eq!(h.transport.count(&SlotId::active(), CallKind::Notify), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_touches_nothing() {
        let transport = Arc::new(MemoryTransport::new());
        let schedule = Schedule::new(vec![Task::new("one", 1)]);
        let mut runner = runner(schedule, transport.clone());
        runner.ctx.cancel.cancel();

        let summary = runner.run().await;

        assert_eq!(
            summary.outcome,
            RunOutcome::Stopped {
                task_index: 0,
                at: StopPoint::BetweenTasks
            }
        );
        assert!(transport.calls().is_empty());
    }
}
