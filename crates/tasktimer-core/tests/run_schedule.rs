//! Schedule file to finished run, through the public API only.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tasktimer_core::notify::memory::{CallKind, MemoryTransport};
use tasktimer_core::notify::SlotId;
use tasktimer_core::{
    AlarmSignal, Console, LineInput, RunContext, RunOutcome, RunnerConfig, Schedule,
    ScheduleError, ScheduleRunner, TimerState,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// The operator presses Enter as soon as the alarm rings.
struct Operator {
    plays: AtomicUsize,
    keyboard: UnboundedSender<String>,
}

impl AlarmSignal for Operator {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
        let _ = self.keyboard.send(String::new());
    }
}

fn schedule_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

const TWO_TASKS: &str = r#"{
  "schedule_date": "2024-09-25",
  "tasks": [
    {"task_name": "A", "start_time": "09:00", "end_time": "09:01", "duration_minutes": 1},
    {"task_name": "B", "start_time": "09:01", "end_time": "09:03", "duration_minutes": 2}
  ]
}"#;

#[tokio::test(start_paused = true)]
async fn skip_at_tick_ten_then_full_second_task() {
    let file = schedule_file(TWO_TASKS);
    let schedule = Schedule::load(file.path()).unwrap();
    assert_eq!(schedule.date_label(), "2024-09-25");

    let transport = Arc::new(MemoryTransport::new());
    let (keyboard, input) = LineInput::channel();
    let operator = Arc::new(Operator {
        plays: AtomicUsize::new(0),
        keyboard: keyboard.clone(),
    });
    let ctx = RunContext {
        transport: transport.clone(),
        alarm: operator.clone(),
        input: Box::new(input),
        console: Console::sink(),
        cancel: CancellationToken::new(),
    };
    let config = RunnerConfig {
        timeline_delay: Duration::ZERO,
        ..RunnerConfig::default()
    };

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let _ = keyboard.send(String::new());
    });
    let summary = ScheduleRunner::new(schedule, config, ctx).run().await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.tasks[0].state, TimerState::Skipped);
    assert_eq!(summary.tasks[0].ticks, 10);
    assert!(!summary.tasks[0].alarmed);
    assert_eq!(summary.tasks[1].state, TimerState::Expired);
    assert_eq!(summary.tasks[1].ticks, 120);
    assert_eq!(operator.plays.load(Ordering::SeqCst), 1);

    assert_eq!(transport.count(&SlotId::active(), CallKind::Update), 10 + 119);
    assert_eq!(transport.count(&SlotId::active(), CallKind::Close), 2);
    assert_eq!(transport.count(&SlotId::finished(), CallKind::Notify), 1);
}

#[test]
fn absent_schedule_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let err = Schedule::load(&path).unwrap_err();

    assert!(matches!(err, ScheduleError::NotFound { .. }));
    assert_eq!(
        err.to_string(),
        format!("The file '{}' was not found.", path.display())
    );
}

#[test]
fn malformed_schedule_is_a_parse_error() {
    let file = schedule_file("{\"tasks\": [");
    let err = Schedule::load(file.path()).unwrap_err();
    assert!(matches!(err, ScheduleError::Parse { .. }));
    assert!(err.to_string().contains("is not a valid JSON schedule"));
}
