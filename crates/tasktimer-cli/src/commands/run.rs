use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use tasktimer_core::alarm::{AlarmSignal, SilentAlarm, SoundAlarm};
use tasktimer_core::notify::log::LogTransport;
use tasktimer_core::notify::notify_send::NotifySendTransport;
use tasktimer_core::notify::NotificationTransport;
use tasktimer_core::schedule::parse_cutoff;
use tasktimer_core::{
    Backend, Config, Console, CoreError, LineInput, RunContext, RunOutcome, Schedule,
    ScheduleRunner,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// Desktop notifications through notify-send
    NotifySend,
    /// Log notifications to stderr (set RUST_LOG=info to see them)
    Log,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::NotifySend => Backend::NotifySend,
            BackendArg::Log => Backend::Log,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Schedule file (JSON)
    pub schedule: Option<PathBuf>,

    /// Ignore input during countdowns; tasks only end when time runs out
    #[arg(long)]
    pub no_skip: bool,

    /// Drop tasks starting at or after this time (HH:MM)
    #[arg(long, value_name = "HH:MM")]
    pub workday_end: Option<String>,

    /// Notification backend for this run
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Do not play the alarm sound
    #[arg(long)]
    pub silent: bool,
}

pub async fn run(args: RunArgs) -> tasktimer_core::Result<()> {
    let Some(path) = args.schedule else {
        return Err(CoreError::MissingSchedule);
    };
    let config = Config::load()?;

    // The schedule is checked before any notification can be sent.
    let mut schedule = Schedule::load(&path)?;
    let cutoff = match args.workday_end.as_deref() {
        Some(value) => Some(parse_cutoff(value)?),
        None => config.workday_end()?,
    };
    if let Some(cutoff) = cutoff {
        let dropped = schedule.cut_off_at(cutoff);
        if dropped > 0 {
            println!(
                "Dropped {dropped} task(s) starting at or after {}.",
                cutoff.format("%H:%M")
            );
        }
    }
    if schedule.is_empty() {
        println!("No tasks found in the schedule file.");
        return Ok(());
    }

    let backend = args.backend.map(Backend::from).unwrap_or(config.notifications.backend);
    let transport = connect(backend, &config).await?;

    println!("Loaded schedule for {}.", schedule.date_label());
    println!("Press Ctrl+C to exit at any time for a clean shutdown.");

    if config.notifications.clear_on_start {
        println!("Clearing any pre-existing notifications...");
        if let Err(e) = transport.clear_all().await {
            warn!(error = %e, "could not clear notifications");
        }
    }

    let alarm: Arc<dyn AlarmSignal> = if args.silent || !config.alarm.enabled {
        Arc::new(SilentAlarm)
    } else {
        Arc::new(SoundAlarm::new(
            config.alarm.player.clone(),
            config.alarm.sound_path.clone(),
        ))
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, stopping");
            on_ctrl_c.cancel();
        }
    });

    let mut runner_config = config.runner_config();
    if args.no_skip {
        runner_config.allow_skip = false;
    }
    let ctx = RunContext {
        transport,
        alarm,
        input: Box::new(LineInput::stdin()),
        console: Console::stdout(),
        cancel,
    };

    let summary = ScheduleRunner::new(schedule, runner_config, ctx).run().await;
    match summary.outcome {
        RunOutcome::Completed => info!(tasks = summary.tasks.len(), "run completed"),
        RunOutcome::Stopped { task_index, at } => {
            info!(task_index, at = ?at, "run stopped")
        }
    }
    Ok(())
}

async fn connect(
    backend: Backend,
    config: &Config,
) -> tasktimer_core::Result<Arc<dyn NotificationTransport>> {
    match backend {
        Backend::NotifySend => {
            let transport =
                NotifySendTransport::connect(config.notifications.app_name.clone()).await?;
            Ok(Arc::new(transport))
        }
        Backend::Log => Ok(Arc::new(LogTransport::new())),
    }
}
