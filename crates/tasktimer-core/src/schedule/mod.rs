//! Schedule data model.
//!
//! A schedule is produced by the generator (or written by hand) as JSON:
//!
//! ```json
//! { "schedule_date": "2024-09-25",
//!   "tasks": [ { "task_name": "Write report", "start_time": "09:00",
//!                "end_time": "10:00", "duration_minutes": 60 } ] }
//! ```
//!
//! Only `duration_minutes` governs behavior. Names and times are display
//! strings, and missing fields fall back to placeholders.

use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ScheduleError;

/// Text shown as "next task" while the last task runs.
pub const END_OF_SCHEDULE: &str = "End of schedule!";

const UNNAMED_TASK: &str = "Unnamed Task";
const UNKNOWN_TIME: &str = "??:??";

/// A single timed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "task_name", default = "default_task_name")]
    pub name: String,
    #[serde(default = "default_time")]
    pub start_time: String,
    #[serde(default = "default_time")]
    pub end_time: String,
    /// Zero or negative durations are skipped at run time.
    #[serde(default)]
    pub duration_minutes: i64,
}

fn default_task_name() -> String {
    UNNAMED_TASK.to_string()
}

fn default_time() -> String {
    UNKNOWN_TIME.to_string()
}

impl Task {
    pub fn new(name: impl Into<String>, duration_minutes: i64) -> Self {
        Self {
            name: name.into(),
            start_time: default_time(),
            end_time: default_time(),
            duration_minutes,
        }
    }

    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = start_time.into();
        self
    }

    /// Countdown length in seconds, or `None` when the task must be skipped.
    pub fn duration_secs(&self) -> Option<u64> {
        if self.duration_minutes <= 0 {
            return None;
        }
        Some((self.duration_minutes as u64).saturating_mul(60))
    }

    /// Start time as a clock time, if it is a valid `HH:MM`.
    pub fn start(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(self.start_time.trim(), "%H:%M").ok()
    }

    /// How this task is described while the previous one runs.
    pub fn summary(&self) -> String {
        format!("'{}' ({} min)", self.name, self.duration_minutes)
    }
}

/// A day's ordered task list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_date: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Schedule {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            schedule_date: None,
            tasks,
        }
    }

    /// Load a schedule from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the file is absent, `Read` for other IO
    /// failures and `Parse` when the content is not a schedule.
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ScheduleError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ScheduleError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|source| ScheduleError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Date label for display, "today" when the file carries none.
    pub fn date_label(&self) -> &str {
        self.schedule_date.as_deref().unwrap_or("today")
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Description of the task after `index`, or the end-of-schedule text.
    pub fn next_task_info(&self, index: usize) -> String {
        self.tasks
            .get(index + 1)
            .map(Task::summary)
            .unwrap_or_else(|| END_OF_SCHEDULE.to_string())
    }

    /// Drop tasks that start at or after `cutoff`.
    ///
    /// Tasks whose start time does not parse are kept. Returns how many
    /// tasks were dropped.
    pub fn cut_off_at(&mut self, cutoff: NaiveTime) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| match task.start() {
            Some(start) if start >= cutoff => {
                info!(task = %task.name, start = %task.start_time, "task starts after workday end, dropped");
                false
            }
            _ => true,
        });
        before - self.tasks.len()
    }
}

/// Parse an `HH:MM` workday cutoff.
pub fn parse_cutoff(value: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ScheduleError::InvalidCutoff(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_use_placeholders() {
        let schedule: Schedule = serde_json::from_str(r#"{"tasks":[{}]}"#).unwrap();
        let task = &schedule.tasks[0];
        assert_eq!(task.name, "Unnamed Task");
        assert_eq!(task.start_time, "??:??");
        assert_eq!(task.duration_minutes, 0);
        assert_eq!(schedule.date_label(), "today");
    }

    #[test]
    fn non_positive_duration_has_no_countdown() {
        assert_eq!(Task::new("a", 0).duration_secs(), None);
        assert_eq!(Task::new("a", -5).duration_secs(), None);
        assert_eq!(Task::new("a", 2).duration_secs(), Some(120));
    }

    #[test]
    fn next_task_info_describes_following_task() {
        let schedule = Schedule::new(vec![Task::new("A", 1), Task::new("B", 2)]);
        assert_eq!(schedule.next_task_info(0), "'B' (2 min)");
        assert_eq!(schedule.next_task_info(1), END_OF_SCHEDULE);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Schedule::load(Path::new("/nonexistent/schedule.json")).unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound { .. }));
    }

    #[test]
    fn load_reports_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Schedule::load(file.path()).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse { .. }));
    }

    #[test]
    fn load_reads_generator_output() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"schedule_date":"2024-01-01","tasks":[{{"task_name":"Write","start_time":"10:00","end_time":"11:00","duration_minutes":60}}]}}"#
        )
        .unwrap();
        let schedule = Schedule::load(file.path()).unwrap();
        assert_eq!(schedule.date_label(), "2024-01-01");
        assert_eq!(schedule.tasks[0].name, "Write");
        assert_eq!(schedule.tasks[0].duration_secs(), Some(3600));
    }

    #[test]
    fn cutoff_drops_late_tasks_and_keeps_unknown_times() {
        let mut schedule = Schedule::new(vec![
            Task::new("early", 30).with_start_time("21:30"),
            Task::new("late", 30).with_start_time("23:00"),
            Task::new("unknown", 30),
        ]);
        let dropped = schedule.cut_off_at(parse_cutoff("23:00").unwrap());
        assert_eq!(dropped, 1);
        let names: Vec<_> = schedule.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["early", "unknown"]);
    }

    #[test]
    fn cutoff_must_be_clock_time() {
        assert!(parse_cutoff("11pm").is_err());
        assert!(parse_cutoff(" 07:45 ").is_ok());
    }
}
