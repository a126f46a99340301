//! Audible alarm at task expiry.
//!
//! Playback is fire-and-forget. A missing player or sound file is logged
//! and otherwise ignored.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

/// Something that makes the operator look up.
pub trait AlarmSignal: Send + Sync {
    /// Start the alarm and return immediately. Never fails.
    fn play(&self);
}

/// Plays a sound file with an external player (`paplay` by default).
#[derive(Debug, Clone)]
pub struct SoundAlarm {
    player: String,
    sound_path: PathBuf,
}

impl SoundAlarm {
    pub fn new(player: impl Into<String>, sound_path: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            sound_path: sound_path.into(),
        }
    }
}

impl AlarmSignal for SoundAlarm {
    fn play(&self) {
        if !self.sound_path.exists() {
            warn!(path = %self.sound_path.display(), "alarm sound not found, skipping playback");
            return;
        }

        // tokio reaps the child in the background once the handle drops.
        let spawned = Command::new(&self.player)
            .arg(&self.sound_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(_child) => debug!(player = %self.player, "alarm started"),
            Err(e) => warn!(
                player = %self.player,
                error = %e,
                "cannot play alarm sound (install pulseaudio-utils for paplay)"
            ),
        }
    }
}

/// Alarm that only logs, for `--silent` runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAlarm;

impl AlarmSignal for SilentAlarm {
    fn play(&self) {
        debug!("alarm muted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_sound_file_is_not_fatal() {
        SoundAlarm::new("paplay", "/nonexistent/alarm.oga").play();
    }

    #[tokio::test]
    async fn missing_player_is_not_fatal() {
        let sound = tempfile::NamedTempFile::new().unwrap();
        SoundAlarm::new("definitely-not-a-sound-player", sound.path()).play();
    }
}
