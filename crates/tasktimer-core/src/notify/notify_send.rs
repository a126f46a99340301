//! Desktop transport built on `notify-send`.
//!
//! Replacement uses `--replace-id` with the id printed by `--print-id`.
//! Every notification also carries a dunst stack tag equal to its slot, so
//! daemons that honor the hint collapse a slot even without an id. Older
//! `notify-send` builds reject `--print-id`; on those the stack tag is the
//! only link between a slot and its notification.
//! Closing goes through `gdbus` to the freedesktop notification service.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Capabilities, Expiry, NotificationHandle, NotificationRequest, NotificationTransport};
use crate::error::NotifyError;

const NOTIFY_SEND: &str = "notify-send";
const GDBUS: &str = "gdbus";
const DUNSTCTL: &str = "dunstctl";
const CALL_TIMEOUT: Duration = Duration::from_secs(2);

pub struct NotifySendTransport {
    app_name: String,
    timeout: Duration,
    print_id: bool,
}

impl NotifySendTransport {
    /// Check that `notify-send` can be run and build the transport.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` when the binary is missing, which callers treat
    /// as a failed notification-system initialization.
    pub async fn connect(app_name: impl Into<String>) -> Result<Self, NotifyError> {
        let mut transport = Self {
            app_name: app_name.into(),
            timeout: CALL_TIMEOUT,
            print_id: false,
        };
        let help = transport.run(NOTIFY_SEND, &["--help".to_string()]).await?;
        transport.print_id = supports_print_id(&help);
        if transport.print_id {
            debug!("notify-send available");
        } else {
            warn!("notify-send has no --print-id, notifications are replaced by stack tag only");
        }
        Ok(transport)
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<String, NotifyError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| NotifyError::Timeout {
                program: program.to_string(),
                after: self.timeout,
            })?
            .map_err(|source| NotifyError::Unavailable {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(NotifyError::CommandFailed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn send(
        &self,
        request: &NotificationRequest,
        replaces: Option<u32>,
    ) -> Result<NotificationHandle, NotifyError> {
        let args = notify_args(&self.app_name, request, replaces, self.print_id);
        let stdout = self.run(NOTIFY_SEND, &args).await?;
        // Nothing is printed without --print-id.
        let id = stdout.trim().parse::<u32>().ok().or(replaces);
        Ok(NotificationHandle {
            slot: request.slot.clone(),
            id,
        })
    }
}

/// Whether `notify-send --help` lists `--print-id`.
pub(crate) fn supports_print_id(help: &str) -> bool {
    help.lines()
        .any(|line| line.trim_start().split([' ', ',']).any(|w| w == "--print-id"))
}

/// Command-line arguments for one `notify-send` call.
pub(crate) fn notify_args(
    app_name: &str,
    request: &NotificationRequest,
    replaces: Option<u32>,
    print_id: bool,
) -> Vec<String> {
    let expire_ms = match request.expiry {
        Expiry::Persistent => 0,
        Expiry::After(after) => after.as_millis().max(1),
    };

    let mut args = vec![
        format!("--app-name={app_name}"),
        format!("--urgency={}", request.urgency.as_str()),
        format!("--expire-time={expire_ms}"),
        format!("--hint=string:x-dunst-stack-tag:{}", request.slot),
    ];
    if print_id {
        args.push("--print-id".to_string());
    }
    if let Some(icon) = &request.icon {
        args.push(format!("--icon={icon}"));
    }
    if let Some(id) = replaces {
        args.push(format!("--replace-id={id}"));
    }
    args.push("--".to_string());
    args.push(request.title.clone());
    args.push(request.body.clone());
    args
}

#[async_trait]
impl NotificationTransport for NotifySendTransport {
    fn name(&self) -> &str {
        NOTIFY_SEND
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { replace: true }
    }

    async fn notify(
        &self,
        request: &NotificationRequest,
        replaces: Option<&NotificationHandle>,
    ) -> Result<NotificationHandle, NotifyError> {
        self.send(request, replaces.and_then(|h| h.id)).await
    }

    async fn update(
        &self,
        handle: &NotificationHandle,
        request: &NotificationRequest,
    ) -> Result<NotificationHandle, NotifyError> {
        self.send(request, handle.id).await
    }

    async fn close(&self, handle: &NotificationHandle) -> Result<(), NotifyError> {
        match handle.id {
            Some(id) => {
                let args = [
                    "call",
                    "--session",
                    "--dest=org.freedesktop.Notifications",
                    "--object-path=/org/freedesktop/Notifications",
                    "--method=org.freedesktop.Notifications.CloseNotification",
                ]
                .iter()
                .map(|s| s.to_string())
                .chain(std::iter::once(id.to_string()))
                .collect::<Vec<_>>();
                self.run(GDBUS, &args).await.map(|_| ())
            }
            None => {
                // Without an id, supersede the slot through its stack tag
                // with a notice that vanishes immediately.
                let request = NotificationRequest {
                    slot: handle.slot.clone(),
                    title: String::new(),
                    body: String::new(),
                    urgency: super::Urgency::Low,
                    expiry: Expiry::After(Duration::from_millis(1)),
                    icon: None,
                };
                self.send(&request, None).await.map(|_| ())
            }
        }
    }

    async fn clear_all(&self) -> Result<(), NotifyError> {
        self.run(DUNSTCTL, &["close-all".to_string()]).await.map(|_| ())
    }
}
