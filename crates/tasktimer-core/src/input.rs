//! Operator input.
//!
//! One line of input means "advance": during a countdown it is the skip
//! signal, after an alarm it is the acknowledgment.

use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[async_trait]
pub trait OperatorInput: Send {
    /// Wait for the next line. `None` once the input is closed.
    ///
    /// Must be cancel-safe: a dropped wait loses no line.
    async fn next_line(&mut self) -> Option<String>;

    /// Drop lines typed so far without waiting. Returns how many.
    fn discard_pending(&mut self) -> usize;
}

/// Input backed by a channel of lines.
#[derive(Debug)]
pub struct LineInput {
    rx: mpsc::UnboundedReceiver<String>,
}

impl LineInput {
    /// An input fed by the returned sender.
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Read stdin on a dedicated thread.
    ///
    /// A plain thread rather than async stdin, so a pending read never holds
    /// up runtime shutdown.
    pub fn stdin() -> Self {
        let (tx, input) = Self::channel();
        let spawned = std::thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "stdin read failed");
                            return;
                        }
                    }
                }
                debug!("stdin closed");
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not start stdin reader, skip and acknowledge are unavailable");
        }
        input
    }
}

#[async_trait]
impl OperatorInput for LineInput {
    async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
