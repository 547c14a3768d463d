//! Installation progress conduit.
//!
//! A single-writer, single-reader channel carrying [`InstallProgress`] events
//! from an installation task to whoever renders them. Sending never blocks
//! the installer; events arrive in emission order.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::core::variant::InstallProgress;

/// Create a connected sender/receiver pair.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSender {
            tx,
            last: Mutex::new(InstallProgress {
                percentage: 0,
                message: String::new(),
            }),
        },
        ProgressReceiver { rx },
    )
}

/// Producer half, owned by the installation task.
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<InstallProgress>,
    /// Last emitted event, so status-only and percent-only updates carry
    /// the other half forward.
    last: Mutex<InstallProgress>,
}

impl ProgressSender {
    /// Sender whose receiver is already gone. Events are discarded.
    pub fn detached() -> Self {
        progress_channel().0
    }

    /// Emit a full event. Percentages above 100 are clamped.
    pub fn emit(&self, percentage: u8, message: impl Into<String>) {
        let event = InstallProgress {
            percentage: percentage.min(100),
            message: message.into(),
        };
        if let Ok(mut last) = self.last.lock() {
            *last = event.clone();
        }
        // A dropped receiver only means nobody is watching.
        let _ = self.tx.send(event);
    }

    /// New message, same percentage as the previous event.
    pub fn status(&self, message: impl Into<String>) {
        let percentage = self.last().percentage;
        self.emit(percentage, message);
    }

    /// New percentage, same message as the previous event.
    pub fn percent(&self, percentage: u8) {
        let message = self.last().message;
        self.emit(percentage, message);
    }

    pub fn last(&self) -> InstallProgress {
        self.last
            .lock()
            .map(|last| last.clone())
            .unwrap_or(InstallProgress {
                percentage: 0,
                message: String::new(),
            })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the UI/CLI.
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<InstallProgress>,
}

impl ProgressReceiver {
    /// Next event, or `None` once the sender is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<InstallProgress> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<InstallProgress> {
        self.rx.try_recv().ok()
    }

    /// Everything queued right now, oldest first.
    pub fn drain(&mut self) -> Vec<InstallProgress> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
