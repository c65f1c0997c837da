//! Bounded, best-effort background work.
//!
//! Request handlers push [`Notification`]s onto a [`NotificationQueue`]
//! without waiting; a single [`NotificationWorker`] drains them in order.
//! Nothing is persisted, so pending work is lost on restart.

use std::time::Duration;

use futures::future::BoxFuture;
use log::{info, warn};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Default number of pending notifications before enqueue starts failing.
pub const DEFAULT_CAPACITY: usize = 100;

/// Work handed to the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    WelcomeEmail { email: String, name: String },
    TodoCompleted { todo_id: i64, title: String },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::WelcomeEmail { .. } => "welcome_email",
            Notification::TodoCompleted { .. } => "todo_completed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("notification queue is full")]
    Full,
    #[error("notification queue is closed")]
    Closed,
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<Notification>,
}

impl NotificationQueue {
    /// Creates a queue holding at most `capacity` pending notifications.
    pub fn bounded(capacity: usize) -> (NotificationQueue, NotificationWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (NotificationQueue { sender }, NotificationWorker { receiver })
    }

    /// Enqueues without blocking. When the queue is full the new notification
    /// is dropped.
    pub fn enqueue(&self, notification: Notification) -> Result<(), EnqueueError> {
        match self.sender.try_send(notification) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                warn!("Notification queue full, dropping {} task", dropped.kind());
                Err(EnqueueError::Full)
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!("Notification queue closed, dropping {} task", dropped.kind());
                Err(EnqueueError::Closed)
            }
        }
    }
}

/// Performs the side effect behind a notification.
pub trait NotificationHandler: Send + Sync + 'static {
    fn handle(&self, notification: Notification) -> BoxFuture<'_, Result<(), String>>;
}

/// Simulates delivery by sleeping and logging.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    pub latency: Duration,
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(100),
        }
    }
}

impl NotificationHandler for LogNotifier {
    fn handle(&self, notification: Notification) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            match notification {
                Notification::WelcomeEmail { email, name } => {
                    info!("Sent welcome email to {} ({})", name, email);
                }
                Notification::TodoCompleted { todo_id, title } => {
                    info!("Todo {} completed: {}", todo_id, title);
                }
            }
            Ok(())
        })
    }
}

/// Consumer side of the queue.
#[derive(Debug)]
pub struct NotificationWorker {
    receiver: mpsc::Receiver<Notification>,
}

impl NotificationWorker {
    /// Processes notifications one at a time until every queue handle is dropped.
    pub async fn run<H: NotificationHandler>(mut self, handler: H) {
        info!("Notification worker started");
        while let Some(notification) = self.receiver.recv().await {
            let kind = notification.kind();
            if let Err(e) = handler.handle(notification).await {
                warn!("Failed to process {} task: {}", kind, e);
            }
        }
        info!("Notification worker stopped");
    }

    pub fn spawn<H: NotificationHandler>(self, handler: H) -> JoinHandle<()> {
        tokio::spawn(self.run(handler))
    }
}

/// Extension point invoked by the reminder ticker.
pub trait DueSoonScan: Send + Sync + 'static {
    fn scan(&self) -> BoxFuture<'_, ()>;
}

/// Default scan: records that a pass happened.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDueSoonScan;

impl DueSoonScan for LogDueSoonScan {
    fn scan(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {
            info!("Checking for todos due soon");
        })
    }
}

/// Runs `scan` every `period`, starting one period after the call.
pub fn spawn_reminder_ticker<S: DueSoonScan>(period: Duration, scan: S) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            scan.scan().await;
        }
    })
}
