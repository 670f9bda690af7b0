use crate::errors::AppResult;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{Duration, MissedTickBehavior};

pub type TaskFuture = Pin<Box<dyn Future<Output = AppResult<()>> + Send>>;
pub type RefreshTask = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Owns one recurring task. Implementations decide how time passes.
pub trait RefreshScheduler {
    fn schedule(&self, name: &str, period: Duration, task: RefreshTask) -> ScheduleHandle;
}

#[derive(Clone)]
pub struct ScheduleHandle {
    trigger: Arc<Notify>,
    cancel: Arc<Notify>,
    canceled: Arc<AtomicBool>,
}

impl ScheduleHandle {
    fn new() -> Self {
        Self {
            trigger: Arc::new(Notify::new()),
            cancel: Arc::new(Notify::new()),
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the task now. Triggers that arrive while the task is running coalesce.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.cancel.notify_one();
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Runs the task immediately and then every `period` on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl RefreshScheduler for TokioScheduler {
    fn schedule(&self, name: &str, period: Duration, task: RefreshTask) -> ScheduleHandle {
        let handle = ScheduleHandle::new();
        let loop_handle = handle.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            run_loop(name, period, task, loop_handle).await;
        });
        handle
    }
}

async fn run_loop(name: String, period: Duration, task: RefreshTask, handle: ScheduleHandle) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = handle.cancel.notified() => break,
            _ = interval.tick() => {}
            _ = handle.trigger.notified() => {
                tracing::debug!(task = %name, "manual trigger");
            }
        }
        if handle.is_canceled() {
            break;
        }

        if let Err(error) = task().await {
            tracing::warn!(task = %name, error = %error, "scheduled task failed");
        }
    }

    tracing::info!(task = %name, "scheduled task stopped");
}
