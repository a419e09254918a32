//! Supervised periodic tasks: each loop is named, runs on its own period
//! plus a little jitter so the seven timers don't all wake in lockstep,
//! and a panic inside one tick is caught and logged rather than taking the
//! process down.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use rand::Rng;

/// Spawns a task that calls `tick` forever on `period_ms`, jittered by up
/// to 10% on every iteration. `tick` returning `Err` is logged and treated
/// the same as a panic: the loop itself never stops, since a failure on one
/// item should never halt the whole pass.
pub fn spawn_periodic<F, Fut>(name: &'static str, period_ms: u64, mut tick: F) -> tokio::task::JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<usize>> + Send,
{
    tokio::spawn(async move {
        loop {
            let jitter_ms = rand::thread_rng().gen_range(0..=period_ms / 10 + 1);
            tokio::time::sleep(Duration::from_millis(period_ms + jitter_ms)).await;

            let timeout = Duration::from_millis(period_ms * 2);
            let result = tokio::time::timeout(timeout, AssertUnwindSafe(tick()).catch_unwind()).await;
            match result {
                Ok(Ok(Ok(count))) => {
                    if count > 0 {
                        log::info!("{name}: processed {count}");
                    }
                }
                Ok(Ok(Err(err))) => log::warn!("{name}: tick failed: {err}"),
                Ok(Err(panic)) => log::error!("{name}: tick panicked: {}", panic_message(&panic)),
                Err(_) => log::warn!("{name}: tick exceeded {timeout:?} timeout"),
            }
        }
    })
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
