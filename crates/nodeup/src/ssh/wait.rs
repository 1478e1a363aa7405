//! Waiting on work with a deadline and periodic progress.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

/// Stand-in for deadlines too far away to represent.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Progress snapshot passed to tick callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Time since the wait started.
    pub elapsed: Duration,
    /// Time left before the deadline.
    pub remaining: Duration,
}

/// What happened first.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The work finished.
    Completed(T),
    /// The deadline passed. The work future has been dropped.
    TimedOut,
}

/// Wait for `work`, the deadline, or a progress tick, whichever comes first.
///
/// Ticks call `on_tick` and keep waiting; the first tick fires one `period`
/// after the start. Completion wins over a deadline reached at the same
/// instant. A zero period disables ticking. Timeouts past what [`Instant`]
/// can represent are capped at roughly a century.
pub async fn first_of<F, T>(
    work: F,
    timeout: Duration,
    period: Option<Duration>,
    mut on_tick: impl FnMut(Progress),
) -> Outcome<T>
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let deadline = far_instant(start, timeout);

    let mut ticker = period.filter(|p| !p.is_zero()).map(|p| {
        let mut interval = time::interval_at(far_instant(start, p), p);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    tokio::pin!(work);
    let sleep = time::sleep_until(deadline);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            biased;

            value = &mut work => return Outcome::Completed(value),
            () = &mut sleep => return Outcome::TimedOut,
            _ = async {
                match ticker.as_mut() {
                    Some(t) => t.tick().await,
                    None => std::future::pending().await,
                }
            } => {
                let elapsed = start.elapsed();
                on_tick(Progress {
                    elapsed,
                    remaining: timeout.saturating_sub(elapsed),
                });
            }
        }
    }
}

fn far_instant(start: Instant, offset: Duration) -> Instant {
    start
        .checked_add(offset)
        .unwrap_or_else(|| start + FAR_FUTURE)
}
