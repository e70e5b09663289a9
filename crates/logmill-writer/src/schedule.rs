//! Cron driven rotation

use chrono::{DateTime, Duration, Local, Utc};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use cron::Schedule;
use logmill_core::{Error, Result, CRON_FIELDS};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::clock::Clock;

/// A six field cron expression: sec min hour day-of-month month day-of-week.
#[derive(Debug, Clone)]
pub struct RotationSchedule {
    expression: String,
    schedule: Schedule,
    local_time: bool,
}

impl RotationSchedule {
    /// `local_time` selects the timezone the fields are matched in
    pub fn parse(expression: &str, local_time: bool) -> Result<Self> {
        let expression = expression.split_whitespace().collect::<Vec<_>>().join(" ");
        let fields = expression.split(' ').filter(|f| !f.is_empty()).count();
        if fields != CRON_FIELDS {
            return Err(Error::schedule(format!(
                "expected {} fields (sec min hour dom month dow), got {}: '{}'",
                CRON_FIELDS, fields, expression
            )));
        }

        let schedule = Schedule::from_str(&expression)
            .map_err(|e| Error::schedule(format!("'{}': {}", expression, e)))?;

        Ok(Self {
            expression,
            schedule,
            local_time,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First trigger instant at or after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let just_before = now - Duration::nanoseconds(1);
        if self.local_time {
            self.schedule
                .after(&just_before.with_timezone(&Local))
                .next()
                .map(|t| t.with_timezone(&Utc))
        } else {
            self.schedule.after(&just_before).next()
        }
    }

    /// The next `count` trigger instants at or after `now`
    pub fn upcoming(&self, now: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut out = Vec::with_capacity(count);
        let mut from = now;
        while out.len() < count {
            match self.next_after(from) {
                Some(next) => {
                    out.push(next);
                    from = next + Duration::nanoseconds(1);
                }
                None => break,
            }
        }
        out
    }
}

/// What a firing did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fired {
    Rotated,
    Failed,
    /// The writer is gone; the scheduler stops
    Detached,
}

/// Clears the in-progress flag when a firing ends, panics included
struct InProgress(Arc<AtomicBool>);

impl Drop for InProgress {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Timer thread firing a callback at every due instant of a schedule.
///
/// Each firing runs on its own short-lived thread so a rotation stuck behind a
/// long write does not delay the timer. A firing is skipped while the previous
/// one is still running.
#[derive(Debug)]
pub(crate) struct Scheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn spawn<F>(schedule: RotationSchedule, clock: Arc<dyn Clock>, fire: F) -> Result<Self>
    where
        F: Fn() -> Fired + Send + Sync + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let fire = Arc::new(fire);
        let in_progress = Arc::new(AtomicBool::new(false));
        let detached = Arc::new(AtomicBool::new(false));

        info!(cron = %schedule.expression(), "log rotate cron registered");

        let handle = thread::Builder::new()
            .name("logmill-scheduler".into())
            .spawn(move || {
                let mut last_fired: Option<DateTime<Utc>> = None;
                loop {
                    if detached.load(Ordering::Acquire) {
                        break;
                    }

                    let now = clock.now();
                    let from = match last_fired {
                        Some(last) if last >= now => last + Duration::nanoseconds(1),
                        _ => now,
                    };
                    let Some(next) = schedule.next_after(from) else {
                        info!(cron = %schedule.expression(), "schedule has no further triggers");
                        break;
                    };

                    let wait = (next - now).to_std().unwrap_or_default();
                    match stop_rx.recv_timeout(wait) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    if clock.now() < next {
                        continue;
                    }
                    last_fired = Some(next);

                    if in_progress
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        warn!(due = %next, "previous scheduled rotation still running, skipping");
                        continue;
                    }

                    let fire = Arc::clone(&fire);
                    let running = InProgress(Arc::clone(&in_progress));
                    let detached = Arc::clone(&detached);
                    let spawned = thread::Builder::new()
                        .name("logmill-rotate".into())
                        .spawn(move || {
                            let _running = running;
                            debug!(due = %next, "scheduled rotation");
                            if fire() == Fired::Detached {
                                detached.store(true, Ordering::Release);
                            }
                        });
                    if let Err(e) = spawned {
                        warn!(error = %e, "can't start scheduled rotation");
                    }
                }
                debug!("rotation scheduler stopped");
            })
            .map_err(Error::IoError)?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the timer and wait for it to exit. An in-flight firing thread is
    /// not waited for.
    pub fn shutdown(mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("rotation scheduler panicked");
            }
        }
    }
}
