//! Retention passes and the background worker that runs them

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::policy::{RetentionPolicy, RetentionReport};
use crate::scan::Scanner;

/// Reports buffered per subscriber; newer ones are dropped while it is full
const SUBSCRIBER_QUEUE: usize = 64;

/// Scan, plan and apply for one backup family. Passes are serialized.
#[derive(Debug)]
pub(crate) struct Retention {
    scanner: Scanner,
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
    pass_lock: Mutex<()>,
    subscribers: Mutex<Vec<Sender<RetentionReport>>>,
}

impl Retention {
    pub fn new(scanner: Scanner, policy: RetentionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            scanner,
            policy,
            clock,
            pass_lock: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Receive a report after every pass. Reports published while
    /// `SUBSCRIBER_QUEUE` of them are unread are dropped for that subscriber.
    pub fn subscribe(&self) -> Receiver<RetentionReport> {
        let (tx, rx) = bounded(SUBSCRIBER_QUEUE);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn run_pass(&self) -> RetentionReport {
        let report = {
            let _pass = self.pass_lock.lock();
            self.run_locked()
        };

        if let Some(error) = report.first_error() {
            warn!(error = %error, "retention pass failed");
        }
        self.publish(&report);
        report
    }

    fn run_locked(&self) -> RetentionReport {
        if self.policy.is_noop() {
            return RetentionReport::default();
        }

        let backups = match self.scanner.scan() {
            Ok(backups) => backups,
            Err(e) => return RetentionReport::failed(e),
        };

        let plan = self.policy.plan(backups, self.clock.now());
        if plan.is_empty() {
            return RetentionReport {
                retained: plan.keep.len(),
                ..Default::default()
            };
        }

        debug!(
            remove = plan.remove.len(),
            compress = plan.compress.len(),
            keep = plan.keep.len(),
            "applying retention plan"
        );
        plan.apply()
    }

    fn publish(&self, report: &RetentionReport) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(report.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("retention subscriber is behind, dropping report");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

/// Background thread running retention passes on request.
///
/// Requests go through a one-slot channel: while a request is pending further
/// ones are dropped, since the pending pass will see the latest directory state.
#[derive(Debug)]
pub(crate) struct RetentionWorker {
    tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RetentionWorker {
    pub fn spawn(retention: Arc<Retention>) -> io::Result<Self> {
        let (tx, rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("logmill-retention".into())
            .spawn(move || {
                for () in rx.iter() {
                    retention.run_pass();
                }
                debug!("retention worker stopped");
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Never blocks
    pub fn request(&self) {
        if let Some(tx) = &self.tx {
            match tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Disconnected(())) => {
                    warn!("retention worker is gone, request dropped");
                }
            }
        }
    }

    /// Let a pending pass finish, then stop the thread
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("retention worker panicked");
            }
        }
    }
}
