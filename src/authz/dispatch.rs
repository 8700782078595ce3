//! [`DecisionPort`] implementations: inline and worker-thread dispatch.
//!
//! ```text
//! ┌──────────────┐   Job    ┌──────────────────┐
//! │ Control loop │────────▶│  Decision worker  │──▶ AuthorizationTransport
//! │   (sync)     │◀────────│  (block_on)       │
//! └──────────────┘ (id, outcome) └──────────────┘
//! ```
//!
//! [`InlineDecisions`] resolves inside `submit`, stalling the loop for at
//! most the transport's budget. [`WorkerDecisions`] moves the transport to
//! a dedicated thread; the loop keeps sampling the sensor and only polls a
//! channel. Either way the state machine is the single writer of the gate
//! phase.

use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use super::{AuthorizationOutcome, AuthorizationRequest, AuthorizationTransport};
use crate::app::ports::DecisionPort;
use crate::drivers::task_pin::{self, Core};
use crate::error::TransportError;

// ───────────────────────────────────────────────────────────────
// Inline
// ───────────────────────────────────────────────────────────────

/// Synchronous dispatch: the transport call runs inside [`submit`](DecisionPort::submit).
pub struct InlineDecisions<T> {
    transport: T,
    ready: Option<AuthorizationOutcome>,
}

impl<T: AuthorizationTransport> InlineDecisions<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            ready: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: AuthorizationTransport> DecisionPort for InlineDecisions<T> {
    fn submit(&mut self, request: AuthorizationRequest, budget_ms: u32) -> bool {
        self.ready = Some(self.transport.request_decision(&request, budget_ms));
        true
    }

    fn poll(&mut self) -> Option<AuthorizationOutcome> {
        self.ready.take()
    }

    fn abandon(&mut self) {
        self.ready = None;
    }
}

// ───────────────────────────────────────────────────────────────
// Worker
// ───────────────────────────────────────────────────────────────

enum Job {
    Resolve {
        request: AuthorizationRequest,
        budget_ms: u32,
    },
    Shutdown,
}

/// One queued job keeps at most one request behind the one being resolved.
const JOB_DEPTH: usize = 1;
const RESULT_DEPTH: usize = 2;

type JobChannel = Channel<CriticalSectionRawMutex, Job, JOB_DEPTH>;
type ResultChannel = Channel<CriticalSectionRawMutex, (u32, AuthorizationOutcome), RESULT_DEPTH>;

/// Worker thread parameters.
const WORKER_NAME: &str = "authz\0";
const WORKER_PRIORITY: u8 = 5;
const WORKER_STACK_KB: usize = 8;

/// Threaded dispatch: the transport lives on its own task.
pub struct WorkerDecisions {
    jobs: Arc<JobChannel>,
    results: Arc<ResultChannel>,
    in_flight: Option<u32>,
    _worker: JoinHandle<()>,
}

impl WorkerDecisions {
    /// Move `transport` onto a new worker thread (protocol core on ESP32).
    pub fn spawn<T>(transport: T) -> Result<Self, TransportError>
    where
        T: AuthorizationTransport + Send + 'static,
    {
        let jobs: Arc<JobChannel> = Arc::new(Channel::new());
        let results: Arc<ResultChannel> = Arc::new(Channel::new());

        let worker = {
            let jobs = Arc::clone(&jobs);
            let results = Arc::clone(&results);
            task_pin::spawn_on_core(
                Core::Pro,
                WORKER_PRIORITY,
                WORKER_STACK_KB,
                WORKER_NAME,
                move || run_worker(transport, &jobs, &results),
            )
            .map_err(|e| {
                warn!("AUTHZ: worker spawn failed: {}", e);
                TransportError::WorkerSpawnFailed
            })?
        };

        Ok(Self {
            jobs,
            results,
            in_flight: None,
            _worker: worker,
        })
    }

    /// Id of the request currently awaited, if any.
    pub fn in_flight(&self) -> Option<u32> {
        self.in_flight
    }

    fn discard_stale(&mut self) {
        while let Ok((id, outcome)) = self.results.try_receive() {
            debug!("AUTHZ: discarding late {} for #{}", outcome.label(), id);
        }
    }
}

fn run_worker<T: AuthorizationTransport>(
    mut transport: T,
    jobs: &JobChannel,
    results: &ResultChannel,
) {
    info!("AUTHZ: decision worker running");
    futures_lite::future::block_on(async {
        loop {
            match jobs.receive().await {
                Job::Resolve { request, budget_ms } => {
                    let outcome = transport.request_decision(&request, budget_ms);
                    results.send((request.id, outcome)).await;
                }
                Job::Shutdown => break,
            }
        }
    });
    info!("AUTHZ: decision worker stopped");
}

impl DecisionPort for WorkerDecisions {
    fn submit(&mut self, request: AuthorizationRequest, budget_ms: u32) -> bool {
        if let Some(id) = self.in_flight {
            warn!("AUTHZ: #{} refused, #{} still in flight", request.id, id);
            return false;
        }
        self.discard_stale();
        if self
            .jobs
            .try_send(Job::Resolve { request, budget_ms })
            .is_err()
        {
            warn!("AUTHZ: #{} refused, worker busy", request.id);
            return false;
        }
        self.in_flight = Some(request.id);
        true
    }

    fn poll(&mut self) -> Option<AuthorizationOutcome> {
        let awaited = self.in_flight?;
        while let Ok((id, outcome)) = self.results.try_receive() {
            if id == awaited {
                self.in_flight = None;
                return Some(outcome);
            }
            debug!("AUTHZ: discarding late {} for #{}", outcome.label(), id);
        }
        None
    }

    fn abandon(&mut self) {
        if let Some(id) = self.in_flight.take() {
            debug!("AUTHZ: abandoned #{}", id);
        }
    }
}

impl Drop for WorkerDecisions {
    fn drop(&mut self) {
        self.discard_stale();
        if self.jobs.try_send(Job::Shutdown).is_err() {
            debug!("AUTHZ: worker busy at shutdown, detaching");
        }
    }
}
