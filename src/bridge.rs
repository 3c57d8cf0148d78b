//! Blocking facade over the tokio runtime
//!
//! FUSE callbacks run on plain threads and must block until a network call
//! finishes. `Bridge::submit` hands the call to a dispatcher task, which spawns
//! it as an independent task on the shared runtime, then waits for its
//! completion signal under a deadline.
//!
//! ```text
//! caller thread                    runtime
//! ┌──────────────┐   job    ┌────────────┐  spawn  ┌──────────┐
//! │ submit()     │─────────►│ dispatcher │────────►│ job task │
//! │ block_on(    │          └────────────┘         └────┬─────┘
//! │  timeout(rx))│◄──────────── oneshot result ─────────┘
//! └──────────────┘
//! ```

use crate::config::BridgeConfig;
use crate::error::{FsError, FsResult, RemoteError};
use log::{debug, error, warn};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub struct Bridge {
    handle: Handle,
    jobs: mpsc::Sender<Job>,
    request_timeout: Duration,
}

impl Bridge {
    /// Start the dispatcher on `handle`. The runtime must have its time driver enabled.
    pub fn new(handle: Handle, config: &BridgeConfig) -> Self {
        let (jobs, mut queue) = mpsc::channel::<Job>(config.queue_capacity.max(1));
        handle.spawn(async move {
            while let Some(job) = queue.recv().await {
                tokio::spawn(job);
            }
            debug!("Bridge dispatcher stopped");
        });

        Self {
            handle,
            jobs,
            request_timeout: config.request_timeout,
        }
    }

    /// Run `operation` on the runtime and block until it completes or the deadline passes.
    ///
    /// On `Timeout` the operation keeps running; its remote effect may still land.
    /// Calling from inside a current-thread runtime fails with `NotSupported`,
    /// since that runtime's only thread cannot be handed over to block.
    pub fn submit<T, F>(&self, label: &'static str, operation: F) -> FsResult<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        if let Ok(current) = Handle::try_current() {
            if current.runtime_flavor() == RuntimeFlavor::CurrentThread {
                error!("{} submitted from a current-thread runtime; refusing to block", label);
                return Err(FsError::NotSupported);
            }
        }

        let (done, completion) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // receiver is gone when the caller already timed out
            let _ = done.send(operation.await);
        });

        let jobs = self.jobs.clone();
        let deadline = self.request_timeout;
        let started = Instant::now();
        let outcome = self.block_on(async move {
            tokio::time::timeout(deadline, async move {
                jobs.send(job)
                    .await
                    .map_err(|_| FsError::RemoteUnavailable("bridge dispatcher stopped".into()))?;
                completion
                    .await
                    .map_err(|_| FsError::RemoteUnavailable("remote task aborted".into()))
            })
            .await
        });

        match outcome {
            Ok(Ok(Ok(value))) => {
                debug!("{} completed in {:?}", label, started.elapsed());
                Ok(value)
            }
            Ok(Ok(Err(remote))) => {
                debug!("{} failed: {}", label, remote);
                Err(remote.into())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                warn!("{} timed out after {:?}", label, deadline);
                Err(FsError::Timeout)
            }
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        // inside a multi-thread worker block_on would panic; hand the thread over first
        if Handle::try_current().is_ok() {
            tokio::task::block_in_place(|| self.handle.block_on(future))
        } else {
            self.handle.block_on(future)
        }
    }
}
