//! Per-worker renderer registry
//!
//! The pool owns one slot per worker index. A slot's renderer is launched the
//! first time its worker asks for it and is reused for every later post of
//! that worker. Slots are only ever locked by their own worker, and by
//! [`RendererPool::release_all`] once every worker has finished.

use crate::render::{Identity, RenderError, RenderResult, Renderer, RendererFactory};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};

/// Exclusive access to a worker's live renderer
///
/// The lease owns its lock, so a worker task can hold it across awaits.
pub struct RendererLease(OwnedMappedMutexGuard<Slot, Box<dyn Renderer>>);

impl Deref for RendererLease {
    type Target = Box<dyn Renderer>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RendererLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

enum Slot {
    /// Worker has not asked for a renderer yet
    Vacant,
    Ready(Box<dyn Renderer>),
    /// Launch failed; the worker does not get another attempt
    Failed,
    Released,
}

/// Outcome of shutting the pool down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Renderers closed cleanly
    pub closed: usize,
    /// Renderers whose close reported an error
    pub close_errors: usize,
    /// Slots with nothing to close (never used, failed, or already released)
    pub skipped: usize,
}

/// Registry of lazily launched renderers keyed by worker index
pub struct RendererPool {
    factory: Arc<dyn RendererFactory>,
    user_agents: Vec<String>,
    slots: Vec<Arc<Mutex<Slot>>>,
    launched: AtomicUsize,
}

impl RendererPool {
    /// Creates a pool with `workers` empty slots
    pub fn new(factory: Arc<dyn RendererFactory>, user_agents: Vec<String>, workers: usize) -> Self {
        Self {
            factory,
            user_agents,
            slots: (0..workers)
                .map(|_| Arc::new(Mutex::new(Slot::Vacant)))
                .collect(),
            launched: AtomicUsize::new(0),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of renderers launched so far
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// Returns the renderer of `worker`, launching it on first use
    ///
    /// A failed launch marks the slot failed; later calls for the same worker
    /// fail without relaunching.
    pub async fn acquire(&self, worker: usize) -> RenderResult<RendererLease> {
        let slot = self.slots.get(worker).ok_or_else(|| {
            RenderError::Launch(format!(
                "worker {} outside pool of {}",
                worker,
                self.slots.len()
            ))
        })?;

        let mut guard = Arc::clone(slot).lock_owned().await;

        match *guard {
            Slot::Ready(_) => {}
            Slot::Vacant => {
                let identity = Identity::random(&self.user_agents, format!("worker-{}", worker));
                match self.factory.launch(identity).await {
                    Ok(renderer) => {
                        self.launched.fetch_add(1, Ordering::SeqCst);
                        *guard = Slot::Ready(renderer);
                    }
                    Err(e) => {
                        *guard = Slot::Failed;
                        return Err(e);
                    }
                }
            }
            Slot::Failed => {
                return Err(RenderError::Launch(format!(
                    "renderer for worker {} failed to launch earlier",
                    worker
                )));
            }
            Slot::Released => {
                return Err(RenderError::Launch(format!(
                    "renderer pool already released (worker {})",
                    worker
                )));
            }
        }

        OwnedMutexGuard::try_map(guard, |slot| match slot {
            Slot::Ready(renderer) => Some(renderer),
            _ => None,
        })
        .map(RendererLease)
        .map_err(|_| RenderError::Launch(format!("worker {} has no renderer", worker)))
    }

    /// Closes every live renderer
    ///
    /// Every slot is visited, including those of workers that never ran.
    /// Calling this again is harmless: released slots are skipped.
    pub async fn release_all(&self) -> ReleaseReport {
        let mut report = ReleaseReport::default();

        for (worker, slot) in self.slots.iter().enumerate() {
            let mut guard = slot.lock().await;
            match std::mem::replace(&mut *guard, Slot::Released) {
                Slot::Ready(mut renderer) => match renderer.close().await {
                    Ok(()) => {
                        tracing::debug!("Released renderer of worker {}", worker);
                        report.closed += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to release renderer of worker {}: {}", worker, e);
                        report.close_errors += 1;
                    }
                },
                Slot::Vacant => {
                    tracing::debug!("Worker {} never launched a renderer, skipping", worker);
                    report.skipped += 1;
                }
                Slot::Failed | Slot::Released => report.skipped += 1,
            }
        }

        report
    }
}
