//! Runtime abstraction layer for async operations
//!
//! The polling timer and the one-shot fetches are spawned through
//! [`AsyncSpawner`], so the screen logic never names the executor directly.
//! Tokio is the default spawner; [`init_runtime`] installs another one.

use crate::prelude::{Future, Pin};
use once_cell::sync::OnceCell;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task. Cancelling a finished task does nothing.
    fn cancel(&self);
}

/// Spawns a future on the global runtime
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::trace!("runtime::spawn");
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;
    use ::tokio::task::JoinHandle;

    /// Tokio-based async spawner
    pub struct TokioSpawner;

    impl AsyncSpawner for TokioSpawner {
        fn spawn_boxed(
            &self,
            future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
        ) -> Box<dyn AsyncHandle> {
            let handle = ::tokio::spawn(future);
            Box::new(TokioHandle(handle))
        }
    }

    struct TokioHandle(JoinHandle<()>);

    impl AsyncHandle for TokioHandle {
        fn is_finished(&self) -> bool {
            self.0.is_finished()
        }

        fn cancel(&self) {
            self.0.abort();
        }
    }
}

/// Global runtime instance
static RUNTIME: OnceCell<Box<dyn AsyncSpawner>> = OnceCell::new();

/// Initialize the runtime with a specific spawner.
///
/// Only the first call wins; later calls are ignored and logged.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    if RUNTIME.set(spawner).is_err() {
        log::warn!("async runtime already initialized; keeping the existing spawner");
    }
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| Box::new(spawners::TokioSpawner))
        .as_ref()
}
