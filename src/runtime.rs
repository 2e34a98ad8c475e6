//! Runtime abstraction layer for async operations
//!
//! Background work (the viewport pipeline loop, place fetches, detail and
//! favorite requests) is spawned through [`spawn`], which hands back an
//! [`AsyncHandle`] that can abort the task. The default spawner uses the
//! ambient tokio runtime; a UI thread living outside the runtime installs a
//! [`TokioSpawner`] bound to an explicit handle with [`init_runtime`].

use crate::prelude::{Future, Pin};

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

    /// Cancel the task
    fn cancel(&self);
}

/// Spawns a future on the installed runtime
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;
    use ::tokio::runtime::Handle;
    use ::tokio::task::JoinHandle;

    /// Tokio-based async spawner
    #[derive(Debug, Clone, Default)]
    pub struct TokioSpawner {
        handle: Option<Handle>,
    }

    impl TokioSpawner {
        /// Spawns onto whichever runtime is current at the call site
        pub fn ambient() -> Self {
            Self { handle: None }
        }

        /// Spawns onto `handle` from any thread
        pub fn with_handle(handle: Handle) -> Self {
            Self {
                handle: Some(handle),
            }
        }
    }

    impl AsyncSpawner for TokioSpawner {
        fn spawn_boxed(
            &self,
            future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
        ) -> Box<dyn AsyncHandle> {
            let handle = match &self.handle {
                Some(runtime) => runtime.spawn(future),
                None => ::tokio::spawn(future),
            };
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

pub use spawners::TokioSpawner;

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner.
///
/// Only the first call takes effect.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    if RUNTIME.set(spawner).is_err() {
        log::warn!("runtime spawner already initialised; ignoring replacement");
    }
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| Box::new(TokioSpawner::ambient()))
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[::tokio::test(start_paused = true)]
    async fn test_tokio_spawner() {
        let handle = spawn(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(10)).await;
        });
        assert!(!handle.is_finished());

        ::tokio::time::sleep(::tokio::time::Duration::from_millis(20)).await;
        ::tokio::task::yield_now().await;
        assert!(handle.is_finished());
    }

    #[::tokio::test]
    async fn test_cancel_aborts_task() {
        let (tx, rx) = ::tokio::sync::oneshot::channel::<()>();
        let handle = spawn(async move {
            ::tokio::time::sleep(::tokio::time::Duration::from_secs(3600)).await;
            let _ = tx.send(());
        });
        handle.cancel();

        assert!(rx.await.is_err());
    }
}
