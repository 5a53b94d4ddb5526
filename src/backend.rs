use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::config::BackendConfig;

/// Errors reported by the numeric backend. The shipped backend is native code
/// and effectively infallible, but the seam stays fallible: the backend is an
/// external collaborator and the controller treats it as untrusted.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend self-test failed: {0}")]
    SelfTest(String),
    #[error("arithmetic fault: {0}")]
    Fault(String),
}

/// The four binary operations every numeric backend must provide.
pub trait ArithmeticBackend: Send + Sync {
    fn add(&self, a: f64, b: f64) -> Result<f64, BackendError>;
    fn sub(&self, a: f64, b: f64) -> Result<f64, BackendError>;
    fn mul(&self, a: f64, b: f64) -> Result<f64, BackendError>;
    fn div(&self, a: f64, b: f64) -> Result<f64, BackendError>;
}

/// Backend implemented directly on hardware floats.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl ArithmeticBackend for NativeBackend {
    fn add(&self, a: f64, b: f64) -> Result<f64, BackendError> {
        Ok(a + b)
    }

    fn sub(&self, a: f64, b: f64) -> Result<f64, BackendError> {
        Ok(a - b)
    }

    fn mul(&self, a: f64, b: f64) -> Result<f64, BackendError> {
        Ok(a * b)
    }

    // Division by zero is screened out by the controller before dispatch.
    fn div(&self, a: f64, b: f64) -> Result<f64, BackendError> {
        Ok(a / b)
    }
}

/// Lifecycle of the backend as observed by the controller.
///
/// `Uninitialized -> Ready` or `Uninitialized -> Failed`, decided exactly once
/// by the loader task. There is no retry and no request queueing: a calculation
/// attempted while `Loading` short-circuits to the pending sentinel and the
/// user presses the key again after readiness.
#[derive(Clone)]
pub enum BackendState {
    Loading,
    Ready(Arc<dyn ArithmeticBackend>),
    Failed(String),
}

impl std::fmt::Debug for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendState::Loading => write!(f, "Loading"),
            BackendState::Ready(_) => write!(f, "Ready"),
            BackendState::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

/// Cheap, cloneable view onto the backend lifecycle. The loader publishes the
/// final state through a watch channel; `state()` never blocks.
#[derive(Clone)]
pub struct BackendHandle {
    rx: watch::Receiver<BackendState>,
}

impl BackendHandle {
    pub fn state(&self) -> BackendState {
        self.rx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.rx.borrow(), BackendState::Ready(_))
    }

    /// Handle already in the `Ready` state, bypassing the loader.
    pub fn ready(backend: impl ArithmeticBackend + 'static) -> Self {
        Self::fixed(BackendState::Ready(Arc::new(backend)))
    }

    /// Handle permanently stuck in `Loading` (loader that never resolves).
    pub fn loading() -> Self {
        Self::fixed(BackendState::Loading)
    }

    /// Handle in the terminal `Failed` state.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::fixed(BackendState::Failed(reason.into()))
    }

    // A watch receiver keeps yielding the last sent value after the sender is
    // dropped, so a fixed-state handle needs no task behind it.
    fn fixed(state: BackendState) -> Self {
        let (tx, rx) = watch::channel(state);
        drop(tx);
        Self { rx }
    }
}

/// Spawns the one-shot backend initialization onto the runtime and returns a
/// handle that observes it. The configured delay exists to exercise the
/// pending path; the self-test is what makes initialization genuinely fallible.
pub fn spawn_loader(handle: &tokio::runtime::Handle, cfg: &BackendConfig) -> BackendHandle {
    let (tx, rx) = watch::channel(BackendState::Loading);
    let delay = Duration::from_millis(cfg.init_delay_ms);

    handle.spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let state = match initialize() {
            Ok(backend) => {
                tracing::info!(target: "backend", "numeric backend ready");
                BackendState::Ready(Arc::new(backend))
            }
            Err(e) => {
                tracing::error!(target: "backend", "initialization failed: {e}");
                BackendState::Failed(e.to_string())
            }
        };
        // The receiver may already be gone if the app quit during startup.
        let _ = tx.send(state);
    });

    BackendHandle { rx }
}

fn initialize() -> Result<NativeBackend, BackendError> {
    let backend = NativeBackend;
    self_test(&backend)?;
    Ok(backend)
}

fn self_test(backend: &dyn ArithmeticBackend) -> Result<(), BackendError> {
    let checks = [
        ("add", backend.add(2.0, 3.0)?, 5.0),
        ("sub", backend.sub(9.0, 4.0)?, 5.0),
        ("mul", backend.mul(2.5, 4.0)?, 10.0),
        ("div", backend.div(9.0, 3.0)?, 3.0),
    ];
    for (name, got, want) in checks {
        if (got - want).abs() > f64::EPSILON {
            return Err(BackendError::SelfTest(format!(
                "{name}: got {got}, want {want}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenBackend;

    impl ArithmeticBackend for BrokenBackend {
        fn add(&self, _a: f64, _b: f64) -> Result<f64, BackendError> {
            Ok(0.0)
        }
        fn sub(&self, _a: f64, _b: f64) -> Result<f64, BackendError> {
            Err(BackendError::Fault("sub unit offline".into()))
        }
        fn mul(&self, _a: f64, _b: f64) -> Result<f64, BackendError> {
            Ok(0.0)
        }
        fn div(&self, _a: f64, _b: f64) -> Result<f64, BackendError> {
            Ok(0.0)
        }
    }

    #[test]
    fn native_backend_passes_self_test() {
        assert!(self_test(&NativeBackend).is_ok());
    }

    #[test]
    fn broken_backend_fails_self_test() {
        let err = self_test(&BrokenBackend).unwrap_err();
        assert!(err.to_string().contains("add"));
    }

    #[test]
    fn fixed_handles_report_their_state() {
        assert!(BackendHandle::ready(NativeBackend).is_ready());
        assert!(!BackendHandle::loading().is_ready());
        assert!(matches!(
            BackendHandle::failed("no module").state(),
            BackendState::Failed(reason) if reason == "no module"
        ));
    }

    #[tokio::test]
    async fn loader_reaches_ready() {
        let cfg = BackendConfig { init_delay_ms: 0 };
        let handle = spawn_loader(&tokio::runtime::Handle::current(), &cfg);
        let mut rx = handle.rx.clone();
        rx.changed().await.expect("loader publishes a state");
        assert!(handle.is_ready());
    }
}
