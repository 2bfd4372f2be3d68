use std::time::Duration;

use async_trait::async_trait;

use crate::error::DispatchError;

/// A callable that accepts a request and guarantees the caller's
/// continuation is resolved exactly once: either with a response or with a
/// `DispatchError`.
///
/// Implementations are expected to be cheap to hold behind an `Rc` and are
/// not required to be `Send` — the crate's entire concurrency model is a
/// single cooperative dispatcher thread, so `#[async_trait(?Send)]` is used
/// throughout rather than the `Send`-bound default.
#[async_trait(?Send)]
pub trait Sender<Req, Res> {
    /// Submits `request`, failing with `DispatchError::RequestTimeout` if
    /// no outcome is available within `timeout` (a `Duration::ZERO` means
    /// no timeout).
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError>;
}

/// A `Sender` built directly from an async closure, for tests and small
/// host integrations that don't want to define a named type.
pub struct FnSender<F>(pub F);

#[async_trait(?Send)]
impl<Req, Res, F, Fut> Sender<Req, Res> for FnSender<F>
where
    Req: 'static,
    F: Fn(Req, Duration) -> Fut,
    Fut: std::future::Future<Output = Result<Res, DispatchError>> + 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        (self.0)(request, timeout).await
    }
}
