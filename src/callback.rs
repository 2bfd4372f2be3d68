//! Adapters between the single-shot `(result, error)` callback convention
//! and the `async fn`-based `Sender` contract the rest of the crate is
//! built on, plus the fan-in aggregator `firstValidResult` uses to collect
//! per-child outcomes.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::DispatchError;
use crate::sender::Sender;

/// A single-shot sink: must be invoked exactly once, with either a
/// success or a `DispatchError`.
pub type Callback<Res> = Box<dyn FnOnce(Result<Res, DispatchError>)>;

/// Wraps an `async`-style `Sender` with the classic callback convention,
/// for hosts that have not migrated off it.
///
/// Requires a `tokio::task::LocalSet` to be active, since the crate's
/// senders are `!Send` by design.
pub struct CallbackSender<Req, Res> {
    inner: Rc<dyn Sender<Req, Res>>,
}

impl<Req, Res> CallbackSender<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    pub fn new(inner: Rc<dyn Sender<Req, Res>>) -> Self {
        CallbackSender { inner }
    }

    /// Submits `request`, guaranteeing `callback` fires exactly once.
    pub fn send_request(&self, request: Req, timeout: Duration, callback: Callback<Res>) {
        let inner = self.inner.clone();
        tokio::task::spawn_local(async move {
            let result = inner.send_request(request, timeout).await;
            callback(result);
        });
    }
}

/// Per-request state for `firstValidResult`'s fan-in: tracks how many
/// compiled children have yet to respond and whether a terminal
/// transition has already fired.
///
/// Conceptually a two-state machine, `Pending(remaining, done=false)`
/// until either a valid result arrives (`Done(result)`) or the last
/// outstanding child responds without one (`Done(no_valid_result_error or
/// null)`). Transitions out of `Done` are forbidden —
/// `record_valid`/`record_invalid` are no-ops once `done` is set, so
/// arrivals after termination are absorbed silently.
pub(crate) struct Aggregator {
    remaining: Cell<usize>,
    done: Cell<bool>,
}

impl Aggregator {
    pub fn new(child_count: usize) -> Self {
        Aggregator {
            remaining: Cell::new(child_count),
            done: Cell::new(false),
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.get()
    }

    /// Records that a child produced a result the validator accepted.
    /// Returns `true` iff this call performs the terminal transition
    /// (i.e. this is the result that should be delivered); `false` means
    /// the aggregator was already done and the result must be discarded.
    pub fn record_valid(&self) -> bool {
        if self.done.get() {
            return false;
        }
        self.done.set(true);
        true
    }

    /// Records that a child finished without a valid result (an error or
    /// a value the validator rejected). Returns `true` iff this was the
    /// last outstanding child and the caller should now deliver the
    /// exhausted-without-a-valid-result outcome.
    pub fn record_invalid(&self) -> bool {
        if self.done.get() {
            return false;
        }
        let remaining = self.remaining.get() - 1;
        self.remaining.set(remaining);
        if remaining == 0 {
            self.done.set(true);
            true
        } else {
            false
        }
    }
}
