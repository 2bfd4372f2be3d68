//! `firstValidResult`: fans a request out to every compiled child
//! concurrently and delivers the first response the validator accepts.
//!
//! Requires `Res: Default + PartialEq` and `Req: Clone`: the response type
//! stands in for a successful "no valid answer" result, and the request
//! must be cloned once per compiled child to fan it out. `Res::default()`
//! is the Rust expression of that null; hosts whose response type has no
//! natural default should use `Option<T>` as `Res` (`None` is then
//! exactly the "no valid answer" value) or always configure
//! `.with_no_valid_result_error(..)` so the default-value path is never
//! hit.
//!
//! These bounds apply only to this combinator, not to `Strategy` as a
//! whole: `build()` below is where they're checked, and what it produces
//! is a plain `Rc<dyn Fn(..)>` pair with the bounds erased, so a tree that
//! never uses `firstValidResult` is never required to satisfy them.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::address::Address;
use crate::callback::Aggregator;
use crate::error::{DispatchError, Unavailable};
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::Strategy;

type CompileFn<Req, Res> =
    Rc<dyn Fn(&dyn ConnectionPool<Req, Res>) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable>>;
type AddressesFn = Rc<dyn Fn() -> HashSet<Address>>;

/// The compiled-tree representation stored in `Strategy::FirstValidResult`.
///
/// Bound-erased: constructing one (via `FirstValidResultBuilder::build`)
/// requires `Req: Clone` and `Res: Default + PartialEq`, but the struct
/// itself does not name those bounds, so `Strategy<Req, Res>`'s own
/// `compile`/`addresses` methods stay usable for request/response types
/// that never touch this combinator.
pub struct FirstValidResult<Req, Res> {
    compile_fn: CompileFn<Req, Res>,
    addresses_fn: AddressesFn,
}

struct FirstValidResultSpec<Req, Res> {
    children: Vec<Strategy<Req, Res>>,
    validator: Option<Rc<dyn Fn(&Res) -> bool>>,
    no_valid_result_error: Option<Rc<dyn Fn() -> DispatchError>>,
    min_active: usize,
}

/// Builder for `firstValidResult`, matching the `.withX(..)` surface spec
/// §6 names.
pub struct FirstValidResultBuilder<Req, Res>(FirstValidResultSpec<Req, Res>);

impl<Req, Res> FirstValidResultBuilder<Req, Res> {
    pub(crate) fn new(children: Vec<Strategy<Req, Res>>) -> Self {
        FirstValidResultBuilder(FirstValidResultSpec {
            children,
            validator: None,
            no_valid_result_error: None,
            min_active: 1,
        })
    }

    pub fn with_result_validator(mut self, validator: impl Fn(&Res) -> bool + 'static) -> Self {
        self.0.validator = Some(Rc::new(validator));
        self
    }

    pub fn with_no_valid_result_error(
        mut self,
        error: impl Fn() -> DispatchError + 'static,
    ) -> Self {
        self.0.no_valid_result_error = Some(Rc::new(error));
        self
    }

    pub fn with_min_active_sub_strategies(mut self, n: usize) -> Self {
        self.0.min_active = n;
        self
    }
}

impl<Req, Res> FirstValidResultBuilder<Req, Res>
where
    Req: Clone + 'static,
    Res: Default + PartialEq + 'static,
{
    pub fn build(self) -> Strategy<Req, Res> {
        let spec = Rc::new(self.0);

        let addresses_fn: AddressesFn = {
            let spec = spec.clone();
            Rc::new(move || spec.children.iter().flat_map(|c| c.addresses()).collect())
        };

        let compile_fn: CompileFn<Req, Res> = {
            let spec = spec.clone();
            Rc::new(move |pool| {
                let compiled: Vec<Rc<dyn Sender<Req, Res>>> = spec
                    .children
                    .iter()
                    .filter_map(|c| c.compile(pool).ok())
                    .collect();
                if compiled.len() < spec.min_active.max(1) {
                    return Err(Unavailable);
                }
                Ok(Rc::new(FirstValidResultSender {
                    children: compiled,
                    validator: spec.validator.clone(),
                    no_valid_result_error: spec.no_valid_result_error.clone(),
                }) as Rc<dyn Sender<Req, Res>>)
            })
        };

        Strategy::FirstValidResult(FirstValidResult {
            compile_fn,
            addresses_fn,
        })
    }
}

pub(crate) fn addresses<Req, Res>(f: &FirstValidResult<Req, Res>) -> HashSet<Address> {
    (f.addresses_fn)()
}

pub(crate) fn compile<Req, Res>(
    f: &FirstValidResult<Req, Res>,
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable> {
    (f.compile_fn)(pool)
}

struct FirstValidResultSender<Req, Res> {
    children: Vec<Rc<dyn Sender<Req, Res>>>,
    validator: Option<Rc<dyn Fn(&Res) -> bool>>,
    no_valid_result_error: Option<Rc<dyn Fn() -> DispatchError>>,
}

#[async_trait(?Send)]
impl<Req, Res> Sender<Req, Res> for FirstValidResultSender<Req, Res>
where
    Req: Clone + 'static,
    Res: Default + PartialEq + 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        let mut pending: FuturesUnordered<LocalBoxFuture<'static, Result<Res, DispatchError>>> =
            FuturesUnordered::new();
        for child in &self.children {
            let child = child.clone();
            let req = request.clone();
            pending.push(Box::pin(async move { child.send_request(req, timeout).await }));
        }

        let fanout = pending.len();
        let aggregator = Aggregator::new(fanout);
        let is_valid = |res: &Res| match &self.validator {
            Some(validator) => validator(res),
            None => *res != Res::default(),
        };

        while let Some(outcome) = pending.next().await {
            match outcome {
                Ok(res) if is_valid(&res) => {
                    if aggregator.record_valid() {
                        trace!("firstValidResult: accepted a result with {} children still pending", pending.len());
                        // Dropping `pending` here cancels every other
                        // in-flight child; their resources are released
                        // by their own `Drop` impls.
                        return Ok(res);
                    }
                }
                _ => {
                    if aggregator.record_invalid() {
                        break;
                    }
                }
            }
        }

        match &self.no_valid_result_error {
            Some(build_error) => {
                debug!("firstValidResult: all {} children exhausted without a valid result", fanout);
                Err(build_error())
            }
            None => Ok(Res::default()),
        }
    }
}
