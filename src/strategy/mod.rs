//! The routing policy type hierarchy and its composition rules.
//!
//! A `Strategy` is an immutable, declarative description of how to route a
//! request; the only mutable state lives inside a *compiled* `Sender`.
//! One file per variant, glued together here with re-exports and the
//! top-level enum.

mod first_available;
mod first_valid_result;
mod random_sampled;
mod rendezvous;
mod round_robin;
mod sharding;
mod single;
mod state;
mod type_dispatch;

pub use first_valid_result::{FirstValidResult, FirstValidResultBuilder};
pub use rendezvous::RendezvousHashing;
pub use sharding::Sharding;
pub use single::servers;
pub use type_dispatch::TypeDispatch;

use std::collections::HashSet;
use std::rc::Rc;

use crate::address::Address;
use crate::error::Unavailable;
use crate::pool::ConnectionPool;
use crate::sender::Sender;

/// An immutable description of a routing policy.
///
/// Leaves (`Single`) name one address directly; composites hold one or
/// more sub-strategies and a policy for combining their compiled senders.
/// The tree itself never changes after construction — callers recompile
/// against a fresh pool snapshot whenever pool membership changes, rather
/// than mutating the tree in place.
pub enum Strategy<Req, Res> {
    Single(Address),
    FirstAvailable(Vec<Strategy<Req, Res>>),
    RoundRobin(Vec<Strategy<Req, Res>>),
    RandomSampled(Vec<(Strategy<Req, Res>, u32)>),
    Sharding(Sharding<Req, Res>),
    RendezvousHashing(RendezvousHashing<Req, Res>),
    TypeDispatch(TypeDispatch<Req, Res>),
    FirstValidResult(FirstValidResult<Req, Res>),
}

impl<Req, Res> Strategy<Req, Res> {
    /// A single fixed destination.
    pub fn single(addr: Address) -> Self {
        Strategy::Single(addr)
    }

    /// Routes to the first child that compiled; no fallback between
    /// requests once compiled.
    pub fn first_available(children: Vec<Strategy<Req, Res>>) -> Self {
        Strategy::FirstAvailable(children)
    }

    /// Strict rotation over whichever children compiled.
    pub fn round_robin(children: Vec<Strategy<Req, Res>>) -> Self {
        Strategy::RoundRobin(children)
    }

    /// Weighted-random choice over whichever children compiled. Each
    /// entry pairs a child with its integer weight.
    pub fn random_sampled(weighted_children: Vec<(Strategy<Req, Res>, u32)>) -> Self {
        Strategy::RandomSampled(weighted_children)
    }

    /// Dispatches by a caller-supplied shard index.
    pub fn sharding(sharding: Sharding<Req, Res>) -> Self {
        Strategy::Sharding(sharding)
    }

    /// Dispatches by rendezvous/HRW hashing over a set of named buckets.
    pub fn rendezvous_hashing(rendezvous: RendezvousHashing<Req, Res>) -> Self {
        Strategy::RendezvousHashing(rendezvous)
    }

    /// Dispatches by a caller-supplied type tag, with an optional default.
    pub fn type_dispatch(type_dispatch: TypeDispatch<Req, Res>) -> Self {
        Strategy::TypeDispatch(type_dispatch)
    }

    /// Begins building a `firstValidResult` combinator: fans a request out
    /// to every compiled child and returns the first result a validator
    /// accepts. Call `.build()` (which requires `Req: Clone` and
    /// `Res: Default + PartialEq`, see `first_valid_result`'s module docs)
    /// to obtain the `Strategy`.
    pub fn first_valid_result(children: Vec<Strategy<Req, Res>>) -> FirstValidResultBuilder<Req, Res> {
        FirstValidResultBuilder::new(children)
    }
}

impl<Req, Res> Strategy<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    /// The set of addresses this strategy may target, a superset of what
    /// any compiled sender will actually hit. Used by hosts to
    /// pre-subscribe a connection pool.
    pub fn addresses(&self) -> HashSet<Address> {
        match self {
            Strategy::Single(addr) => single::addresses(addr),
            Strategy::FirstAvailable(children) | Strategy::RoundRobin(children) => {
                children.iter().flat_map(|c| c.addresses()).collect()
            }
            Strategy::RandomSampled(children) => {
                children.iter().flat_map(|(c, _)| c.addresses()).collect()
            }
            Strategy::Sharding(s) => sharding::addresses(s),
            Strategy::RendezvousHashing(r) => rendezvous::addresses(r),
            Strategy::TypeDispatch(t) => type_dispatch::addresses(t),
            Strategy::FirstValidResult(f) => first_valid_result::addresses(f),
        }
    }

    /// Compiles this strategy against a pool snapshot.
    ///
    /// Pure, synchronous, performs no I/O. Returns `Unavailable` rather
    /// than a runtime error when no viable sender can be produced —
    /// compilation never owes the caller a callback.
    pub fn compile(
        &self,
        pool: &dyn ConnectionPool<Req, Res>,
    ) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable> {
        match self {
            Strategy::Single(addr) => single::compile(addr, pool),
            Strategy::FirstAvailable(children) => first_available::compile(children, pool),
            Strategy::RoundRobin(children) => round_robin::compile(children, pool),
            Strategy::RandomSampled(children) => random_sampled::compile(children, pool),
            Strategy::Sharding(s) => sharding::compile(s, pool),
            Strategy::RendezvousHashing(r) => rendezvous::compile(r, pool),
            Strategy::TypeDispatch(t) => type_dispatch::compile(t, pool),
            Strategy::FirstValidResult(f) => first_valid_result::compile(f, pool),
        }
    }
}
