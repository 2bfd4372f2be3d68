//! The connection pool abstraction a host application provides to the
//! dispatch engine.
//!
//! Lookup must be non-blocking and safe to call repeatedly during a single
//! compile; the returned sender must stay valid at least through the
//! synchronous completion of any `send_request` begun while it was
//! current.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::address::Address;
use crate::sender::Sender;

/// Mapping from address to currently-live sender.
///
/// Entries appear and disappear asynchronously as connections open and
/// close; a `ConnectionPool` never blocks and never performs I/O from
/// `get`.
pub trait ConnectionPool<Req, Res> {
    /// Returns the current sender for `address`, or `None` if no
    /// connection is live for it right now.
    fn get(&self, address: &Address) -> Option<Rc<dyn Sender<Req, Res>>>;
}

/// A basic in-memory pool, useful for tests, examples, and hosts that
/// manage their own connection lifecycle and just need a place to publish
/// current senders.
///
/// A bare `RefCell`-guarded collection with no validity checking,
/// reconnection, or shrinking logic of its own — those remain host
/// responsibilities.
pub struct StaticPool<Req, Res> {
    entries: RefCell<HashMap<Address, Rc<dyn Sender<Req, Res>>>>,
}

impl<Req, Res> StaticPool<Req, Res> {
    pub fn new() -> Self {
        StaticPool {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Publishes (or replaces) the sender for `address`.
    pub fn insert(&self, address: Address, sender: Rc<dyn Sender<Req, Res>>) {
        self.entries.borrow_mut().insert(address, sender);
    }

    /// Removes the sender for `address`, simulating a closed connection.
    pub fn remove(&self, address: &Address) {
        self.entries.borrow_mut().remove(address);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<Req, Res> Default for StaticPool<Req, Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> ConnectionPool<Req, Res> for StaticPool<Req, Res> {
    fn get(&self, address: &Address) -> Option<Rc<dyn Sender<Req, Res>>> {
        self.entries.borrow().get(address).cloned()
    }
}
