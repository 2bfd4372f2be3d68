//! `Single(address)` and the `servers(...)` convenience sugar.

use std::collections::HashSet;
use std::rc::Rc;

use crate::address::Address;
use crate::error::Unavailable;
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::Strategy;

pub(crate) fn addresses(addr: &Address) -> HashSet<Address> {
    let mut set = HashSet::with_capacity(1);
    set.insert(*addr);
    set
}

pub(crate) fn compile<Req, Res>(
    addr: &Address,
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable> {
    pool.get(addr).ok_or(Unavailable)
}

/// Sugar for a list of `Single` strategies, for use as the child list of a
/// combinator (`firstAvailable(servers(a, b, c))`). Not itself a
/// dispatching strategy.
pub fn servers<Req, Res>(addrs: impl IntoIterator<Item = Address>) -> Vec<Strategy<Req, Res>> {
    addrs.into_iter().map(Strategy::Single).collect()
}
