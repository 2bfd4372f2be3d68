//! `sharding`: dispatches by a caller-supplied shard index, preserving
//! holes at the positions of children that failed to compile.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::address::Address;
use crate::error::{DispatchError, Unavailable};
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::Strategy;

/// `shardFn: Request -> index`, paired with the ordered child list it
/// indexes into.
pub struct Sharding<Req, Res> {
    pub(crate) shard_fn: Rc<dyn Fn(&Req) -> usize>,
    pub(crate) children: Vec<Strategy<Req, Res>>,
    pub(crate) min_active: usize,
}

impl<Req, Res> Sharding<Req, Res> {
    pub fn new(
        shard_fn: impl Fn(&Req) -> usize + 'static,
        children: Vec<Strategy<Req, Res>>,
    ) -> Self {
        Sharding {
            shard_fn: Rc::new(shard_fn),
            children,
            min_active: 1,
        }
    }

    pub fn with_min_active_sub_strategies(mut self, n: usize) -> Self {
        self.min_active = n;
        self
    }
}

pub(crate) fn addresses<Req, Res>(s: &Sharding<Req, Res>) -> HashSet<Address> {
    s.children.iter().flat_map(|c| c.addresses()).collect()
}

pub(crate) fn compile<Req, Res>(
    s: &Sharding<Req, Res>,
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable>
where
    Req: 'static,
    Res: 'static,
{
    let slots: Vec<Option<Rc<dyn Sender<Req, Res>>>> =
        s.children.iter().map(|c| c.compile(pool).ok()).collect();
    let active = slots.iter().filter(|s| s.is_some()).count();
    if active < s.min_active.max(1) {
        return Err(Unavailable);
    }
    Ok(Rc::new(ShardingSender {
        shard_fn: s.shard_fn.clone(),
        slots,
    }))
}

struct ShardingSender<Req, Res> {
    shard_fn: Rc<dyn Fn(&Req) -> usize>,
    slots: Vec<Option<Rc<dyn Sender<Req, Res>>>>,
}

#[async_trait(?Send)]
impl<Req, Res> Sender<Req, Res> for ShardingSender<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        let i = (self.shard_fn)(&request);
        match self.slots.get(i).and_then(|slot| slot.as_ref()) {
            Some(sender) => sender.send_request(request, timeout).await,
            None => {
                warn!("shard {} has no compiled sender", i);
                Err(DispatchError::NoSenderAvailable)
            }
        }
    }
}
