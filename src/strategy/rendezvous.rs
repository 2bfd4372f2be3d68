//! `rendezvousHashing` (HRW hashing): each request is routed to the
//! compiled bucket that maximizes a caller-supplied score function of the
//! bucket id and the request's hash.
//!
//! Removing a bucket only reshuffles the requests that were mapped to it,
//! which is the standard rendezvous/HRW minimal-disruption guarantee: every
//! other bucket's relative scores for a given request hash are unaffected
//! by another bucket's presence or absence.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::address::Address;
use crate::error::{DispatchError, Unavailable};
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::Strategy;

pub struct RendezvousHashing<Req, Res> {
    pub(crate) hash_fn: Rc<dyn Fn(&Req) -> u64>,
    pub(crate) bucket_fn: Rc<dyn Fn(&str, u64) -> u64>,
    pub(crate) buckets: Vec<(String, Strategy<Req, Res>)>,
}

impl<Req, Res> RendezvousHashing<Req, Res> {
    pub fn new(
        hash_fn: impl Fn(&Req) -> u64 + 'static,
        bucket_fn: impl Fn(&str, u64) -> u64 + 'static,
        buckets: Vec<(String, Strategy<Req, Res>)>,
    ) -> Self {
        RendezvousHashing {
            hash_fn: Rc::new(hash_fn),
            bucket_fn: Rc::new(bucket_fn),
            buckets,
        }
    }
}

pub(crate) fn addresses<Req, Res>(r: &RendezvousHashing<Req, Res>) -> HashSet<Address> {
    r.buckets
        .iter()
        .flat_map(|(_, s)| s.addresses())
        .collect()
}

pub(crate) fn compile<Req, Res>(
    r: &RendezvousHashing<Req, Res>,
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable>
where
    Req: 'static,
    Res: 'static,
{
    let mut buckets: Vec<(String, Rc<dyn Sender<Req, Res>>)> = Vec::new();
    for (id, strategy) in &r.buckets {
        if let Ok(sender) = strategy.compile(pool) {
            buckets.push((id.clone(), sender));
        }
    }
    if buckets.is_empty() {
        return Err(Unavailable);
    }
    Ok(Rc::new(RendezvousSender {
        hash_fn: r.hash_fn.clone(),
        bucket_fn: r.bucket_fn.clone(),
        buckets,
    }))
}

struct RendezvousSender<Req, Res> {
    hash_fn: Rc<dyn Fn(&Req) -> u64>,
    bucket_fn: Rc<dyn Fn(&str, u64) -> u64>,
    buckets: Vec<(String, Rc<dyn Sender<Req, Res>>)>,
}

impl<Req, Res> RendezvousSender<Req, Res> {
    fn pick(&self, request_hash: u64) -> &Rc<dyn Sender<Req, Res>> {
        let (first_id, first_sender) = &self.buckets[0];
        let mut best = (
            (self.bucket_fn)(first_id, request_hash),
            first_id.as_str(),
            first_sender,
        );
        for (id, sender) in &self.buckets[1..] {
            let score = (self.bucket_fn)(id, request_hash);
            let (best_score, best_id, _) = best;
            if score > best_score || (score == best_score && id.as_str() < best_id) {
                best = (score, id.as_str(), sender);
            }
        }
        best.2
    }
}

#[async_trait(?Send)]
impl<Req, Res> Sender<Req, Res> for RendezvousSender<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        let h = (self.hash_fn)(&request);
        let sender = self.pick(h).clone();
        sender.send_request(request, timeout).await
    }
}
