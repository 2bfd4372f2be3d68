//! `randomSampled`: weighted-random choice among whichever children
//! compiled.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::ThreadRng;
use rand::Rng;

use crate::error::{DispatchError, Unavailable};
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::state::WeightedSampler;
use super::Strategy;

pub(crate) fn compile<Req, Res>(
    children: &[(Strategy<Req, Res>, u32)],
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable>
where
    Req: 'static,
    Res: 'static,
{
    let mut compiled = Vec::with_capacity(children.len());
    let mut weights = Vec::with_capacity(children.len());
    for (strategy, weight) in children {
        if let Ok(sender) = strategy.compile(pool) {
            compiled.push(sender);
            weights.push(*weight);
        }
    }
    if compiled.is_empty() {
        return Err(Unavailable);
    }
    let total: u64 = weights.iter().map(|&w| w as u64).sum();
    let sampler = if total > 0 {
        Some(WeightedSampler::new(&weights))
    } else {
        None
    };
    Ok(Rc::new(RandomSampledSender {
        children: compiled,
        sampler,
        rng: RefCell::new(rand::thread_rng()),
    }))
}

struct RandomSampledSender<Req, Res> {
    children: Vec<Rc<dyn Sender<Req, Res>>>,
    // `None` when every compiled child carries weight 0 — falls back to a
    // uniform pick so the strategy still dispatches instead of panicking
    // on an empty weighted distribution.
    sampler: Option<WeightedSampler>,
    rng: RefCell<ThreadRng>,
}

impl<Req, Res> RandomSampledSender<Req, Res> {
    fn choose(&self) -> usize {
        let mut rng = self.rng.borrow_mut();
        match &self.sampler {
            Some(sampler) => sampler.sample(&mut *rng),
            None => rng.gen_range(0..self.children.len()),
        }
    }
}

#[async_trait(?Send)]
impl<Req, Res> Sender<Req, Res> for RandomSampledSender<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        let i = self.choose();
        self.children[i].send_request(request, timeout).await
    }
}
