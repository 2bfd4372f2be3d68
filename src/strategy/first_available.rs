//! `firstAvailable`: picks the first child that compiled, with no runtime
//! fallback between requests.

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DispatchError, Unavailable};
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::Strategy;

pub(crate) fn compile<Req, Res>(
    children: &[Strategy<Req, Res>],
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable>
where
    Req: 'static,
    Res: 'static,
{
    for (i, child) in children.iter().enumerate() {
        if let Ok(sender) = child.compile(pool) {
            debug!("firstAvailable: child {} compiled", i);
            return Ok(Rc::new(FirstAvailableSender { chosen: sender }));
        }
    }
    warn!("firstAvailable: no child among {} compiled", children.len());
    Err(Unavailable)
}

struct FirstAvailableSender<Req, Res> {
    chosen: Rc<dyn Sender<Req, Res>>,
}

#[async_trait(?Send)]
impl<Req, Res> Sender<Req, Res> for FirstAvailableSender<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        self.chosen.send_request(request, timeout).await
    }
}
