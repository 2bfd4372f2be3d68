//! `roundRobin`: strict rotation across whichever children compiled.

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DispatchError, Unavailable};
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::state::RoundRobinCursor;
use super::Strategy;

pub(crate) fn compile<Req, Res>(
    children: &[Strategy<Req, Res>],
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable>
where
    Req: 'static,
    Res: 'static,
{
    let compiled: Vec<Rc<dyn Sender<Req, Res>>> = children
        .iter()
        .filter_map(|c| c.compile(pool).ok())
        .collect();
    if compiled.is_empty() {
        return Err(Unavailable);
    }
    let cursor = RoundRobinCursor::new(compiled.len());
    Ok(Rc::new(RoundRobinSender {
        children: compiled,
        cursor,
    }))
}

struct RoundRobinSender<Req, Res> {
    children: Vec<Rc<dyn Sender<Req, Res>>>,
    cursor: RoundRobinCursor,
}

#[async_trait(?Send)]
impl<Req, Res> Sender<Req, Res> for RoundRobinSender<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        let i = self.cursor.advance();
        self.children[i].send_request(request, timeout).await
    }
}
