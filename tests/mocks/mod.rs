//! Mock senders used by the integration tests: small, purpose-built fakes
//! rather than a general-purpose mocking framework.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use route_dispatch::{DispatchError, Sender};

/// Always answers with a fixed response and records every request it
/// receives, for fairness/count assertions.
pub struct RecordingSender {
    pub response: u32,
    pub received: Rc<RefCell<Vec<u32>>>,
}

impl RecordingSender {
    pub fn new(response: u32) -> (Rc<Self>, Rc<RefCell<Vec<u32>>>) {
        let received = Rc::new(RefCell::new(Vec::new()));
        (
            Rc::new(RecordingSender {
                response,
                received: received.clone(),
            }),
            received,
        )
    }
}

#[async_trait(?Send)]
impl Sender<u32, u32> for RecordingSender {
    async fn send_request(&self, request: u32, _timeout: Duration) -> Result<u32, DispatchError> {
        self.received.borrow_mut().push(request);
        Ok(self.response)
    }
}

/// Always fails with `ConnectionClosed`.
pub struct FailingSender;

#[async_trait(?Send)]
impl Sender<u32, u32> for FailingSender {
    async fn send_request(&self, _request: u32, _timeout: Duration) -> Result<u32, DispatchError> {
        Err(DispatchError::ConnectionClosed)
    }
}

/// Always answers with a fixed value after the request arrives, used by
/// `firstValidResult` tests where several children race.
pub struct ConstantSender(pub u32);

#[async_trait(?Send)]
impl Sender<u32, u32> for ConstantSender {
    async fn send_request(&self, _request: u32, _timeout: Duration) -> Result<u32, DispatchError> {
        Ok(self.0)
    }
}
