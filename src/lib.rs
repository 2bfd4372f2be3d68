//! An async RPC client-side request dispatch engine: composable routing
//! strategies, compiled against a live connection pool snapshot into a
//! concrete sender.
//!
//! The crate's entire concurrency model is single-threaded and cooperative
//! (see the `strategy` module docs): compiled senders are built on `Rc`, not
//! `Arc`, and are not `Send`. Hosts that want to use several dispatchers
//! concurrently run one per OS thread, each with its own reactor.

#[macro_use]
extern crate log;

mod address;
mod callback;
pub mod config;
mod error;
mod pool;
mod sender;
pub mod strategy;

pub use address::Address;
pub use callback::{Callback, CallbackSender};
pub use error::{DispatchError, Unavailable};
pub use pool::{ConnectionPool, StaticPool};
pub use sender::{FnSender, Sender};
pub use strategy::Strategy;
