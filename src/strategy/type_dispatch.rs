//! `typeDispatch`: routes by a caller-supplied tag extracted from the
//! request, falling back to an optional default.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::address::Address;
use crate::error::{DispatchError, Unavailable};
use crate::pool::ConnectionPool;
use crate::sender::Sender;

use super::Strategy;

pub struct TypeDispatch<Req, Res> {
    pub(crate) type_fn: Rc<dyn Fn(&Req) -> Option<String>>,
    pub(crate) mapping: HashMap<String, Strategy<Req, Res>>,
    pub(crate) default: Option<Box<Strategy<Req, Res>>>,
    /// When `true`, a mapped sub-strategy that fails to compile is simply
    /// dropped (requests for that tag fall through to the default, or
    /// fail at dispatch time if there is none) instead of making the
    /// whole combinator `Unavailable`. See DESIGN.md for the full policy.
    pub(crate) allow_partial: bool,
}

impl<Req, Res> TypeDispatch<Req, Res> {
    pub fn new(
        type_fn: impl Fn(&Req) -> Option<String> + 'static,
        mapping: HashMap<String, Strategy<Req, Res>>,
    ) -> Self {
        TypeDispatch {
            type_fn: Rc::new(type_fn),
            mapping,
            default: None,
            allow_partial: false,
        }
    }

    pub fn with_default(mut self, default: Strategy<Req, Res>) -> Self {
        self.default = Some(Box::new(default));
        self
    }

    pub fn with_partial_maps_allowed(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }
}

pub(crate) fn addresses<Req, Res>(t: &TypeDispatch<Req, Res>) -> HashSet<Address> {
    let mut set: HashSet<Address> = t.mapping.values().flat_map(|s| s.addresses()).collect();
    if let Some(default) = &t.default {
        set.extend(default.addresses());
    }
    set
}

pub(crate) fn compile<Req, Res>(
    t: &TypeDispatch<Req, Res>,
    pool: &dyn ConnectionPool<Req, Res>,
) -> Result<Rc<dyn Sender<Req, Res>>, Unavailable>
where
    Req: 'static,
    Res: 'static,
{
    let compiled_default = t.default.as_ref().and_then(|s| s.compile(pool).ok());
    let have_default = compiled_default.is_some();

    let mut compiled_map = HashMap::with_capacity(t.mapping.len());
    let mut any_mapping_failed = false;
    for (tag, strategy) in &t.mapping {
        match strategy.compile(pool) {
            Ok(sender) => {
                compiled_map.insert(tag.clone(), sender);
            }
            Err(_) => any_mapping_failed = true,
        }
    }

    if !have_default && any_mapping_failed && !t.allow_partial {
        return Err(Unavailable);
    }
    if compiled_map.is_empty() && compiled_default.is_none() {
        return Err(Unavailable);
    }

    Ok(Rc::new(TypeDispatchSender {
        type_fn: t.type_fn.clone(),
        mapping: compiled_map,
        default: compiled_default,
    }))
}

struct TypeDispatchSender<Req, Res> {
    type_fn: Rc<dyn Fn(&Req) -> Option<String>>,
    mapping: HashMap<String, Rc<dyn Sender<Req, Res>>>,
    default: Option<Rc<dyn Sender<Req, Res>>>,
}

#[async_trait(?Send)]
impl<Req, Res> Sender<Req, Res> for TypeDispatchSender<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    async fn send_request(&self, request: Req, timeout: Duration) -> Result<Res, DispatchError> {
        let tag = (self.type_fn)(&request);
        let sender = tag
            .as_ref()
            .and_then(|tag| self.mapping.get(tag))
            .or(self.default.as_ref());
        match sender {
            Some(sender) => sender.send_request(request, timeout).await,
            None => {
                warn!("no sender for type tag {:?} and no default configured", tag);
                Err(DispatchError::NoSenderAvailable)
            }
        }
    }
}
