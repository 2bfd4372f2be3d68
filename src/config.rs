//! Declarative strategy configuration: loads a `Strategy` tree's topology
//! from YAML or JSON.
//!
//! Closures (`shardFn`, `hashFn`, `bucketFn`, `typeFn`, validators, and
//! preset errors) cannot be serialized, so a config references them by
//! name and the host registers the actual `Fn` implementations in a
//! [`StrategyFunctions`] registry before calling [`StrategyConfig::into_strategy`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::error::DispatchError;
use crate::strategy::{RendezvousHashing, Sharding, Strategy, TypeDispatch};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse strategy configuration: {0}")]
    Parse(String),
    #[error("strategy configuration references unknown {kind} {name:?}")]
    UnknownFunction { kind: &'static str, name: String },
}

/// A serializable description of a `Strategy` tree's shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StrategyConfig {
    Single {
        addr: SocketAddr,
    },
    FirstAvailable {
        children: Vec<StrategyConfig>,
    },
    RoundRobin {
        children: Vec<StrategyConfig>,
    },
    RandomSampled {
        children: Vec<WeightedStrategyConfig>,
    },
    Sharding {
        shard_fn: String,
        children: Vec<StrategyConfig>,
        #[serde(default)]
        min_active_sub_strategies: Option<usize>,
    },
    RendezvousHashing {
        hash_fn: String,
        bucket_fn: String,
        buckets: Vec<BucketConfig>,
    },
    TypeDispatch {
        type_fn: String,
        mapping: HashMap<String, StrategyConfig>,
        #[serde(default)]
        default: Option<Box<StrategyConfig>>,
        #[serde(default)]
        allow_partial_maps: bool,
    },
    FirstValidResult {
        children: Vec<StrategyConfig>,
        #[serde(default)]
        result_validator: Option<String>,
        #[serde(default)]
        no_valid_result_error: Option<String>,
        #[serde(default)]
        min_active_sub_strategies: Option<usize>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedStrategyConfig {
    pub strategy: StrategyConfig,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    pub id: String,
    pub strategy: StrategyConfig,
}

impl StrategyConfig {
    /// Parses a JSON- or YAML-formatted strategy configuration, sniffing
    /// the leading byte to pick a format.
    pub fn from_str(txt: &str) -> Result<StrategyConfig, ConfigError> {
        let trimmed = txt.trim_start();
        if trimmed.starts_with('{') {
            serde_json::from_str(trimmed).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            serde_yaml::from_str(trimmed).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Builds a live `Strategy` tree, resolving named functions against
    /// `functions`.
    pub fn into_strategy<Req, Res>(
        &self,
        functions: &StrategyFunctions<Req, Res>,
    ) -> Result<Strategy<Req, Res>, ConfigError>
    where
        Req: Clone + 'static,
        Res: Default + PartialEq + 'static,
    {
        match self {
            StrategyConfig::Single { addr } => Ok(Strategy::single(Address::new(*addr))),
            StrategyConfig::FirstAvailable { children } => Ok(Strategy::first_available(
                into_strategies(children, functions)?,
            )),
            StrategyConfig::RoundRobin { children } => {
                Ok(Strategy::round_robin(into_strategies(children, functions)?))
            }
            StrategyConfig::RandomSampled { children } => {
                let mut out = Vec::with_capacity(children.len());
                for c in children {
                    out.push((c.strategy.into_strategy(functions)?, c.weight));
                }
                Ok(Strategy::random_sampled(out))
            }
            StrategyConfig::Sharding {
                shard_fn,
                children,
                min_active_sub_strategies,
            } => {
                let f = functions.shard_fn(shard_fn)?;
                let mut sharding = Sharding::new(
                    move |req: &Req| f(req),
                    into_strategies(children, functions)?,
                );
                if let Some(n) = min_active_sub_strategies {
                    sharding = sharding.with_min_active_sub_strategies(*n);
                }
                Ok(Strategy::sharding(sharding))
            }
            StrategyConfig::RendezvousHashing {
                hash_fn,
                bucket_fn,
                buckets,
            } => {
                let hash = functions.hash_fn(hash_fn)?;
                let bucket = functions.bucket_fn(bucket_fn)?;
                let mut out = Vec::with_capacity(buckets.len());
                for b in buckets {
                    out.push((b.id.clone(), b.strategy.into_strategy(functions)?));
                }
                Ok(Strategy::rendezvous_hashing(RendezvousHashing::new(
                    move |req: &Req| hash(req),
                    move |id: &str, h: u64| bucket(id, h),
                    out,
                )))
            }
            StrategyConfig::TypeDispatch {
                type_fn,
                mapping,
                default,
                allow_partial_maps,
            } => {
                let f = functions.type_fn(type_fn)?;
                let mut built = HashMap::with_capacity(mapping.len());
                for (tag, cfg) in mapping {
                    built.insert(tag.clone(), cfg.into_strategy(functions)?);
                }
                let mut td = TypeDispatch::new(move |req: &Req| f(req), built)
                    .with_partial_maps_allowed(*allow_partial_maps);
                if let Some(default) = default {
                    td = td.with_default(default.into_strategy(functions)?);
                }
                Ok(Strategy::type_dispatch(td))
            }
            StrategyConfig::FirstValidResult {
                children,
                result_validator,
                no_valid_result_error,
                min_active_sub_strategies,
            } => {
                let mut builder =
                    Strategy::first_valid_result(into_strategies(children, functions)?);
                if let Some(name) = result_validator {
                    let v = functions.validator(name)?;
                    builder = builder.with_result_validator(move |res: &Res| v(res));
                }
                if let Some(name) = no_valid_result_error {
                    let e = functions.error_factory(name)?;
                    builder = builder.with_no_valid_result_error(move || e());
                }
                if let Some(n) = min_active_sub_strategies {
                    builder = builder.with_min_active_sub_strategies(*n);
                }
                Ok(builder.build())
            }
        }
    }
}

fn into_strategies<Req, Res>(
    configs: &[StrategyConfig],
    functions: &StrategyFunctions<Req, Res>,
) -> Result<Vec<Strategy<Req, Res>>, ConfigError>
where
    Req: Clone + 'static,
    Res: Default + PartialEq + 'static,
{
    configs.iter().map(|c| c.into_strategy(functions)).collect()
}

/// The named closures a `StrategyConfig` can reference. Hosts register
/// their application-specific logic here once, then reuse it across any
/// number of configs.
pub struct StrategyFunctions<Req, Res> {
    shard_fns: HashMap<String, Rc<dyn Fn(&Req) -> usize>>,
    hash_fns: HashMap<String, Rc<dyn Fn(&Req) -> u64>>,
    bucket_fns: HashMap<String, Rc<dyn Fn(&str, u64) -> u64>>,
    type_fns: HashMap<String, Rc<dyn Fn(&Req) -> Option<String>>>,
    validators: HashMap<String, Rc<dyn Fn(&Res) -> bool>>,
    error_factories: HashMap<String, Rc<dyn Fn() -> DispatchError>>,
}

impl<Req, Res> Default for StrategyFunctions<Req, Res> {
    fn default() -> Self {
        StrategyFunctions {
            shard_fns: HashMap::new(),
            hash_fns: HashMap::new(),
            bucket_fns: HashMap::new(),
            type_fns: HashMap::new(),
            validators: HashMap::new(),
            error_factories: HashMap::new(),
        }
    }
}

impl<Req, Res> StrategyFunctions<Req, Res> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_shard_fn(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Req) -> usize + 'static,
    ) -> &mut Self {
        self.shard_fns.insert(name.into(), Rc::new(f));
        self
    }

    pub fn register_hash_fn(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Req) -> u64 + 'static,
    ) -> &mut Self {
        self.hash_fns.insert(name.into(), Rc::new(f));
        self
    }

    pub fn register_bucket_fn(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&str, u64) -> u64 + 'static,
    ) -> &mut Self {
        self.bucket_fns.insert(name.into(), Rc::new(f));
        self
    }

    pub fn register_type_fn(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Req) -> Option<String> + 'static,
    ) -> &mut Self {
        self.type_fns.insert(name.into(), Rc::new(f));
        self
    }

    pub fn register_validator(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Res) -> bool + 'static,
    ) -> &mut Self {
        self.validators.insert(name.into(), Rc::new(f));
        self
    }

    pub fn register_error_factory(
        &mut self,
        name: impl Into<String>,
        f: impl Fn() -> DispatchError + 'static,
    ) -> &mut Self {
        self.error_factories.insert(name.into(), Rc::new(f));
        self
    }

    fn shard_fn(&self, name: &str) -> Result<Rc<dyn Fn(&Req) -> usize>, ConfigError> {
        self.shard_fns
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFunction {
                kind: "shardFn",
                name: name.to_string(),
            })
    }

    fn hash_fn(&self, name: &str) -> Result<Rc<dyn Fn(&Req) -> u64>, ConfigError> {
        self.hash_fns
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFunction {
                kind: "hashFn",
                name: name.to_string(),
            })
    }

    fn bucket_fn(&self, name: &str) -> Result<Rc<dyn Fn(&str, u64) -> u64>, ConfigError> {
        self.bucket_fns
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFunction {
                kind: "bucketFn",
                name: name.to_string(),
            })
    }

    fn type_fn(&self, name: &str) -> Result<Rc<dyn Fn(&Req) -> Option<String>>, ConfigError> {
        self.type_fns
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFunction {
                kind: "typeFn",
                name: name.to_string(),
            })
    }

    fn validator(&self, name: &str) -> Result<Rc<dyn Fn(&Res) -> bool>, ConfigError> {
        self.validators
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFunction {
                kind: "resultValidator",
                name: name.to_string(),
            })
    }

    fn error_factory(&self, name: &str) -> Result<Rc<dyn Fn() -> DispatchError>, ConfigError> {
        self.error_factories
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFunction {
                kind: "noValidResultError",
                name: name.to_string(),
            })
    }
}
