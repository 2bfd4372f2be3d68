//! A small demo host: loads a strategy configuration, wires up a static
//! pool of mock senders for the addresses it names, compiles the
//! strategy, and dispatches a handful of requests to show it working.

use std::fs;
use std::rc::Rc;
use std::time::Duration;

use clap::{crate_description, crate_name, crate_version, App, Arg};
use log::{error, info, warn};

use route_dispatch::config::{StrategyConfig, StrategyFunctions};
use route_dispatch::{FnSender, StaticPool};

static CONFIG_PATH_ARG: &str = "PATH";

fn mk_app() -> App<'static, 'static> {
    App::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::with_name(CONFIG_PATH_ARG)
                .required(true)
                .index(1)
                .help("Strategy configuration file path (YAML or JSON)."),
        )
}

fn main() {
    drop(pretty_env_logger::try_init());

    let opts = mk_app().get_matches();
    let config_path = opts.value_of(CONFIG_PATH_ARG).unwrap();
    let config_str = fs::read_to_string(config_path).expect("could not read configuration file");
    let config = StrategyConfig::from_str(&config_str).expect("invalid strategy configuration");

    // This demo only exercises strategies whose combinators need no named
    // functions (single/firstAvailable/roundRobin/randomSampled); an empty
    // registry is enough to resolve them.
    let functions: StrategyFunctions<u64, Option<String>> = StrategyFunctions::new();
    let strategy = match config.into_strategy(&functions) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("invalid strategy configuration: {}", e);
            std::process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("could not build runtime");

    local.block_on(&rt, async move {
        let pool: StaticPool<u64, Option<String>> = StaticPool::new();
        for addr in strategy.addresses() {
            pool.insert(
                addr,
                Rc::new(FnSender(move |req: u64, _timeout: Duration| async move {
                    Ok(Some(format!("{} answered {}", addr, req)))
                })),
            );
        }

        match strategy.compile(&pool) {
            Ok(sender) => {
                for i in 0..5u64 {
                    match sender.send_request(i, Duration::from_secs(1)).await {
                        Ok(res) => info!("request {}: {:?}", i, res),
                        Err(e) => warn!("request {}: {}", i, e),
                    }
                }
            }
            Err(_) => {
                error!("strategy compiled to Unavailable: no senders in the pool");
            }
        }
    });
}
