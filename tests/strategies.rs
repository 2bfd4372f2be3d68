//! Integration tests exercising the routing combinators end to end against
//! `StaticPool`-backed mock senders. Each strategy is built, compiled, and
//! dispatched through exactly the public surface a host would use.

mod mocks;

use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use route_dispatch::strategy::servers;
use route_dispatch::{Address, StaticPool, Strategy};

use mocks::{ConstantSender, FailingSender, RecordingSender};

fn addr(port: u16) -> Address {
    let sock: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    Address::new(sock)
}

/// Runs an async block against a single-threaded runtime with a `LocalSet`,
/// since every compiled `Sender` in this crate is `!Send` by design.
fn run<F: std::future::Future>(fut: F) -> F::Output {
    drop(env_logger::try_init());
    let local = tokio::task::LocalSet::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    local.block_on(&rt, fut)
}

#[test]
fn round_robin_distributes_evenly_across_compiled_children() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let (a1, recv1) = RecordingSender::new(1);
        let (a2, recv2) = RecordingSender::new(2);
        let (a3, recv3) = RecordingSender::new(3);
        let a1addr = addr(9001);
        let a2addr = addr(9002);
        let a3addr = addr(9003);
        pool.insert(a1addr, a1);
        pool.insert(a2addr, a2);
        pool.insert(a3addr, a3);

        let strategy: Strategy<u32, u32> =
            Strategy::round_robin(servers(vec![a1addr, a2addr, a3addr]));
        let sender = strategy.compile(&pool).expect("all children compiled");

        for i in 0..9u32 {
            sender.send_request(i, Duration::from_secs(1)).await.unwrap();
        }

        assert_eq!(recv1.borrow().len(), 3);
        assert_eq!(recv2.borrow().len(), 3);
        assert_eq!(recv3.borrow().len(), 3);
    });
}

#[test]
fn sharding_routes_constant_key_to_one_child() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let (a1, recv1) = RecordingSender::new(1);
        let (a2, recv2) = RecordingSender::new(2);
        let a1addr = addr(9101);
        let a2addr = addr(9102);
        pool.insert(a1addr, a1);
        pool.insert(a2addr, a2);

        let sharding = route_dispatch::strategy::Sharding::new(
            |_req: &u32| 0usize,
            servers(vec![a1addr, a2addr]),
        );
        let strategy: Strategy<u32, u32> = Strategy::sharding(sharding);
        let sender = strategy.compile(&pool).expect("at least one shard compiled");

        for i in 0..5u32 {
            sender.send_request(i, Duration::from_secs(1)).await.unwrap();
        }

        assert_eq!(recv1.borrow().len(), 5);
        assert!(recv2.borrow().is_empty());
    });
}

#[test]
fn sharding_dispatch_fails_on_a_hole_left_by_an_uncompiled_child() {
    run(async {
        // Only a2 is in the pool; a1's shard is a hole in the compiled tree.
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let (a2, _recv2) = RecordingSender::new(2);
        let a1addr = addr(9111);
        let a2addr = addr(9112);
        pool.insert(a2addr, a2);

        let sharding = route_dispatch::strategy::Sharding::new(
            |_req: &u32| 0usize,
            servers(vec![a1addr, a2addr]),
        )
        .with_min_active_sub_strategies(1);
        let strategy: Strategy<u32, u32> = Strategy::sharding(sharding);
        let sender = strategy.compile(&pool).expect("shard 1 compiled, so tree compiles");

        let err = sender.send_request(0, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, route_dispatch::DispatchError::NoSenderAvailable));
    });
}

#[test]
fn rendezvous_hashing_removal_of_a_bucket_only_reshuffles_its_own_requests() {
    run(async {
        let ids = ["a", "b", "c"];
        let full_pool: StaticPool<u32, u32> = StaticPool::new();
        let mut addrs = Vec::new();
        for (i, _) in ids.iter().enumerate() {
            let (sender, _recv) = RecordingSender::new(i as u32);
            let a = addr(9200 + i as u16);
            full_pool.insert(a, sender);
            addrs.push(a);
        }

        let build_strategy = || {
            let buckets: Vec<(String, Strategy<u32, u32>)> = ids
                .iter()
                .zip(addrs.iter())
                .map(|(id, a)| (id.to_string(), Strategy::single(*a)))
                .collect();
            Strategy::rendezvous_hashing(route_dispatch::strategy::RendezvousHashing::new(
                |req: &u32| *req as u64,
                |id: &str, h: u64| {
                    // A deterministic stand-in score function: combine the
                    // bucket id's bytes with the request hash.
                    let id_hash: u64 = id.bytes().map(|b| b as u64).sum();
                    id_hash.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(h)
                },
                buckets,
            ))
        };

        let full = build_strategy().compile(&full_pool).unwrap();

        // Record which bucket each of 200 requests hashes to with all three
        // buckets present.
        let mut assignment_full = Vec::new();
        for req in 0..200u32 {
            let res = full.send_request(req, Duration::from_secs(1)).await.unwrap();
            assignment_full.push(res);
        }

        // Now remove bucket "c" (index 2) from the pool and recompile.
        let partial_pool: StaticPool<u32, u32> = StaticPool::new();
        for (i, a) in addrs.iter().enumerate().take(2) {
            let (sender, _recv) = RecordingSender::new(i as u32);
            partial_pool.insert(*a, sender);
        }
        let partial_strategy = {
            let buckets: Vec<(String, Strategy<u32, u32>)> = ids[..2]
                .iter()
                .zip(addrs[..2].iter())
                .map(|(id, a)| (id.to_string(), Strategy::single(*a)))
                .collect();
            Strategy::rendezvous_hashing(route_dispatch::strategy::RendezvousHashing::new(
                |req: &u32| *req as u64,
                |id: &str, h: u64| {
                    let id_hash: u64 = id.bytes().map(|b| b as u64).sum();
                    id_hash.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(h)
                },
                buckets,
            ))
        };
        let partial = partial_strategy.compile(&partial_pool).unwrap();

        // Every request that was NOT assigned to bucket 2 ("c") in the full
        // configuration must be assigned to the same bucket now.
        for req in 0..200u32 {
            if assignment_full[req as usize] != 2 {
                let res = partial.send_request(req, Duration::from_secs(1)).await.unwrap();
                assert_eq!(res, assignment_full[req as usize]);
            }
        }
    });
}

#[test]
fn first_valid_result_recompiles_after_a_child_drops_out() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let (a1, recv1) = RecordingSender::new(0);
        let (a2, recv2) = RecordingSender::new(0);
        let (a3, recv3) = RecordingSender::new(0);
        let a1addr = addr(9300);
        let a2addr = addr(9301);
        let a3addr = addr(9302);
        pool.insert(a1addr, a1);
        pool.insert(a2addr, a2);
        pool.insert(a3addr, a3);

        // A validator that always rejects, so every request fans out to
        // every compiled child before giving up (no early return), letting
        // us count exactly how many requests each child saw.
        let build = |pool: &StaticPool<u32, u32>| {
            Strategy::first_valid_result(servers(vec![a1addr, a2addr, a3addr]))
                .with_result_validator(|_res: &u32| false)
                .build()
                .compile(pool)
                .unwrap()
        };

        let sender = build(&pool);
        for i in 0..10u32 {
            let _ = sender.send_request(i, Duration::from_secs(1)).await;
        }
        assert_eq!(recv1.borrow().len(), 10);
        assert_eq!(recv2.borrow().len(), 10);
        assert_eq!(recv3.borrow().len(), 10);

        pool.remove(&a1addr);
        let sender = build(&pool);
        for i in 10..35u32 {
            let _ = sender.send_request(i, Duration::from_secs(1)).await;
        }

        assert_eq!(recv1.borrow().len(), 10);
        assert_eq!(recv2.borrow().len(), 35);
        assert_eq!(recv3.borrow().len(), 35);
    });
}

#[test]
fn first_valid_result_compile_fails_against_an_empty_pool() {
    let pool: StaticPool<u32, u32> = StaticPool::new();
    let a1addr = addr(9400);
    let a2addr = addr(9401);
    let a3addr = addr(9402);

    let result = Strategy::first_valid_result(servers(vec![a1addr, a2addr, a3addr]))
        .build()
        .compile(&pool);
    assert!(result.is_err());
}

#[test]
fn first_valid_result_compiles_with_partial_pool_coverage() {
    let pool: StaticPool<u32, u32> = StaticPool::new();
    let a1addr = addr(9410);
    let a2addr = addr(9411);
    let (a1, _recv1) = RecordingSender::new(0);
    pool.insert(a1addr, a1);

    let sender = Strategy::first_valid_result(servers(vec![a1addr, a2addr]))
        .build()
        .compile(&pool);
    assert!(sender.is_ok());
}

#[test]
fn first_valid_result_delivers_the_first_value_the_validator_accepts() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let a1addr = addr(9420);
        let a2addr = addr(9421);
        let a3addr = addr(9422);
        pool.insert(a1addr, Rc::new(ConstantSender(1)));
        pool.insert(a2addr, Rc::new(ConstantSender(1)));
        pool.insert(a3addr, Rc::new(ConstantSender(2)));

        let sender = Strategy::first_valid_result(servers(vec![a1addr, a2addr, a3addr]))
            .with_result_validator(|res: &u32| *res == 2)
            .build()
            .compile(&pool)
            .unwrap();

        let res = sender.send_request(0, Duration::from_secs(1)).await.unwrap();
        assert_eq!(res, 2);
    });
}

#[test]
fn first_valid_result_surfaces_the_configured_error_when_nothing_is_valid() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let a1addr = addr(9430);
        let a2addr = addr(9431);
        let a3addr = addr(9432);
        pool.insert(a1addr, Rc::new(ConstantSender(1)));
        pool.insert(a2addr, Rc::new(ConstantSender(1)));
        pool.insert(a3addr, Rc::new(ConstantSender(1)));

        let sender = Strategy::first_valid_result(servers(vec![a1addr, a2addr, a3addr]))
            .with_result_validator(|res: &u32| *res == 2)
            .with_no_valid_result_error(|| route_dispatch::DispatchError::NoValidResult {
                attempted: 3,
            })
            .build()
            .compile(&pool)
            .unwrap();

        let err = sender.send_request(0, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            route_dispatch::DispatchError::NoValidResult { attempted: 3 }
        ));
    });
}

#[test]
fn first_valid_result_falls_back_to_the_default_value_with_no_validator_and_no_error() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let a1addr = addr(9440);
        let a2addr = addr(9441);
        let a3addr = addr(9442);
        pool.insert(a1addr, Rc::new(ConstantSender(0)));
        pool.insert(a2addr, Rc::new(ConstantSender(0)));
        pool.insert(a3addr, Rc::new(ConstantSender(0)));

        let sender = Strategy::first_valid_result(servers(vec![a1addr, a2addr, a3addr]))
            .build()
            .compile(&pool)
            .unwrap();

        let res = sender.send_request(0, Duration::from_secs(1)).await.unwrap();
        assert_eq!(res, 0);
    });
}

#[test]
fn first_available_never_falls_back_once_compiled() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let a1addr = addr(9500);
        let a2addr = addr(9501);
        let (a2, recv2) = RecordingSender::new(2);
        pool.insert(a1addr, Rc::new(FailingSender));
        pool.insert(a2addr, a2);

        // a1 compiles (it's in the pool) even though it always fails at
        // dispatch time, so firstAvailable should stick with it rather
        // than falling through to a2 on request failure.
        let strategy: Strategy<u32, u32> = Strategy::first_available(servers(vec![a1addr, a2addr]));
        let sender = strategy.compile(&pool).unwrap();

        let err = sender.send_request(0, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, route_dispatch::DispatchError::ConnectionClosed));
        assert!(recv2.borrow().is_empty());
    });
}

#[test]
fn empty_pool_leaves_single_strategy_unavailable() {
    let pool: StaticPool<u32, u32> = StaticPool::new();
    let strategy: Strategy<u32, u32> = Strategy::single(addr(9600));
    assert!(strategy.compile(&pool).is_err());
    assert!(pool.is_empty());
}

#[test]
fn type_dispatch_routes_by_tag_and_falls_back_to_default() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let even_addr = addr(9700);
        let odd_addr = addr(9701);
        let default_addr = addr(9702);
        let (even, recv_even) = RecordingSender::new(100);
        let (odd, recv_odd) = RecordingSender::new(200);
        let (default, recv_default) = RecordingSender::new(300);
        pool.insert(even_addr, even);
        pool.insert(odd_addr, odd);
        pool.insert(default_addr, default);

        let mut mapping = std::collections::HashMap::new();
        mapping.insert("even".to_string(), Strategy::single(even_addr));
        mapping.insert("odd".to_string(), Strategy::single(odd_addr));
        let td = route_dispatch::strategy::TypeDispatch::new(
            |req: &u32| {
                if *req % 2 == 0 {
                    Some("even".to_string())
                } else if *req == 999 {
                    None
                } else {
                    Some("odd".to_string())
                }
            },
            mapping,
        )
        .with_default(Strategy::single(default_addr));

        let strategy: Strategy<u32, u32> = Strategy::type_dispatch(td);
        let sender = strategy.compile(&pool).unwrap();

        sender.send_request(2, Duration::from_secs(1)).await.unwrap();
        sender.send_request(3, Duration::from_secs(1)).await.unwrap();
        sender.send_request(999, Duration::from_secs(1)).await.unwrap();

        assert_eq!(recv_even.borrow().as_slice(), &[2]);
        assert_eq!(recv_odd.borrow().as_slice(), &[3]);
        assert_eq!(recv_default.borrow().as_slice(), &[999]);
    });
}

#[test]
fn callback_sender_invokes_its_callback_exactly_once() {
    run(async {
        let pool: StaticPool<u32, u32> = StaticPool::new();
        let a1addr = addr(9800);
        pool.insert(a1addr, Rc::new(ConstantSender(7)));

        let strategy: Strategy<u32, u32> = Strategy::single(a1addr);
        let sender = strategy.compile(&pool).unwrap();
        let callback_sender = route_dispatch::CallbackSender::new(sender);

        let invocations = Rc::new(std::cell::RefCell::new(Vec::new()));
        let invocations_clone = invocations.clone();
        callback_sender.send_request(
            1,
            Duration::from_secs(1),
            Box::new(move |result| {
                invocations_clone.borrow_mut().push(result);
            }),
        );

        // Let the spawned task run to completion.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let recorded = invocations.borrow();
        assert_eq!(recorded.len(), 1);
        assert_eq!(*recorded[0].as_ref().unwrap(), 7);
    });
}
