//! Concurrency Integration Tests
//!
//! Several dispatchers and workers race over the same ledger. An order
//! must reach the venue and complete at most once no matter how the
//! races interleave.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Stack, at, dispatcher, market};
use order_engine::application::use_cases::DispatchOutcome;
use order_engine::domain::order_management::{
    ExecutionStatus, OrderLedger, OrderSide, OrderStatus, Transition, TriggerReason,
};
use order_engine::domain::shared::Timestamp;
use order_engine::infrastructure::venue::ScriptedVenue;
use rust_decimal_macros::dec;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_dispatchers_complete_order_once() {
    let stack = Stack::with_venue(
        ScriptedVenue::new().with_latency(Duration::from_millis(50)),
        1,
    );
    let now = at("2026-01-19T12:00:00Z");
    let order = stack
        .submit(market("race-1", OrderSide::Buy, "BTC", dec!(100)), now)
        .await;
    stack
        .ledger
        .transition(order.id(), Transition::trigger(TriggerReason::Market), now)
        .await
        .unwrap();

    let first = dispatcher(&stack.ledger, &stack.quota, &stack.venue);
    let second = dispatcher(&stack.ledger, &stack.quota, &stack.venue);

    let (a, b) = tokio::join!(
        first.dispatch(order.id(), now),
        second.dispatch(order.id(), now)
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, DispatchOutcome::Completed { .. }))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, DispatchOutcome::Skipped))
        .count();
    assert_eq!((completed, skipped), (1, 1));
    assert_eq!(stack.venue.calls(), 1);

    let attempts = stack.ledger.executions_for(order.id()).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status(), ExecutionStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cycles_dispatch_each_order_once() {
    let stack = Stack::with_venue(
        ScriptedVenue::new().with_latency(Duration::from_millis(5)),
        4,
    );
    let now = at("2026-01-19T12:00:00Z");

    let mut ids = Vec::new();
    for i in 0..20 {
        let order = stack
            .submit(
                market(&format!("batch-{i}"), OrderSide::Buy, "BTC", dec!(10)),
                now,
            )
            .await;
        ids.push(order.id().clone());
    }

    let cycles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&stack.engine);
            tokio::spawn(async move { engine.run_cycle_at(now).await })
        })
        .collect();
    for cycle in cycles {
        cycle.await.unwrap().unwrap();
    }

    assert_eq!(stack.venue.calls(), 20);
    for id in &ids {
        let order = stack.ledger.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(stack.ledger.completed_attempts(id), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_pool_drains_backlog_and_stops_on_shutdown() {
    let stack = Stack::with_venue(ScriptedVenue::new(), 3);
    let now = Timestamp::now();

    let mut ids = Vec::new();
    for i in 0..10 {
        let order = stack
            .submit(
                market(&format!("pool-{i}"), OrderSide::Buy, "ETH", dec!(5)),
                now,
            )
            .await;
        ids.push(order.id().clone());
    }

    let workers = stack.engine.start();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let mut done = 0;
        for id in &ids {
            let order = stack.ledger.find_by_id(id).await.unwrap().unwrap();
            if order.status() == OrderStatus::Completed {
                done += 1;
            }
        }
        if done == ids.len() || tokio::time::Instant::now() > deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    stack.engine.shutdown();
    for worker in workers {
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .unwrap()
            .unwrap();
    }

    assert_eq!(stack.venue.calls(), ids.len());
    for id in &ids {
        assert_eq!(stack.ledger.completed_attempts(id), 1);
    }
}
