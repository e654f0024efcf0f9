//! Event fetch, stream, and subscription flows against a scripted node

mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;

use common::{token_address, transfer_log, transfer_value, MockNode, TOKEN_ABI, TRANSFER_TOPIC0};
use evmbind::{Contract, DynSolValue, Error, InterfaceRegistry, NodeClient};

fn token(node: Arc<MockNode>) -> Contract {
    let registry = InterfaceRegistry::from_json(TOKEN_ABI).unwrap();
    let client: Arc<dyn NodeClient> = node;
    Contract::new(token_address(), registry, client)
}

fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

#[tokio::test]
async fn fetch_decodes_history_in_order() {
    let node = MockNode::new();
    node.queue_logs(Ok(vec![
        transfer_log(10, 0, alice(), bob(), 1),
        transfer_log(11, 4, alice(), bob(), 2),
    ]));
    let contract = token(node.clone());

    let events = contract
        .event("Transfer")
        .unwrap()
        .from_block(10)
        .to_block(20)
        .fetch()
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name, "Transfer");
    assert_eq!(transfer_value(&events[0]), 1);
    assert_eq!(events[0].get("from"), Some(&DynSolValue::Address(alice())));
    assert_eq!(events[0].meta.block_number, Some(10));
    assert_eq!(events[0].meta.address, token_address());
    assert_eq!(events[1].meta.log_index, Some(4));

    let filters = node.seen_filters.lock().unwrap();
    assert_eq!(filters.len(), 1);
    assert!(filters[0].topics[0].matches(&TRANSFER_TOPIC0));
    assert!(filters[0].address.matches(&token_address()));
    assert_eq!(filters[0].get_from_block(), Some(10));
    assert_eq!(filters[0].get_to_block(), Some(20));
}

#[tokio::test]
async fn indexed_candidates_narrow_the_wire_filter() {
    let node = MockNode::new();
    node.queue_logs(Ok(Vec::new()));
    let contract = token(node.clone());

    contract
        .event("Transfer")
        .unwrap()
        .filter_field(
            "from",
            [
                DynSolValue::Address(alice()),
                DynSolValue::Address(bob()),
            ],
        )
        .unwrap()
        .fetch()
        .await
        .unwrap();

    let filters = node.seen_filters.lock().unwrap();
    assert!(filters[0].topics[1].matches(&alice().into_word()));
    assert!(filters[0].topics[1].matches(&bob().into_word()));
    assert!(filters[0].topics[2].is_empty());
}

#[tokio::test]
async fn pushed_stream_stitches_history_to_live_without_replay() {
    let (node, push) = MockNode::with_pushes();
    node.queue_logs(Ok(vec![
        transfer_log(10, 0, alice(), bob(), 1),
        transfer_log(10, 1, alice(), bob(), 2),
    ]));
    // The push side replays the backlog tail before anything new
    push.send(Ok(transfer_log(10, 1, alice(), bob(), 2))).await.unwrap();
    push.send(Ok(transfer_log(11, 0, alice(), bob(), 3))).await.unwrap();
    drop(push);

    let contract = token(node.clone());
    let mut stream = contract.event("Transfer").unwrap().stream().await.unwrap();

    let mut seen = Vec::new();
    while let Some(item) = stream.next().await {
        seen.push(transfer_value(&item.unwrap()));
    }
    assert_eq!(seen, vec![1, 2, 3]);
    stream.close().await;

    // Live side went through a real subscription, unbounded by the range
    let subscriptions = node.seen_subscriptions.lock().unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].get_from_block(), None);
}

#[tokio::test]
async fn polled_stream_follows_new_blocks_without_push() {
    let node = MockNode::new();
    node.queue_logs(Ok(vec![transfer_log(10, 0, alice(), bob(), 1)]));
    node.queue_logs(Ok(vec![transfer_log(11, 0, alice(), bob(), 2)]));
    let contract = token(node.clone());

    let mut stream = contract
        .event("Transfer")
        .unwrap()
        .poll_interval(Duration::from_millis(1))
        .stream()
        .await
        .unwrap();

    assert_eq!(transfer_value(&stream.next().await.unwrap().unwrap()), 1);
    assert_eq!(transfer_value(&stream.next().await.unwrap().unwrap()), 2);
    stream.close().await;

    assert!(node.seen_subscriptions.lock().unwrap().is_empty());
    let filters = node.seen_filters.lock().unwrap();
    // First the backlog query, then a poll round starting past block 10
    assert!(filters.len() >= 2);
    assert_eq!(filters[1].get_from_block(), Some(11));
}

#[tokio::test]
async fn subscribe_refuses_transports_that_cannot_push() {
    let node = MockNode::new();
    let contract = token(node);

    let err = contract
        .event("Transfer")
        .unwrap()
        .subscribe()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert!(err.to_string().contains("stream()"));
}

#[tokio::test]
async fn live_subscription_delivers_until_the_source_ends() {
    let (node, push) = MockNode::with_pushes();
    let contract = token(node.clone());

    let mut subscription = contract
        .event("Transfer")
        .unwrap()
        .filter_field("to", [DynSolValue::Address(bob())])
        .unwrap()
        .subscribe()
        .await
        .unwrap();

    push.send(Ok(transfer_log(20, 0, alice(), bob(), 5))).await.unwrap();
    push.send(Ok(transfer_log(21, 0, alice(), bob(), 6))).await.unwrap();

    let first = subscription.recv().await.unwrap().unwrap();
    assert_eq!(transfer_value(&first), 5);
    assert_eq!(first.meta.block_number, Some(20));
    assert_eq!(
        transfer_value(&subscription.recv().await.unwrap().unwrap()),
        6
    );

    drop(push);
    assert!(subscription.recv().await.is_none());

    // `to` is the second indexed field: slot 2 on the wire
    let subscriptions = node.seen_subscriptions.lock().unwrap();
    assert!(subscriptions[0].topics[2].matches(&bob().into_word()));
    assert!(subscriptions[0].topics[1].is_empty());
}

#[tokio::test]
async fn overflow_is_delivered_once_and_ends_the_subscription() {
    let (node, push) = MockNode::with_pushes();
    let contract = token(node);

    let mut subscription = contract
        .event("Transfer")
        .unwrap()
        .subscribe()
        .await
        .unwrap();

    push.send(Ok(transfer_log(30, 0, alice(), bob(), 9))).await.unwrap();
    push.send(Err(Error::SubscriptionOverflow { missed: 4 })).await.unwrap();
    drop(push);

    assert!(subscription.recv().await.unwrap().is_ok());
    let err = subscription.recv().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::SubscriptionOverflow { missed: 4 }));
    assert!(subscription.recv().await.is_none());
    subscription.cancel().await;
}
