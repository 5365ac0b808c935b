#![allow(non_snake_case)]

use super::*;
use crate::{
    events::{
        FeedEvent,
        RollEvent,
        WinnerEvent,
    },
    live_feed::FEED_DEPTH,
};
use anyhow::Result;
use ethers::types::{
    Address,
    TxHash,
    U256,
};
use std::future::pending;

pub struct FakeEventSource {
    recv: tokio::sync::mpsc::Receiver<FeedEvent>,
}

impl FakeEventSource {
    pub fn new_with_sender() -> (Self, tokio::sync::mpsc::Sender<FeedEvent>) {
        let (send, recv) = tokio::sync::mpsc::channel(32);
        (FakeEventSource { recv }, send)
    }
}

impl EventSource for FakeEventSource {
    async fn next_event(&mut self) -> Result<FeedEvent> {
        match self.recv.recv().await {
            Some(event) => Ok(event),
            None => Err(anyhow::anyhow!("No more events")),
        }
    }
}

fn arb_roll_event(seed: u8) -> RollEvent {
    RollEvent::new(
        Address::repeat_byte(seed),
        U256::from(seed) * U256::exp10(15),
        U256::from(seed),
        seed as u64,
        TxHash::repeat_byte(seed),
        Some(U256::from(1_700_000_000u64)),
    )
}

fn arb_winner_event(seed: u8) -> WinnerEvent {
    WinnerEvent::new(
        Address::repeat_byte(seed),
        U256::from(seed) * U256::exp10(18),
        seed as u64,
        TxHash::repeat_byte(seed),
        Some(U256::from(1_700_000_000u64)),
    )
}

#[tokio::test]
async fn run__roll_event__prepends_to_feed() {
    // given
    let (event_source, event_sender) = FakeEventSource::new_with_sender();
    let mut app = App::new(event_source);
    let roll = arb_roll_event(1);

    // when
    event_sender
        .send(FeedEvent::Roll(roll.clone()))
        .await
        .unwrap();
    let state = app.run(pending()).await;

    // then
    assert_eq!(state, RunState::Continue);
    assert_eq!(app.feed().rolls(), &[roll]);
    assert!(app.status().connected);
}

#[tokio::test]
async fn run__batch_of_three_rolls__all_recorded_newest_first() {
    // given
    let (event_source, event_sender) = FakeEventSource::new_with_sender();
    let mut app = App::new(event_source);

    // when
    for seed in 1..=3 {
        event_sender
            .send(FeedEvent::Roll(arb_roll_event(seed)))
            .await
            .unwrap();
    }
    for _ in 0..3 {
        app.run(pending()).await;
    }

    // then
    assert_eq!(app.feed().rolls().len(), 3);
    assert_eq!(app.feed().rolls()[0], arb_roll_event(3));
    assert_eq!(app.feed().rolls()[2], arb_roll_event(1));

    // when a later batch delivers a fourth roll
    event_sender
        .send(FeedEvent::Roll(arb_roll_event(4)))
        .await
        .unwrap();
    app.run(pending()).await;

    // then
    assert_eq!(app.feed().rolls().len(), 4);
    assert_eq!(app.feed().rolls()[0], arb_roll_event(4));
}

#[tokio::test]
async fn run__more_rolls_than_depth__truncates_to_depth() {
    // given
    let (event_source, event_sender) = FakeEventSource::new_with_sender();
    let mut app = App::new(event_source);
    let total = FEED_DEPTH as u8 + 2;

    // when
    for seed in 1..=total {
        event_sender
            .send(FeedEvent::Roll(arb_roll_event(seed)))
            .await
            .unwrap();
        app.run(pending()).await;
    }

    // then
    assert_eq!(app.feed().rolls().len(), FEED_DEPTH);
    assert_eq!(app.feed().rolls()[0], arb_roll_event(total));
}

#[tokio::test]
async fn run__winner_event__does_not_touch_roll_list() {
    // given
    let (event_source, event_sender) = FakeEventSource::new_with_sender();
    let mut app = App::new(event_source);

    // when
    event_sender
        .send(FeedEvent::Roll(arb_roll_event(1)))
        .await
        .unwrap();
    event_sender
        .send(FeedEvent::Winner(arb_winner_event(2)))
        .await
        .unwrap();
    app.run(pending()).await;
    app.run(pending()).await;

    // then
    assert_eq!(app.feed().rolls().len(), 1);
    assert_eq!(app.feed().winners(), &[arb_winner_event(2)]);
}

#[tokio::test]
async fn run__source_failure__records_status_and_exits() {
    // given
    let (event_source, event_sender) = FakeEventSource::new_with_sender();
    let mut app = App::new(event_source);

    // when
    drop(event_sender);
    let state = app.run(pending()).await;

    // then
    assert_eq!(state, RunState::Exit);
    assert!(!app.status().connected);
    assert!(app.status().error.is_some());
}

#[tokio::test]
async fn run__shutdown_signal__exits_without_touching_status() {
    // given
    let (event_source, _event_sender) = FakeEventSource::new_with_sender();
    let mut app = App::new(event_source);

    // when
    let state = app.run(std::future::ready(())).await;

    // then
    assert_eq!(state, RunState::Exit);
    assert!(app.status().connected);
}
