use crate::events::{
    FeedEvent,
    RollEvent,
    WinnerEvent,
};

pub const FEED_DEPTH: usize = 10;

/// Bounded, most-recent-first view of the two event streams. Newest-first is
/// arrival order, not block order.
#[derive(Clone, Debug, Default)]
pub struct LiveFeed {
    rolls: Vec<RollEvent>,
    winners: Vec<WinnerEvent>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Roll(roll) => self.push_roll(roll),
            FeedEvent::Winner(winner) => self.push_winner(winner),
        }
    }

    pub fn push_roll(&mut self, roll: RollEvent) {
        self.rolls.insert(0, roll);
        self.rolls.truncate(FEED_DEPTH);
    }

    pub fn push_winner(&mut self, winner: WinnerEvent) {
        self.winners.insert(0, winner);
        self.winners.truncate(FEED_DEPTH);
    }

    pub fn rolls(&self) -> &[RollEvent] {
        &self.rolls
    }

    pub fn winners(&self) -> &[WinnerEvent] {
        &self.winners
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use ethers::types::{
        Address,
        TxHash,
        U256,
    };

    fn roll_event(seed: u8) -> RollEvent {
        RollEvent::new(
            Address::repeat_byte(seed),
            U256::from(seed) * U256::exp10(15),
            U256::from(seed),
            seed as u64,
            TxHash::repeat_byte(seed),
            None,
        )
    }

    fn winner_event(seed: u8) -> WinnerEvent {
        WinnerEvent::new(
            Address::repeat_byte(seed),
            U256::from(seed) * U256::exp10(18),
            seed as u64,
            TxHash::repeat_byte(seed),
            None,
        )
    }

    #[test]
    fn push_roll__successive_events__newest_first() {
        let mut feed = LiveFeed::new();

        feed.push_roll(roll_event(1));
        feed.push_roll(roll_event(2));
        feed.push_roll(roll_event(3));

        assert_eq!(feed.rolls().len(), 3);
        assert_eq!(feed.rolls()[0], roll_event(3));
        assert_eq!(feed.rolls()[2], roll_event(1));
    }

    #[test]
    fn push_roll__beyond_depth__evicts_oldest() {
        let mut feed = LiveFeed::new();

        for seed in 1..=(FEED_DEPTH as u8 + 2) {
            feed.push_roll(roll_event(seed));
        }

        assert_eq!(feed.rolls().len(), FEED_DEPTH);
        assert_eq!(feed.rolls()[0], roll_event(FEED_DEPTH as u8 + 2));
        assert_eq!(feed.rolls()[FEED_DEPTH - 1], roll_event(3));
    }

    #[test]
    fn push_winner__independent_of_rolls() {
        let mut feed = LiveFeed::new();

        feed.push_roll(roll_event(1));
        feed.push_winner(winner_event(2));

        assert_eq!(feed.rolls().len(), 1);
        assert_eq!(feed.winners().len(), 1);
        assert_eq!(feed.winners()[0], winner_event(2));
    }
}
