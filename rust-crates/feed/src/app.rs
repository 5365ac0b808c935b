use crate::{
    app::event_source::EventSource,
    events::FeedEvent,
    live_feed::LiveFeed,
};

pub mod event_source;
pub mod ws_event_source;

#[cfg(test)]
mod tests;

/// Connectivity state surfaced to the consumer instead of a thrown error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn connected() -> Self {
        Self {
            connected: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum RunState {
    Continue,
    Exit,
}

pub struct App<Events> {
    events: Events,
    feed: LiveFeed,
    status: ConnectionStatus,
}

impl<Events> App<Events> {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            feed: LiveFeed::new(),
            status: ConnectionStatus::connected(),
        }
    }

    pub fn feed(&self) -> &LiveFeed {
        &self.feed
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }
}

impl<Events: EventSource> App<Events> {
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> RunState {
        tokio::select! {
            event = self.events.next_event() => {
                match event {
                    Ok(event) => {
                        self.apply(event);
                        RunState::Continue
                    }
                    Err(e) => {
                        tracing::warn!("event stream stopped: {e:#}");
                        self.status = ConnectionStatus::failed(format!("{e:#}"));
                        RunState::Exit
                    }
                }
            }
            _ = shutdown => {
                RunState::Exit
            }
        }
    }

    fn apply(&mut self, event: FeedEvent) {
        match &event {
            FeedEvent::Roll(roll) => {
                tracing::info!(
                    player = ?roll.player,
                    amount = roll.amount,
                    roll = %roll.roll,
                    block = roll.block_number,
                    "roll event"
                );
            }
            FeedEvent::Winner(winner) => {
                tracing::info!(
                    winner = ?winner.winner,
                    amount = %winner.amount,
                    block = winner.block_number,
                    "winner event"
                );
            }
        }
        self.feed.apply(event);
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
