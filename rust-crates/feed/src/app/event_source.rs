use crate::events::FeedEvent;
use anyhow::Result;

pub trait EventSource {
    fn next_event(&mut self) -> impl Future<Output = Result<FeedEvent>>;
}
