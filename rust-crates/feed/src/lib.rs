pub mod app;

pub mod events;

pub mod live_feed;
