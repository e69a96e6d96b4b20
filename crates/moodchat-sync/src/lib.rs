//! Incremental message synchronization shared by every MoodChat client.
//!
//! Polling clients all need the same loop: fetch messages newer than a
//! watermark, merge them into local state without duplicates, re-sort by
//! creation time, advance the watermark. This crate is that loop's single
//! tested implementation, so presentation layers only render.

pub mod api;
pub mod feed;
pub mod poll;

pub use api::{ChatApi, ClientError};
pub use feed::MessageFeed;
pub use poll::Poller;
