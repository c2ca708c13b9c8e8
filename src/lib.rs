//! forgeloop - automated enhance-and-sell loop for a chat-driven forge game
//!
//! The crate is built around a small decision engine:
//! - [`outcome`] classifies the bot's reply text into a tagged outcome
//! - [`item`] decides which drops are disposable and which are keepers
//! - [`policy`] maps the gold balance to the level worth gambling for
//! - [`stats`] buffers per-level counters and persists them to SQLite
//! - [`channel`] abstracts the chat window into three operations
//! - [`controller`] is the state machine tying it all together

pub mod channel;
pub mod cli;
pub mod config;
pub mod controller;
pub mod item;
pub mod logging;
pub mod outcome;
pub mod policy;
pub mod stats;

// Re-export the types most callers need.
pub use channel::{ChannelError, CommandKind, MessageChannel};
pub use config::Config;
pub use controller::{Controller, Mode, RunEnd, Session};
pub use item::ItemCategory;
pub use outcome::Outcome;
pub use stats::{StatsAggregator, StatsStore};
