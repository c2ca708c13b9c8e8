//! Request/response channel to the game chat window
//!
//! The decision engine only ever needs three operations from the chat
//! surface: send a slash command, read the latest inbound segment, and wait
//! for a fresh bot reply. Everything about how the window is driven lives
//! behind this trait.

pub mod scripted;

#[cfg(feature = "desktop")]
pub mod desktop;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Outbound slash commands understood by the game bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Enhance,
    Sell,
}

impl CommandKind {
    /// Exact text typed into the chat box.
    pub fn text(self) -> &'static str {
        match self {
            CommandKind::Enhance => "/강화",
            CommandKind::Sell => "/판매",
        }
    }
}

/// Marks the start of our own latest turn in the copied buffer; the bot's
/// reply appears after it.
pub const OWN_TURN_DELIMITER: &str = "@사용자";

/// Poll cadence while waiting for the bot to answer.
pub const RESPONSE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polls before [`MessageChannel::await_response`] gives up and hands back
/// whatever it last saw.
pub const MAX_RESPONSE_POLLS: u32 = 180;

/// Consecutive window-location failures before the run is abandoned.
pub const MAX_TARGET_FAILURES: u32 = 180;

/// The one failure the controller cannot retry its way out of.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("chat window not found after {0} consecutive attempts")]
    TargetGone(u32),
}

/// The inbound segment a reader should act on: everything from the last
/// own-turn delimiter onward, or the whole buffer if the delimiter is absent.
pub fn latest_segment(buffer: &str) -> &str {
    match buffer.rfind(OWN_TURN_DELIMITER) {
        Some(index) => &buffer[index..],
        None => buffer,
    }
}

#[async_trait]
pub trait MessageChannel: Send {
    /// Deliver a command. `false` means the target surface could not be
    /// addressed right now; the caller retries the whole cycle.
    async fn send_command(&mut self, kind: CommandKind) -> bool;

    /// Latest inbound segment, or `None` on a transient read failure.
    /// Escalates to [`ChannelError::TargetGone`] once the window has been
    /// missing for [`MAX_TARGET_FAILURES`] consecutive reads.
    async fn read_latest(&mut self) -> Result<Option<String>, ChannelError>;

    /// Poll until the buffer no longer ends with one of our own command
    /// echoes (the bot has actually answered). After [`MAX_RESPONSE_POLLS`]
    /// the last-seen text is returned as-is, stale or not, so one slow reply
    /// never kills the session.
    async fn await_response(&mut self) -> Result<Option<String>, ChannelError> {
        let mut last_seen = None;

        for attempt in 0..MAX_RESPONSE_POLLS {
            match self.read_latest().await? {
                None => {
                    tokio::time::sleep(RESPONSE_POLL_INTERVAL).await;
                }
                Some(text) => {
                    let tail = text.trim();
                    if tail.ends_with(CommandKind::Sell.text())
                        || tail.ends_with(CommandKind::Enhance.text())
                    {
                        debug!(
                            "    ⏳ waiting for the bot to reply ({}/{})",
                            attempt + 1,
                            MAX_RESPONSE_POLLS
                        );
                        last_seen = Some(text);
                        tokio::time::sleep(RESPONSE_POLL_INTERVAL).await;
                        continue;
                    }
                    return Ok(Some(text));
                }
            }
        }

        warn!("    ⚠️ gave up waiting for a bot reply, using the last seen text");
        Ok(last_seen)
    }
}
