//! Deterministic channel for tests
//!
//! Replays a fixed script of bot responses and records every command sent.
//! A drained script behaves like a vanished window, so loops driven by this
//! channel always terminate.

use async_trait::async_trait;
use std::collections::VecDeque;

use super::{ChannelError, CommandKind, MessageChannel, MAX_TARGET_FAILURES};

#[derive(Debug, Default)]
pub struct ScriptedChannel {
    responses: VecDeque<Option<String>>,
    sent: Vec<CommandKind>,
    send_failures: u32,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next bot response.
    pub fn push_response(&mut self, text: &str) {
        self.responses.push_back(Some(text.to_string()));
    }

    /// Queue a transient read failure.
    pub fn push_read_failure(&mut self) {
        self.responses.push_back(None);
    }

    /// Make the next `count` sends fail.
    pub fn fail_next_sends(&mut self, count: u32) {
        self.send_failures = count;
    }

    /// Every command delivered so far, in order.
    pub fn sent(&self) -> &[CommandKind] {
        &self.sent
    }
}

#[async_trait]
impl MessageChannel for ScriptedChannel {
    async fn send_command(&mut self, kind: CommandKind) -> bool {
        if self.send_failures > 0 {
            self.send_failures -= 1;
            return false;
        }
        self.sent.push(kind);
        true
    }

    async fn read_latest(&mut self) -> Result<Option<String>, ChannelError> {
        match self.responses.pop_front() {
            Some(response) => Ok(response),
            None => Err(ChannelError::TargetGone(MAX_TARGET_FAILURES)),
        }
    }
}
