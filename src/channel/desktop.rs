//! Real chat-window channel: keystroke injection plus clipboard readback
//!
//! Commands are pasted into the chat box and submitted with Enter; the
//! buffer is read back with select-all / copy and a clipboard read. The
//! operator keeps the chat window focused; this layer only injects input
//! and counts how long the surface has been unreachable.

use anyhow::{Context, Result};
use arboard::Clipboard;
use async_trait::async_trait;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::time::Duration;
use tracing::{error, info, warn};

use super::{latest_segment, ChannelError, CommandKind, MessageChannel, MAX_TARGET_FAILURES};

// Settle time between injected keystrokes.
const KEYSTROKE_DELAY: Duration = Duration::from_millis(100);

pub struct DesktopChannel {
    window_title: String,
    consecutive_failures: u32,
}

impl DesktopChannel {
    pub fn new(window_title: String) -> Self {
        info!("🖥️ operating on window '{window_title}' (keep it focused)");
        Self {
            window_title,
            consecutive_failures: 0,
        }
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    fn type_command(&self, kind: CommandKind) -> Result<()> {
        let mut clipboard = Clipboard::new().context("failed to open clipboard")?;
        clipboard
            .set_text(kind.text())
            .context("failed to place command on clipboard")?;

        let mut enigo = Enigo::new(&Settings::default()).context("failed to create Enigo")?;

        // Paste the command, then a space and Enter to submit, matching how
        // the chat box accepts slash commands.
        hotkey(&mut enigo, Key::Control, Key::Unicode('v'))?;
        std::thread::sleep(KEYSTROKE_DELAY);
        enigo
            .key(Key::Space, Direction::Click)
            .context("failed to press space")?;
        std::thread::sleep(KEYSTROKE_DELAY);
        enigo
            .key(Key::Return, Direction::Click)
            .context("failed to press enter")?;
        Ok(())
    }

    fn copy_buffer(&self) -> Result<String> {
        let mut enigo = Enigo::new(&Settings::default()).context("failed to create Enigo")?;

        hotkey(&mut enigo, Key::Control, Key::Unicode('a'))?;
        hotkey(&mut enigo, Key::Control, Key::Unicode('c'))?;
        std::thread::sleep(KEYSTROKE_DELAY);

        let mut clipboard = Clipboard::new().context("failed to open clipboard")?;
        clipboard
            .get_text()
            .context("failed to read clipboard after copy")
    }
}

fn hotkey(enigo: &mut Enigo, modifier: Key, key: Key) -> Result<()> {
    enigo
        .key(modifier, Direction::Press)
        .context("failed to press modifier")?;
    enigo.key(key, Direction::Click).context("failed to press key")?;
    enigo
        .key(modifier, Direction::Release)
        .context("failed to release modifier")?;
    Ok(())
}

#[async_trait]
impl MessageChannel for DesktopChannel {
    async fn send_command(&mut self, kind: CommandKind) -> bool {
        match self.type_command(kind) {
            Ok(()) => true,
            Err(err) => {
                error!("command injection failed: {err:#}");
                false
            }
        }
    }

    async fn read_latest(&mut self) -> Result<Option<String>, ChannelError> {
        match self.copy_buffer() {
            Ok(buffer) => {
                self.consecutive_failures = 0;
                Ok(Some(latest_segment(&buffer).to_string()))
            }
            Err(err) => {
                self.consecutive_failures += 1;
                warn!(
                    "buffer read failed ({}/{}): {err:#}",
                    self.consecutive_failures, MAX_TARGET_FAILURES
                );
                if self.consecutive_failures >= MAX_TARGET_FAILURES {
                    return Err(ChannelError::TargetGone(self.consecutive_failures));
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(None)
            }
        }
    }
}
