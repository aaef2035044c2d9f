//! Primary and alternate status messages.

use crate::error::CommandError;

use super::command::{StatusTarget, decode_command, split_header};
use super::status::StatusMessage;

/// The two status messages kept for the bus.
///
/// The bus shows them in turn, one per service step, so host updates to the
/// alternate message do not hide the primary one.
#[derive(Debug, Clone, Default)]
pub struct StatusSlots {
    primary: StatusMessage,
    alternate: StatusMessage,
    alternate_next: bool,
}

impl StatusSlots {
    /// Both slots hold the default message.
    pub fn new() -> Self {
        Self::default()
    }

    /// The primary message.
    pub fn primary(&self) -> &StatusMessage {
        &self.primary
    }

    /// The alternate message.
    pub fn alternate(&self) -> &StatusMessage {
        &self.alternate
    }

    /// Applies one host command line.
    ///
    /// `F7` commands are decoded against the primary message and replace
    /// both slots; `F7A` commands are decoded against the alternate and
    /// replace only it. Returns the updated target, or `None` when the line
    /// is not a status command. On error neither slot changes.
    pub fn apply(&mut self, line: &str) -> Result<Option<StatusTarget>, CommandError> {
        let Some((target, fields)) = split_header(line) else {
            return Ok(None);
        };
        match target {
            StatusTarget::Primary => {
                let msg = decode_command(fields, &self.primary)?;
                self.alternate = msg.clone();
                self.primary = msg;
            }
            StatusTarget::Alternate => {
                self.alternate = decode_command(fields, &self.alternate)?;
            }
        }
        Ok(Some(target))
    }

    /// The message to send next: primary and alternate in turn.
    pub fn next_outbound(&mut self) -> &StatusMessage {
        let alternate = self.alternate_next;
        self.alternate_next = !alternate;
        if alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }
}
