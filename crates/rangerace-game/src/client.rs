//! A connected client and its outbound channel.

use rangerace_protocol::{ClientId, PlayerSummary, ServerMessage};
use tokio::sync::mpsc;

/// Sender half of a client's outbound channel. The receiving half lives in
/// the connection's writer task.
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// One connected client, owned by the coordinator.
///
/// All fields are mutated only inside the coordinator's event loop. The
/// guess bounds are always stored sorted.
#[derive(Debug)]
pub struct Client {
    pub(crate) id: ClientId,
    pub(crate) name: String,
    pub(crate) is_player: bool,
    pub(crate) total_score: i32,
    pub(crate) lower_bound: u8,
    pub(crate) upper_bound: u8,
    sender: ClientSender,
}

impl Client {
    pub(crate) fn new(id: ClientId, sender: ClientSender) -> Self {
        Self {
            id,
            name: String::new(),
            is_player: false,
            total_score: 0,
            lower_bound: 0,
            upper_bound: 0,
            sender,
        }
    }

    /// Stores a guessed interval, sorting the unordered input pair.
    pub(crate) fn set_guess(&mut self, a: u8, b: u8) {
        if a <= b {
            self.lower_bound = a;
            self.upper_bound = b;
        } else {
            self.lower_bound = b;
            self.upper_bound = a;
        }
    }

    /// Keeps the first non-empty name seen; later names are ignored.
    pub(crate) fn set_name_once(&mut self, name: &str) {
        if self.name.is_empty() && !name.is_empty() {
            self.name = name.to_string();
        }
    }

    /// Queues one event for this client's writer task.
    ///
    /// Fails only when the receiving half is gone, which means the
    /// connection is dead and the client should be unregistered.
    pub(crate) fn send(
        &self,
        msg: ServerMessage,
    ) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(msg)
    }

    /// The wire-facing view of this client.
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            total_score: self.total_score,
        }
    }
}
