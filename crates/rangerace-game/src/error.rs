//! Error types for the game layer.

/// Errors that can occur when talking to the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The coordinator's mailbox is closed; the pool task is gone.
    #[error("coordinator is not running")]
    CoordinatorClosed,
}
