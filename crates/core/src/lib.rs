pub mod board;
pub mod clock;
pub mod console;
pub mod runtime;
pub mod sequencer;

use serde::Serialize;


#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("Console channel error: {0}")]
    Console(#[from] std::io::Error),
    #[error("Boot sequence already ran; initialize() is one-shot")]
    AlreadyInitialized,
}

pub type BootResult<T> = Result<T, BootError>;

/// Boot lifecycle. `Halted` is terminal and reachable only through a failed
/// board bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootState {
    Uninitialized,
    Running,
    Halted,
}
