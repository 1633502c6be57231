use crate::board::Board;
use crate::clock::{Delay, HEARTBEAT_PERIOD_MS};
use crate::console::Console;
use crate::{BootError, BootResult, BootState};
use tracing::{debug, warn};

pub const GREETING: &str = "Hello PIO from UIRB!";

/// Plain integer addition with the wraparound semantics of the original
/// target's native 16-bit `int`.
pub fn add(x: i16, y: i16) -> i16 {
    x.wrapping_add(y)
}

/// Runs the one-time boot sequence, then one heartbeat per driver call.
///
/// All collaborators are owned: the console strategy selected at startup, an
/// optional board-support instance, and the delay source.
pub struct BootSequencer {
    console: Box<dyn Console>,
    board: Option<Box<dyn Board>>,
    delay: Box<dyn Delay>,
    state: BootState,
}

impl BootSequencer {
    pub fn new(
        console: Box<dyn Console>,
        board: Option<Box<dyn Board>>,
        delay: Box<dyn Delay>,
    ) -> Self {
        Self {
            console,
            board,
            delay,
            state: BootState::Uninitialized,
        }
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    /// One-time initialization: open the channel, greet, bring up the board
    /// when present, run the addition demo. Returns the resulting state;
    /// `Halted` means the board refused bring-up and the driver must park.
    ///
    /// A second call is an error, which also guarantees `begin()` runs at
    /// most once per boot.
    pub fn initialize(&mut self) -> BootResult<BootState> {
        if self.state != BootState::Uninitialized {
            return Err(BootError::AlreadyInitialized);
        }

        self.console.open()?;
        self.console.println(GREETING)?;

        if let Some(board) = self.board.as_mut() {
            self.console.println(&format!(
                "UIRBcore ({}) has been included.",
                board.version()
            ))?;

            if !board.begin() {
                self.console.println("UIRBcore Initialization Failed!")?;
                warn!("Board bring-up failed; entering halt state");
                self.state = BootState::Halted;
                return Ok(self.state);
            }
            self.console.println("UIRBcore initialized successfully.")?;
        }

        let result = add(2, 3);
        self.console.print("2 + 3 = ")?;
        self.console.println(&result.to_string())?;

        debug!("Boot sequence complete");
        self.state = BootState::Running;
        Ok(self.state)
    }

    /// One pass of the main loop: a heartbeat line, then the fixed pause.
    pub fn heartbeat(&mut self) -> BootResult<()> {
        self.console.println("Looping...")?;
        self.delay.delay_ms(HEARTBEAT_PERIOD_MS);
        Ok(())
    }
}
