// UIRB Demo - Boot Sequencer Platform
// Copyright (C) 2026 UIRB Project
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Debug stub console. The stub and the serial port share the board's only
//! communication channel, so attaching the stub disables serial output for
//! the remainder of execution.

use std::io;
use tracing::{debug, info};
use uirb_core::console::Console;

/// Console variant used while the debug stub owns the channel.
///
/// Every diagnostic line is discarded. That includes the board bring-up
/// failure message: with the stub attached there is no secondary output
/// path, so initialization failures are silent in this mode. Known
/// limitation, inherited from the original firmware.
#[derive(Debug, Default)]
pub struct DebugConsole {
    attached: bool,
}

impl DebugConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Console for DebugConsole {
    fn open(&mut self) -> io::Result<()> {
        self.attached = true;
        info!("Debug stub attached; serial output disabled");
        Ok(())
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        debug!(suppressed = text, "Serial output dropped");
        Ok(())
    }

    fn println(&mut self, line: &str) -> io::Result<()> {
        debug!(suppressed = line, "Serial output dropped");
        Ok(())
    }
}
