use crate::sequencer::BootSequencer;
use crate::{BootResult, BootState};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};
use uirb_config::{RunLimits, StopReason};

/// Outcome of a bounded run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub state: BootState,
    pub beats: u64,
    pub stop_reason: StopReason,
}

/// Terminal fail-safe: spin until the device is externally reset. Used in
/// place of a crash or reboot so unverified hardware is never operated.
pub fn halt_forever() -> ! {
    loop {
        std::hint::spin_loop();
    }
}

/// Device semantics: `initialize()` once, then heartbeats until the process
/// is reset from outside. A failed bring-up parks here permanently. Returns
/// only on a console I/O error.
pub fn run_forever(mut sequencer: BootSequencer) -> BootResult<()> {
    if sequencer.initialize()? == BootState::Halted {
        halt_forever();
    }
    loop {
        sequencer.heartbeat()?;
    }
}

/// CI semantics: the same boot sequence, stopped after `max_beats`
/// heartbeats or a wall-clock budget. A failed bring-up reports
/// `StopReason::Halt` instead of spinning.
pub fn run_bounded(sequencer: &mut BootSequencer, limits: &RunLimits) -> BootResult<RunReport> {
    let started = Instant::now();

    let state = sequencer.initialize()?;
    if state == BootState::Halted {
        warn!("Bounded run ended in halt state");
        return Ok(RunReport {
            state,
            beats: 0,
            stop_reason: StopReason::Halt,
        });
    }

    let mut beats = 0;
    while beats < limits.max_beats {
        if let Some(budget_ms) = limits.wall_time_ms {
            if started.elapsed().as_millis() as u64 >= budget_ms {
                info!(beats, "Wall-clock budget exhausted");
                return Ok(RunReport {
                    state,
                    beats,
                    stop_reason: StopReason::WallTime,
                });
            }
        }
        sequencer.heartbeat()?;
        beats += 1;
    }

    info!(beats, "Beat limit reached");
    Ok(RunReport {
        state,
        beats,
        stop_reason: StopReason::MaxBeats,
    })
}
