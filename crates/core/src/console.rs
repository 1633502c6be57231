use std::io::{self, Write};
use tracing::info;

/// Output strategy for boot diagnostics. One implementation per channel
/// variant: the serial port here, the debug stub in its own crate.
pub trait Console {
    /// Claim the channel. Called exactly once, before any output.
    fn open(&mut self) -> io::Result<()>;
    /// Emit text without a line terminator.
    fn print(&mut self, text: &str) -> io::Result<()>;
    /// Emit one full line.
    fn println(&mut self, line: &str) -> io::Result<()>;
}

/// Line-oriented serial port at a fixed baud rate. The host-side sink is
/// injectable; production runs write to stdout, tests to shared buffers.
#[derive(Debug)]
pub struct SerialConsole<W: Write> {
    baud: u32,
    sink: W,
}

impl SerialConsole<io::Stdout> {
    pub fn stdout(baud: u32) -> Self {
        Self::new(baud, io::stdout())
    }
}

impl<W: Write> SerialConsole<W> {
    pub fn new(baud: u32, sink: W) -> Self {
        Self { baud, sink }
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl<W: Write> Console for SerialConsole<W> {
    fn open(&mut self) -> io::Result<()> {
        info!(baud = self.baud, "Serial port open");
        Ok(())
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        self.sink.write_all(text.as_bytes())?;
        self.sink.flush()
    }

    fn println(&mut self, line: &str) -> io::Result<()> {
        self.sink.write_all(line.as_bytes())?;
        self.sink.write_all(b"\n")?;
        self.sink.flush()
    }
}
