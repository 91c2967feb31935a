use super::ToneOutput;
use std::io::Write;
use std::time::Duration;

/// Fallback output for machines without a sound device: rings the terminal
/// bell once per tone. A bell cannot be cut short, so `silence` is a no-op.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl ToneOutput for TerminalBell {
    fn start_tone(&self, _frequency_hz: f32, _duration: Duration) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }

    fn silence(&self) {}
}
