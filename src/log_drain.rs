//! Log output on the console serial line.
//!
//! The command loop drains both log streams between commands, so log text
//! never interleaves with a measurement report.
//!
//! Format: `[timestamp_us] LEVEL: message\r\n`

use core::fmt::Write;

use crate::log_globals::{APP_LOG_STREAM, ISR_LOG_STREAM};
use crate::logging::{BufWriter, LogEntry, LogStream};

/// Room for the longest message plus prefix.
pub const FORMAT_BUF_SIZE: usize = 160;

/// Format log entry into `buf`. Returns the length used.
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = write!(
        writer,
        "[{:10}] {}: {}\r\n",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.message()
    );
    writer.len()
}

/// Write every pending entry of `stream` to `out`. Returns the count.
pub fn drain_stream<const N: usize>(stream: &LogStream<N>, out: &mut dyn Write) -> usize {
    let mut format_buf = [0u8; FORMAT_BUF_SIZE];
    let mut written = 0;
    while let Some(entry) = stream.drain() {
        let len = format_log_entry(&entry, &mut format_buf);
        // format output is built from &str pieces
        if let Ok(text) = core::str::from_utf8(&format_buf[..len]) {
            let _ = out.write_str(text);
        }
        written += 1;
    }
    written
}

/// Drain the capture-event stream, then the engine stream, then report
/// losses once and reset the counters.
pub fn drain_logs(out: &mut dyn Write) -> usize {
    let written = drain_stream(&ISR_LOG_STREAM, out) + drain_stream(&APP_LOG_STREAM, out);

    let isr_dropped = ISR_LOG_STREAM.dropped();
    let app_dropped = APP_LOG_STREAM.dropped();
    if isr_dropped > 0 || app_dropped > 0 {
        let _ = write!(out, "[WARN] Dropped: ISR={}, APP={}\r\n", isr_dropped, app_dropped);
        ISR_LOG_STREAM.reset_dropped();
        APP_LOG_STREAM.reset_dropped();
    }
    written
}
