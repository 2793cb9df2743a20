//! Progress spinner and a log writer that keeps it pinned below log lines.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::Subscriber;
use tracing_subscriber::fmt::{
    self,
    format::{Format, Json, JsonFields},
    MakeWriter,
};
use tracing_subscriber::registry::LookupSpan;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// Spinner counting archived records; hidden when `visible` is false
pub fn record_spinner(label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let spinner = multi_progress().add(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::with_template("{spinner} {prefix}: {pos} records ({msg})") {
        spinner.set_style(style);
    }
    spinner.set_prefix(label.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Print above any active spinner; straight to stderr when there is no terminal
fn print_line(line: &str) {
    let mp = multi_progress();
    if mp.is_hidden() {
        let _ = writeln!(io::stderr(), "{}", line);
    } else {
        let _ = mp.println(line);
    }
}

/// Log layer emitting one JSON object per event
pub fn json_log_layer<S, W>(writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer().json().with_writer(writer)
}

#[derive(Default, Clone)]
pub struct LogWriterFactory;

/// Buffers a log event and prints it line by line above the spinner
pub struct LogWriter {
    buffer: Vec<u8>,
}

impl LogWriter {
    fn emit_complete_lines(&mut self) {
        while let Some(idx) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=idx).collect();
            let text = String::from_utf8_lossy(&line);
            print_line(text.trim_end_matches(|c: char| c == '\r' || c == '\n'));
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.emit_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_complete_lines();
        if !self.buffer.is_empty() {
            let rest = String::from_utf8_lossy(&self.buffer).into_owned();
            print_line(&rest);
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter { buffer: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::prelude::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_log_layer_writes_json_lines() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry().with(json_log_layer(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(id = 7, "Archived message");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let event: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["fields"]["message"], "Archived message");
        assert_eq!(event["fields"]["id"], 7);
    }

    #[test]
    fn test_log_writer_splits_lines() {
        let mut writer = LogWriterFactory.make_writer();
        writer.write_all(b"first\nsecond").unwrap();
        assert_eq!(writer.buffer, b"second".to_vec());
        writer.flush().unwrap();
        assert!(writer.buffer.is_empty());
    }
}
