//! `tracing_subscriber` integration

use tracing_subscriber::fmt::MakeWriter;

use crate::writer::RotatingWriter;

/// Lets a [`RotatingWriter`] be handed to `tracing_subscriber::fmt().with_writer(..)`.
/// Every event becomes one write, so rotation never splits a formatted line.
impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = &'a RotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmill_core::WriterConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_tracing_events_land_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.log");
        let writer = RotatingWriter::new(WriterConfig::new(&path).without_schedule()).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(answer = 42, "hello from tracing");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("hello from tracing"));
        assert!(content.contains("answer=42"));
        assert!(content.ends_with('\n'));
    }
}
