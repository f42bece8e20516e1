use std::io::{self, Write};

use ziplode::{ArchiveConfig, BombGenerator, ErrorCode, Stage};

/// Accepts `limit` bytes, then fails every write.
#[derive(Debug)]
struct FailAfter {
    written: Vec<u8>,
    limit: usize,
}

impl Write for FailAfter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.written.len();
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "device full"));
        }
        let n = room.min(buf.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn cfg() -> ArchiveConfig {
    ArchiveConfig {
        target_size_mb: 4,
        pattern_size: 1024 * 1024,
        ..ArchiveConfig::default()
    }
}

#[test]
fn failure_during_entries_stops_the_loop() {
    let config = cfg();
    let mut calls = 0;
    let mut gen = BombGenerator::new(&config);
    let sink = FailAfter {
        written: Vec::new(),
        limit: 100,
    };
    let err = gen.write_to(sink, |_| calls += 1).unwrap_err();
    assert_eq!(err.code(), ErrorCode::WriteFailed);
    assert_eq!(gen.stage(), Stage::Failed);
    assert_eq!(gen.failed_during(), Some(Stage::WritingEntries));
    assert_eq!(calls, 0);
}

#[test]
fn failure_during_directory() {
    let config = cfg();
    let (full, layout) = ziplode::generate_to_writer(Vec::new(), &config, |_| {}).unwrap();
    let sink = FailAfter {
        written: Vec::new(),
        limit: layout.directory.offset as usize + 10,
    };
    assert!(full.len() > sink.limit);
    let mut gen = BombGenerator::new(&config);
    let err = gen.write_to(sink, |_| {}).unwrap_err();
    assert_eq!(err.code(), ErrorCode::WriteFailed);
    assert_eq!(gen.failed_during(), Some(Stage::WritingDirectory));
}
