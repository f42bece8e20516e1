use std::io::{self, Write};

/// `Write` adapter that tracks how many bytes have been accepted so far.
///
/// Offsets recorded in the container come from [`CountingWriter::position`],
/// never from seeking, so the inner stream does not need to implement `Seek`.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes written through this adapter.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accepted_bytes() {
        let mut w = CountingWriter::new(Vec::new());
        w.write_all(b"hello").unwrap();
        w.write_all(&[0; 10]).unwrap();
        assert_eq!(w.position(), 15);
        assert_eq!(w.into_inner().len(), 15);
    }

    #[test]
    fn partial_writes_are_counted_exactly() {
        let mut buf = [0u8; 4];
        let mut w = CountingWriter::new(&mut buf[..]);
        assert_eq!(w.write(b"abcdef").unwrap(), 4);
        assert_eq!(w.position(), 4);
        assert!(w.write_all(b"x").is_err());
        assert_eq!(w.position(), 4);
    }
}
