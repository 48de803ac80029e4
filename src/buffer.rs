use std::io;
use std::io::Read;

const CHUNK_SIZE: usize = 4096;
const INITIAL_CAPACITY: usize = 32768;

/// Growable contiguous read buffer with explicit head and tail cursors.
///
/// Bytes enter at the tail via [`read_from`](ReadBuffer::read_from) and leave
/// from the head via [`consume_next`](ReadBuffer::consume_next). Leftover
/// bytes are compacted to the front before each refill so the readable region
/// is always a single slice.
#[derive(Debug)]
pub struct ReadBuffer {
    inner: Vec<u8>,
    head: usize,
    tail: usize,
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadBuffer {
    pub fn new() -> ReadBuffer {
        Self {
            inner: vec![0u8; INITIAL_CAPACITY],
            head: 0,
            tail: 0,
        }
    }

    #[inline]
    pub const fn available(&self) -> usize {
        self.tail - self.head
    }

    /// Performs one blocking read from the stream, appending at the tail.
    ///
    /// A stream reporting end of file maps to `UnexpectedEof` so callers can
    /// tell a dropped peer apart from a short read.
    pub fn read_from<S: Read>(&mut self, stream: &mut S) -> io::Result<usize> {
        self.make_room();
        let read = stream.read(&mut self.inner[self.tail..self.tail + CHUNK_SIZE])?;
        if read == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        self.tail += read;
        Ok(read)
    }

    /// Blocks until at least `len` bytes are available.
    pub fn fill<S: Read>(&mut self, stream: &mut S, len: usize) -> io::Result<()> {
        while self.available() < len {
            self.read_from(stream)?;
        }
        Ok(())
    }

    fn make_room(&mut self) {
        #[cold]
        fn grow(buf: &mut Vec<u8>) {
            buf.resize(buf.len() * 2, 0u8);
        }

        if self.head > 0 {
            if self.available() == 0 {
                self.head = 0;
                self.tail = 0;
            } else {
                self.inner.copy_within(self.head..self.tail, 0);
                self.tail -= self.head;
                self.head = 0;
            }
        }

        while self.tail + CHUNK_SIZE > self.inner.len() {
            grow(&mut self.inner);
        }
    }

    #[inline]
    pub fn view(&self) -> &[u8] {
        &self.inner[self.head..self.tail]
    }

    /// Consumes and returns the next `len` bytes.
    #[inline]
    pub fn consume_next(&mut self, len: usize) -> &[u8] {
        #[cold]
        fn bounds_violation(head: usize, tail: usize) -> ! {
            panic!("bounds violation: head[{}] > tail[{}]", head, tail)
        }

        let start = self.head;
        self.head += len;
        if self.head > self.tail {
            bounds_violation(self.head, self.tail);
        }
        &self.inner[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::io::ErrorKind::UnexpectedEof;

    use super::*;

    #[test]
    fn should_read_from_stream() {
        let mut buf = ReadBuffer::new();
        assert_eq!(0, buf.available());

        let mut stream = Cursor::new(b"hello world!");
        buf.read_from(&mut stream).expect("unable to read from the stream");

        assert_eq!(12, buf.available());
        assert_eq!(b"hello world!", buf.view());

        assert_eq!(b"hello ", buf.consume_next(6));
        assert_eq!(6, buf.available());
        assert_eq!(b"world!", buf.view());

        assert_eq!(b"world!", buf.consume_next(6));
        assert_eq!(0, buf.available());
        assert_eq!(b"", buf.view());
    }

    #[test]
    fn should_fill_exact_count_across_short_reads() {
        struct DribbleStream {
            data: Vec<u8>,
            at: usize,
        }

        impl Read for DribbleStream {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.at == self.data.len() {
                    return Ok(0);
                }
                let end = (self.at + 3).min(self.data.len());
                let n = end - self.at;
                buf[..n].copy_from_slice(&self.data[self.at..end]);
                self.at = end;
                Ok(n)
            }
        }

        let mut stream = DribbleStream {
            data: b"hello world!".to_vec(),
            at: 0,
        };
        let mut buf = ReadBuffer::new();

        buf.fill(&mut stream, 12).expect("unable to fill from the stream");
        assert_eq!(b"hello world!", buf.view());
    }

    #[test]
    fn should_error_at_eof() {
        let mut stream = Cursor::new(b"hello ");
        let mut buf = ReadBuffer::new();

        let err = buf.fill(&mut stream, 12).expect_err("expected eof error");
        assert_eq!(UnexpectedEof, err.kind());
        assert_eq!(6, buf.available());
    }

    #[test]
    fn should_clear_before_next_read_once_drained() {
        let mut stream = Cursor::new(b"hello world!");
        let mut buf = ReadBuffer::new();

        buf.read_from(&mut stream).expect("unable to read from the stream");
        buf.consume_next(12);
        assert_eq!(12, buf.head);

        let mut stream = Cursor::new(b"again");
        buf.read_from(&mut stream).expect("unable to read from the stream");
        assert_eq!(0, buf.head);
        assert_eq!(b"again", buf.view());
    }

    #[test]
    fn should_compact_leftover_before_next_read() {
        let mut stream = Cursor::new(b"hello world!");
        let mut buf = ReadBuffer::new();

        buf.read_from(&mut stream).expect("unable to read from the stream");
        buf.consume_next(6);
        assert_eq!(b"world!", buf.view());

        let mut stream = Cursor::new(b" again");
        buf.read_from(&mut stream).expect("unable to read from the stream");
        assert_eq!(b"world! again", buf.view());
        assert_eq!(0, buf.head);
    }

    #[test]
    fn should_grow_when_appending_past_capacity() {
        let mut buf = ReadBuffer::new();
        let data = vec![42u8; INITIAL_CAPACITY + 1];
        let mut stream = Cursor::new(&data);

        buf.fill(&mut stream, data.len()).expect("unable to fill from the stream");
        assert_eq!(data.len(), buf.available());
        assert!(buf.inner.len() > INITIAL_CAPACITY);
    }

    #[test]
    #[should_panic(expected = "bounds violation: head[32] > tail[6]")]
    fn should_panic_if_bounds_violated_on_consume() {
        let mut stream = Cursor::new(b"hello ");
        let mut buf = ReadBuffer::new();

        buf.read_from(&mut stream).expect("unable to read from the stream");
        buf.consume_next(32); // will panic
    }
}
