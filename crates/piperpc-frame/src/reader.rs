use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::codec::{FramerConfig, Message, UTF8_BOM};
use crate::error::{FrameError, Result};
use crate::framer::MessageFramer;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// One-shot check for a UTF-8 byte order mark at stream start.
#[derive(Debug, Clone, Copy)]
enum BomCheck {
    Off,
    Buffering { buf: [u8; 3], len: usize },
    Done,
}

/// Reads complete framed messages from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete messages.
/// End-of-stream between messages yields `Ok(None)`; end-of-stream inside a
/// message is reported as [`FrameError::UnexpectedEof`].
pub struct MessageReader<T> {
    inner: T,
    framer: MessageFramer,
    pending: VecDeque<Message>,
    failed: Option<FrameError>,
    bom: BomCheck,
    eof: bool,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FramerConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: T, config: FramerConfig) -> Self {
        Self {
            inner,
            framer: MessageFramer::with_config(config),
            pending: VecDeque::new(),
            failed: None,
            bom: BomCheck::Off,
            eof: false,
        }
    }

    /// Tolerate a UTF-8 byte order mark on the first three bytes of the stream.
    ///
    /// The mark is stripped at most once and only at stream start. Any other
    /// three-byte prefix is fed to the framer unmodified, as are all later
    /// occurrences of the mark.
    pub fn strip_leading_bom(mut self) -> Self {
        self.bom = BomCheck::Buffering {
            buf: [0; 3],
            len: 0,
        };
        self
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Ok(None)` once the stream ends cleanly between messages.
    ///
    /// A framing error never swallows messages framed earlier in the same
    /// read: those are returned first, and the error surfaces on the call
    /// after the last of them.
    pub fn read_message(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some(msg) = self.pending.pop_front() {
                return Ok(Some(msg));
            }
            if let Some(err) = self.failed.take() {
                // Bytes past a framing error are garbage; stop reading.
                self.eof = true;
                return Err(err);
            }
            if self.eof {
                if self.framer.is_idle() {
                    return Ok(None);
                }
                return Err(FrameError::UnexpectedEof);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.eof = true;
                self.flush_bom_buffer();
                continue;
            }

            self.ingest(&chunk[..read]);
        }
    }

    fn ingest(&mut self, chunk: &[u8]) {
        let rest = self.check_bom(chunk);
        if !rest.is_empty() {
            self.feed(rest);
        }
    }

    /// Push bytes into the framer, queueing completed messages and holding
    /// back the first framing error until the queue drains.
    fn feed(&mut self, bytes: &[u8]) {
        if self.failed.is_some() {
            return;
        }
        let mut out = Vec::new();
        let result = self.framer.push_chunk(bytes, &mut out);
        self.pending.extend(out);
        if let Err(err) = result {
            self.failed = Some(err);
        }
    }

    /// Route the first three stream bytes through the BOM buffer; everything
    /// after that passes straight through.
    fn check_bom<'a>(&mut self, chunk: &'a [u8]) -> &'a [u8] {
        let BomCheck::Buffering { mut buf, len } = self.bom else {
            return chunk;
        };

        let take = (UTF8_BOM.len() - len).min(chunk.len());
        buf[len..len + take].copy_from_slice(&chunk[..take]);
        let len = len + take;
        if len < UTF8_BOM.len() {
            self.bom = BomCheck::Buffering { buf, len };
            return &chunk[take..];
        }

        self.bom = BomCheck::Done;
        if buf == UTF8_BOM {
            debug!("stripped utf-8 byte order mark at stream start");
        } else {
            self.feed(&buf);
        }
        &chunk[take..]
    }

    /// A stream shorter than three bytes still owes its prefix to the framer.
    fn flush_bom_buffer(&mut self) {
        if let BomCheck::Buffering { buf, len } = self.bom {
            self.bom = BomCheck::Done;
            if len > 0 {
                self.feed(&buf[..len]);
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FramerConfig {
        self.framer.config()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_message;

    fn wire(bodies: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for body in bodies {
            encode_message(body, &mut buf);
        }
        buf.to_vec()
    }

    fn read_all<T: Read>(reader: &mut MessageReader<T>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Some(msg) = reader.read_message().unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn read_single_message() {
        let mut reader = MessageReader::new(Cursor::new(wire(&[b"hello"])));
        let msg = reader.read_message().unwrap().unwrap();

        assert_eq!(msg.body.as_ref(), b"hello");
        assert_eq!(msg.content_length(), Some(5));
    }

    #[test]
    fn read_multiple_messages_in_order() {
        let mut reader = MessageReader::new(Cursor::new(wire(&[b"one", b"two", b"three"])));
        let msgs = read_all(&mut reader);

        let bodies: Vec<&[u8]> = msgs.iter().map(|m| m.body.as_ref()).collect();
        assert_eq!(bodies, vec![b"one".as_ref(), b"two".as_ref(), b"three".as_ref()]);
    }

    #[test]
    fn clean_eof_returns_none_repeatedly() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_message().unwrap().is_none());
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn eof_mid_message_is_unexpected() {
        let mut truncated = wire(&[b"complete"]);
        truncated.extend_from_slice(b"Content-Length: 10\r\n\r\nonly-");

        let mut reader = MessageReader::new(Cursor::new(truncated));
        assert_eq!(
            reader.read_message().unwrap().unwrap().body.as_ref(),
            b"complete"
        );
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEof));
    }

    #[test]
    fn message_before_broken_headers_is_delivered() {
        let mut stream = wire(&[b"ok"]);
        stream.extend_from_slice(b"Content-Type: application/json\r\n\r\n");

        // Cursor hands the whole stream over in a single read.
        let mut reader = MessageReader::new(Cursor::new(stream));
        assert_eq!(reader.read_message().unwrap().unwrap().body.as_ref(), b"ok");
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::MissingContentLength));
    }

    #[test]
    fn eof_mid_headers_is_unexpected() {
        let mut reader = MessageReader::new(Cursor::new(b"Content-Len".to_vec()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEof));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[b"slow"]),
            pos: 0,
        };
        let mut reader = MessageReader::new(byte_reader);

        let msg = reader.read_message().unwrap().unwrap();
        assert_eq!(msg.body.as_ref(), b"slow");
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn bom_prefixed_stream_equals_unprefixed() {
        let plain = wire(&[b"alpha", b"beta"]);
        let mut prefixed = UTF8_BOM.to_vec();
        prefixed.extend_from_slice(&plain);

        let mut plain_reader = MessageReader::new(Cursor::new(plain));
        let mut bom_reader = MessageReader::new(Cursor::new(prefixed)).strip_leading_bom();

        assert_eq!(read_all(&mut plain_reader), read_all(&mut bom_reader));
    }

    #[test]
    fn non_bom_prefix_is_protocol_bytes() {
        // The first three bytes are part of the Content-Length header name.
        let mut reader =
            MessageReader::new(Cursor::new(wire(&[b"kept"]))).strip_leading_bom();

        let msg = reader.read_message().unwrap().unwrap();
        assert_eq!(msg.body.as_ref(), b"kept");
    }

    #[test]
    fn bom_without_strip_is_header_garbage() {
        let mut prefixed = UTF8_BOM.to_vec();
        prefixed.extend_from_slice(&wire(&[b"x"]));

        let mut reader = MessageReader::new(Cursor::new(prefixed));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::MissingContentLength));
    }

    #[test]
    fn second_bom_is_not_stripped() {
        let mut stream = UTF8_BOM.to_vec();
        stream.extend_from_slice(&wire(&[b"first"]));
        stream.extend_from_slice(&UTF8_BOM);
        stream.extend_from_slice(&wire(&[b"second"]));

        let mut reader = MessageReader::new(Cursor::new(stream)).strip_leading_bom();
        assert_eq!(
            reader.read_message().unwrap().unwrap().body.as_ref(),
            b"first"
        );
        // The second mark glues onto the next header name and breaks it.
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::MissingContentLength));
    }

    #[test]
    fn bom_then_eof_is_clean() {
        let mut reader =
            MessageReader::new(Cursor::new(UTF8_BOM.to_vec())).strip_leading_bom();
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn short_non_bom_prefix_surfaces_at_eof() {
        let mut reader = MessageReader::new(Cursor::new(b"Co".to_vec())).strip_leading_bom();
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEof));
    }

    #[test]
    fn bom_split_across_reads() {
        let mut stream = UTF8_BOM.to_vec();
        stream.extend_from_slice(&wire(&[b"split"]));

        let byte_reader = ByteByByteReader {
            bytes: stream,
            pos: 0,
        };
        let mut reader = MessageReader::new(byte_reader).strip_leading_bom();

        let msg = reader.read_message().unwrap().unwrap();
        assert_eq!(msg.body.as_ref(), b"split");
    }

    #[test]
    fn oversized_message_in_stream() {
        let cfg = FramerConfig { max_body_size: 4 };
        let mut reader = MessageReader::with_config(Cursor::new(wire(&[b"too-long"])), cfg);

        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::BodyTooLarge { .. }));
    }

    #[test]
    fn interrupted_read_retries() {
        let inner = InterruptedThenData {
            state: 0,
            bytes: wire(&[b"ok"]),
            pos: 0,
        };
        let mut reader = MessageReader::new(inner);

        let msg = reader.read_message().unwrap().unwrap();
        assert_eq!(msg.body.as_ref(), b"ok");
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let inner = WouldBlockThenData {
            state: 0,
            bytes: wire(&[b"ok"]),
            pos: 0,
        };
        let mut reader = MessageReader::new(inner);

        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = MessageReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _ = reader.config();
        let _inner = reader.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        writer.write_message(b"ping").unwrap();
        let msg = reader.read_message().unwrap().unwrap();

        assert_eq!(msg.body.as_ref(), b"ping");
        assert_eq!(msg.content_length(), Some(4));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
