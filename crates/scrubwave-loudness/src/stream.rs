//! Bounded byte pipe between the audio reader and the analyzer

use std::io::{self, Read};

use bytes::Bytes;
use tokio::sync::mpsc;

/// One chunk of encoded audio, or the read error that ended the stream
pub type Chunk = io::Result<Bytes>;

/// Decoder hints gathered while opening the source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHint {
    /// File extension without the dot, e.g. `mp3`
    pub extension: Option<String>,
    /// MIME type from the response headers, e.g. `audio/mpeg`
    pub mime_type: Option<String>,
}

/// Create a pipe holding at most `capacity` chunks
///
/// The sending side waits once the pipe is full, so a slow analyzer throttles
/// the reader instead of the whole file piling up in memory.
pub fn bounded(capacity: usize, hint: StreamHint) -> (mpsc::Sender<Chunk>, AudioStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, AudioStream { rx, hint })
}

/// Receiving end of the pipe, handed to an analyzer
pub struct AudioStream {
    rx: mpsc::Receiver<Chunk>,
    hint: StreamHint,
}

impl AudioStream {
    pub fn hint(&self) -> &StreamHint {
        &self.hint
    }

    /// Next chunk, or `None` once the reader is done
    pub async fn next_chunk(&mut self) -> Option<Chunk> {
        self.rx.recv().await
    }

    /// Adapt into a blocking [`Read`] for decoders running off the runtime
    ///
    /// Must only be read from a blocking thread (e.g. inside
    /// `tokio::task::spawn_blocking`).
    pub fn into_blocking_reader(self) -> BlockingStreamReader {
        BlockingStreamReader {
            rx: self.rx,
            current: Bytes::new(),
        }
    }
}

/// Synchronous reader over an [`AudioStream`]
pub struct BlockingStreamReader {
    rx: mpsc::Receiver<Chunk>,
    current: Bytes,
}

impl Read for BlockingStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current = self.current.slice(n..);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_reader_concatenates_chunks() {
        let (tx, stream) = bounded(4, StreamHint::default());
        tx.try_send(Ok(Bytes::from_static(b"abc"))).unwrap();
        tx.try_send(Ok(Bytes::new())).unwrap();
        tx.try_send(Ok(Bytes::from_static(b"defg"))).unwrap();
        drop(tx);

        let mut out = Vec::new();
        stream.into_blocking_reader().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdefg");
    }

    #[test]
    fn test_blocking_reader_small_buffer() {
        let (tx, stream) = bounded(2, StreamHint::default());
        tx.try_send(Ok(Bytes::from_static(b"hello"))).unwrap();
        drop(tx);

        let mut reader = stream.into_blocking_reader();
        let mut buf = [0u8; 2];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"he");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_blocking_reader_surfaces_read_error() {
        let (tx, stream) = bounded(2, StreamHint::default());
        tx.try_send(Ok(Bytes::from_static(b"ab"))).unwrap();
        tx.try_send(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
            .unwrap();
        drop(tx);

        let mut out = Vec::new();
        let err = stream.into_blocking_reader().read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(out, b"ab");
    }

    #[tokio::test]
    async fn test_sender_waits_when_pipe_is_full() {
        let (tx, mut stream) = bounded(1, StreamHint::default());
        tx.send(Ok(Bytes::from_static(b"1"))).await.unwrap();
        assert!(tx.try_send(Ok(Bytes::from_static(b"2"))).is_err());

        let first = stream.next_chunk().await.unwrap().unwrap();
        assert_eq!(&first[..], b"1");
        assert!(tx.try_send(Ok(Bytes::from_static(b"2"))).is_ok());
    }
}
