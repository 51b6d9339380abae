use bytes::Bytes;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Hard cap on the number of elements in one multibulk request.
pub const MAX_MULTIBULK_ARGS: i64 = 20;
/// Hard cap on a single bulk argument (64 KiB).
pub const MAX_BULK_LEN: usize = 64 * 1024;
/// Hard cap on one inline (telnet-style) request line (1 KiB).
pub const MAX_INLINE_LEN: usize = 1024;

const INITIAL_BUF_SIZE: usize = 64 * 1024;

/// A malformed request frame. Fatal to the offending connection only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid multibulk length")]
    BadMultibulkCount,

    #[error("invalid bulk length")]
    BadBulkLength,

    #[error("expected '$', got '{}'", *.0 as char)]
    ExpectedBulkMarker(u8),

    #[error("expected number")]
    ExpectedNumber,

    #[error("expected CRLF")]
    ExpectedCrlf,

    #[error("too big inline request")]
    InlineTooLong,
}

enum ReadError {
    Io(io::Error),
    Protocol(ProtocolError),
}

impl From<ProtocolError> for ReadError {
    fn from(e: ProtocolError) -> Self {
        ReadError::Protocol(e)
    }
}

/// Streaming request reader: turns a connection's byte stream into a lazy
/// sequence of commands, each a list of binary-safe argument byte strings.
///
/// The sequence ends only when the transport does: `next_command` yields
/// `Ok(None)` on clean end-of-stream or a transport error, and
/// `Err(ProtocolError)` on a malformed frame. At most one command is parsed
/// per call; the caller paces consumption.
///
/// The reader owns one growable buffer with separate parse and write cursors.
/// Whenever a parse step needs more bytes than are buffered it awaits a fill
/// of at least the shortfall, growing the buffer as needed; once the buffer
/// is fully consumed both cursors reset so it does not grow without bound.
pub struct CommandReader<R> {
    rd: R,
    buf: Vec<u8>,
    parse_pos: usize,
    write_pos: usize,
}

impl<R: AsyncRead + Unpin> CommandReader<R> {
    pub fn new(rd: R) -> Self {
        CommandReader {
            rd,
            buf: vec![0; INITIAL_BUF_SIZE],
            parse_pos: 0,
            write_pos: 0,
        }
    }

    /// Read the next command. A request of `*-1\r\n` (null array) or an empty
    /// inline line yields an empty argument list, which callers skip.
    pub async fn next_command(&mut self) -> Result<Option<Vec<Bytes>>, ProtocolError> {
        let result = self.read_command().await;
        if self.parse_pos >= self.write_pos {
            self.parse_pos = 0;
            self.write_pos = 0;
        }
        match result {
            Ok(argv) => Ok(Some(argv)),
            Err(ReadError::Io(_)) => Ok(None),
            Err(ReadError::Protocol(e)) => Err(e),
        }
    }

    async fn read_command(&mut self) -> Result<Vec<Bytes>, ReadError> {
        if self.parse_pos >= self.write_pos {
            self.read_some(1).await?;
        }
        if self.buf[self.parse_pos] == b'*' {
            self.read_multibulk().await
        } else {
            self.read_inline().await
        }
    }

    /// Multibulk mode: `*<count>\r\n` followed by `count` bulk elements.
    async fn read_multibulk(&mut self) -> Result<Vec<Bytes>, ReadError> {
        self.parse_pos += 1; // consume '*'
        let count = self.read_number().await?;
        self.expect_crlf().await?;

        if count == -1 {
            // Null array: an empty command.
            return Ok(Vec::new());
        }
        if count < -1 || count > MAX_MULTIBULK_ARGS {
            return Err(ProtocolError::BadMultibulkCount.into());
        }

        let mut argv = Vec::with_capacity(count as usize);
        for _ in 0..count {
            self.require(1).await?;
            let marker = self.buf[self.parse_pos];
            if marker != b'$' {
                return Err(ProtocolError::ExpectedBulkMarker(marker).into());
            }
            self.parse_pos += 1;

            let len = self.read_number().await?;
            self.expect_crlf().await?;
            match len {
                -1 => argv.push(Bytes::new()), // null element
                0 => {
                    argv.push(Bytes::new());
                    self.expect_crlf().await?;
                }
                l if l > 0 && (l as usize) <= MAX_BULK_LEN => {
                    let l = l as usize;
                    self.require(l).await?;
                    argv.push(Bytes::copy_from_slice(
                        &self.buf[self.parse_pos..self.parse_pos + l],
                    ));
                    self.parse_pos += l;
                    self.expect_crlf().await?;
                }
                _ => return Err(ProtocolError::BadBulkLength.into()),
            }
        }
        Ok(argv)
    }

    /// Inline (telnet) mode: one line up to `\n`, arguments separated by
    /// single spaces. The whole buffered input is treated as consumed — no
    /// pipelining in this mode.
    async fn read_inline(&mut self) -> Result<Vec<Bytes>, ReadError> {
        let nl = loop {
            if let Some(pos) = self.buf[self.parse_pos..self.write_pos]
                .iter()
                .position(|&b| b == b'\n')
            {
                break self.parse_pos + pos;
            }
            if self.write_pos - self.parse_pos > MAX_INLINE_LEN {
                return Err(ProtocolError::InlineTooLong.into());
            }
            self.read_some(1).await?;
        };

        let mut line = &self.buf[self.parse_pos..nl];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        let argv = if line.is_empty() {
            Vec::new()
        } else {
            line.split(|&b| b == b' ').map(Bytes::copy_from_slice).collect()
        };
        self.parse_pos = self.write_pos;
        Ok(argv)
    }

    /// Read a signed decimal, filling the buffer as digits keep arriving.
    async fn read_number(&mut self) -> Result<i64, ReadError> {
        self.require(1).await?;
        let mut neg = false;
        match self.buf[self.parse_pos] {
            b'-' => {
                neg = true;
                self.parse_pos += 1;
            }
            b'+' => {
                self.parse_pos += 1;
            }
            _ => {}
        }

        let start = self.parse_pos;
        let mut num: i64 = 0;
        loop {
            while self.parse_pos < self.write_pos {
                let c = self.buf[self.parse_pos];
                if c.is_ascii_digit() {
                    num = num.saturating_mul(10).saturating_add((c - b'0') as i64);
                    self.parse_pos += 1;
                } else {
                    if self.parse_pos == start {
                        return Err(ProtocolError::ExpectedNumber.into());
                    }
                    return Ok(if neg { -num } else { num });
                }
            }
            self.read_some(1).await?;
        }
    }

    async fn expect_crlf(&mut self) -> Result<(), ReadError> {
        self.require(2).await?;
        if self.buf[self.parse_pos] == b'\r' && self.buf[self.parse_pos + 1] == b'\n' {
            self.parse_pos += 2;
            Ok(())
        } else {
            Err(ProtocolError::ExpectedCrlf.into())
        }
    }

    /// Ensure at least `num` unparsed bytes are buffered, filling if short.
    async fn require(&mut self, num: usize) -> Result<(), ReadError> {
        let available = self.write_pos - self.parse_pos;
        if available >= num {
            return Ok(());
        }
        self.read_some(num - available).await
    }

    /// Read at least `min` more bytes from the transport.
    async fn read_some(&mut self, min: usize) -> Result<(), ReadError> {
        self.grow_for(min);
        let mut got = 0;
        while got < min {
            let n = self
                .rd
                .read(&mut self.buf[self.write_pos..])
                .await
                .map_err(ReadError::Io)?;
            if n == 0 {
                return Err(ReadError::Io(io::ErrorKind::UnexpectedEof.into()));
            }
            self.write_pos += n;
            got += n;
        }
        Ok(())
    }

    /// Make room for `need` more bytes past the write cursor: double the
    /// buffer, or extend by the shortfall plus slack, whichever is larger.
    fn grow_for(&mut self, need: usize) {
        let cap = self.buf.len();
        if self.write_pos + need > cap {
            let new_cap = (cap * 2).max(cap + need + INITIAL_BUF_SIZE);
            self.buf.resize(new_cap, 0);
        }
    }
}
