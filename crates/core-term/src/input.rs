//! Keyboard byte retrieval with a poll-based timeout.
//!
//! No key decoding happens here: callers get raw bytes from stdin, one at a
//! time. A single pushback slot exists, and it only accepts the byte most
//! recently handed out.

use std::io;
use std::os::fd::{AsFd, AsRawFd};

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

use crate::Error;

#[derive(Default)]
pub(crate) struct KeyReader {
    last: Option<u8>,
    stored: Option<u8>,
}

impl KeyReader {
    /// Wait up to `msec` milliseconds (<= 0 waits indefinitely) for one
    /// byte from stdin. Interrupted waits and reads are retried.
    pub(crate) fn get(&mut self, msec: i32) -> Result<u8, Error> {
        if let Some(key) = self.stored.take() {
            self.last = Some(key);
            return Ok(key);
        }

        let stdin = io::stdin();
        let timeout = if msec > 0 {
            PollTimeout::try_from(msec).unwrap_or(PollTimeout::MAX)
        } else {
            PollTimeout::NONE
        };

        loop {
            let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, timeout) {
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(Error::Os(e)),
                Ok(0) => return Err(Error::Timeout),
                Ok(_) => break,
            }
        }

        loop {
            let mut buf = [0u8; 1];
            match nix::unistd::read(stdin.as_raw_fd(), &mut buf) {
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(Error::Os(e)),
                Ok(0) => return Err(Error::Eof),
                Ok(_) => {
                    self.last = Some(buf[0]);
                    return Ok(buf[0]);
                }
            }
        }
    }

    /// Push a byte back for the next `get`. Only the most recently
    /// returned byte is accepted.
    pub(crate) fn unget(&mut self, key: u8) -> Result<(), Error> {
        if self.last == Some(key) {
            self.stored = Some(key);
            Ok(())
        } else {
            Err(Error::BadArg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unget_accepts_only_the_last_key() {
        let mut reader = KeyReader::default();
        assert!(matches!(reader.unget(b'a'), Err(Error::BadArg)));
        reader.last = Some(b'a');
        assert!(reader.unget(b'a').is_ok());
        // The slot is one key deep: a second unget of the same key is fine,
        // but only after it has been read again.
        assert_eq!(reader.get(0).unwrap(), b'a');
        assert!(reader.unget(b'a').is_ok());
        assert!(matches!(reader.unget(b'b'), Err(Error::BadArg)));
    }
}
