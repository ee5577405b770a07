//! Command tailer: turns lines appended to the command file into commands.
//!
//! The file is polled rather than watched. Each poll stats the file, reads
//! the byte range `[offset, size)` it hasn't consumed yet, hands every
//! non-empty line to the caller in file order, then truncates the file back
//! to zero so the writer keeps appending from a known offset.
//!
//! A trailing line without its newline is held back for one poll: the complete
//! lines before it are handled and the cursor stops just past the last
//! newline. If the file hasn't grown by the next poll, the fragment is taken
//! as a complete line.
//!
//! If a truncate fails the cursor still goes back to zero, but the tailer
//! remembers how many bytes it had handed out and skips past them on the
//! next poll, so nothing is shown twice.

use std::{
    fs,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use jiff::civil::Date;
use tracing::{debug, info, warn};

use crate::{
    model::Command,
    storage::{Result, dated_path, ensure_file},
};

/// A command line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// The trimmed line, untruncated.
    pub line: String,
    pub error: String,
}

/// One line's worth of tailer output.
pub type LineOutcome = core::result::Result<Command, ParseFailure>;

/// Tails the dated command file.
pub struct CommandTailer {
    base: PathBuf,
    date: Date,
    path: PathBuf,
    /// Bytes of the current file already handed out.
    offset: u64,
    /// File size at which an unterminated trailing line was last seen.
    held: Option<u64>,
    /// Bytes already handed out of a file that could not be truncated.
    skip: Option<u64>,
    #[cfg(test)]
    fail_truncate: bool,
}

impl CommandTailer {
    /// Opens the command file for `date`, discarding anything queued before
    /// the tailer existed.
    pub fn open(base: impl Into<PathBuf>, date: Date) -> Self {
        let base = base.into();
        let path = dated_path(&base, date);
        let mut tailer = Self {
            base,
            date,
            path,
            offset: 0,
            held: None,
            skip: None,
            #[cfg(test)]
            fail_truncate: false,
        };
        if let Err(e) = ensure_file(&tailer.path) {
            warn!(path = %tailer.path.display(), error = %e, "failed to create command file");
        }
        match fs::metadata(&tailer.path) {
            Ok(meta) if meta.len() > 0 => {
                info!(
                    path = %tailer.path.display(),
                    bytes = meta.len(),
                    "discarding commands queued before startup"
                );
                tailer.truncate(meta.len());
            }
            _ => {}
        }
        tailer
    }

    /// The command file currently being tailed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed from the current file.
    #[cfg(test)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[cfg(test)]
    pub(crate) fn seek(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Runs one poll tick, handing each new line to `handle` in file order.
    ///
    /// When `date` differs from the file being tailed, the old file gets a
    /// final drain and the tailer moves on to the new day's file.
    /// Returns the number of lines handled. Stat and read failures are
    /// returned for the caller to retry on the next tick; the cursor is
    /// left untouched by them.
    pub fn poll(&mut self, date: Date, mut handle: impl FnMut(LineOutcome)) -> Result<usize> {
        let mut handled = 0;
        if date != self.date {
            match self.drain(&mut handle) {
                Ok(n) => handled += n,
                Err(e) => warn!(path = %self.path.display(), error = %e, "final drain before rollover failed"),
            }
            self.date = date;
            self.path = dated_path(&self.base, date);
            self.offset = 0;
            self.held = None;
            self.skip = None;
            info!(path = %self.path.display(), "command file rolled over");
            ensure_file(&self.path)?;
        }
        handled += self.drain(&mut handle)?;
        Ok(handled)
    }

    fn drain(&mut self, handle: &mut impl FnMut(LineOutcome)) -> Result<usize> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.offset = 0;
                self.held = None;
                self.skip = None;
                ensure_file(&self.path)?;
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(skip) = self.skip.take()
            && size >= skip
        {
            debug!(skip, "skipping bytes left behind by a failed truncate");
            self.offset = skip;
        }

        if size < self.offset {
            debug!(size, offset = self.offset, "command file shrank; rereading from start");
            self.offset = 0;
            self.held = None;
        }
        if size == self.offset {
            return Ok(0);
        }

        let data = self.read_range(size)?;
        let complete_len = data.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let has_fragment = complete_len < data.len();
        let flush_fragment = has_fragment && self.held == Some(size);
        let body = if flush_fragment {
            &data[..]
        } else {
            &data[..complete_len]
        };

        let mut handled = 0;
        for line in String::from_utf8_lossy(body).split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            handled += 1;
            handle(Command::parse(line).map_err(|e| ParseFailure {
                line: line.to_string(),
                error: e.to_string(),
            }));
        }

        if has_fragment && !flush_fragment {
            self.offset += complete_len as u64;
            self.held = Some(size);
            debug!(
                offset = self.offset,
                size, "holding unterminated trailing line until the next poll"
            );
        } else {
            let consumed = self.offset + data.len() as u64;
            self.truncate(consumed);
        }
        Ok(handled)
    }

    /// Reads `[offset, size)`. May return fewer bytes if the file shrank meanwhile.
    fn read_range(&self, size: u64) -> io::Result<Vec<u8>> {
        let mut file = fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut data = Vec::new();
        file.take(size - self.offset).read_to_end(&mut data)?;
        Ok(data)
    }

    /// Empties the file once its first `consumed` bytes have been handled.
    ///
    /// The cursor is reset even when the truncate fails. The consumed bytes
    /// are then skipped on the next poll instead of being handed out again.
    fn truncate(&mut self, consumed: u64) {
        if let Err(e) = self.truncate_file() {
            warn!(path = %self.path.display(), error = %e, consumed, "failed to truncate command file");
            self.skip = Some(consumed);
        }
        self.offset = 0;
        self.held = None;
    }

    fn truncate_file(&self) -> io::Result<()> {
        #[cfg(test)]
        if self.fail_truncate {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "truncate refused"));
        }
        fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.set_len(0))
    }
}
