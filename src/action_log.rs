use crate::action::Action;
use crate::archive;
use crate::error::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "actions.jsonl";
const ARCHIVE_FILE: &str = "archive.jsonl.zst";
const LOCK_FILE: &str = ".lock";
const SCAN_CHUNK: u64 = 8192;

/// Whether an [`ActionLog`] takes an exclusive lock on its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Hold an exclusive advisory lock for the lifetime of the log.
    #[default]
    Exclusive,
    /// No locking. The caller guarantees a single writer.
    None,
}

/// Where an appended action landed in the active log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// Byte offset where the line starts.
    pub offset: u64,
    /// Byte offset just past the line's newline.
    pub end: u64,
    /// [`line_hash`] of the line.
    pub hash: String,
}

/// Append-only log of dispatched actions.
///
/// The active segment `actions.jsonl` holds one JSON action per line.
/// [`rotate`](ActionLog::rotate) moves it into `archive.jsonl.zst` as a
/// compressed frame.
pub struct ActionLog {
    dir: PathBuf,
    log_path: PathBuf,
    archive_path: PathBuf,
    file: File,
    _lock: Option<File>,
}

/// Compute xxh64 hash of raw line bytes (without trailing newline), hex-encoded.
pub fn line_hash(line: &[u8]) -> String {
    let hash = xxhash_rust::xxh64::xxh64(line, 0);
    format!("{:016x}", hash)
}

impl ActionLog {
    /// Open or create an action log in `dir` with an exclusive lock.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_lock(dir, LockMode::Exclusive)
    }

    /// Open or create an action log in `dir`.
    ///
    /// Creates the directory if needed. A trailing partial line left by a
    /// crash mid-append is truncated away so later appends start on a line
    /// boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Locked`] if `mode` is [`LockMode::Exclusive`] and
    /// another log already holds the directory.
    pub fn open_with_lock(dir: impl AsRef<Path>, mode: LockMode) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let log_path = dir.join(LOG_FILE);
        let archive_path = dir.join(ARCHIVE_FILE);

        fs::create_dir_all(&dir)?;

        let lock = match mode {
            LockMode::Exclusive => Some(acquire_lock(&dir.join(LOCK_FILE))?),
            LockMode::None => None,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&log_path)?;

        let log = ActionLog {
            dir,
            log_path,
            archive_path,
            file,
            _lock: lock,
        };
        log.truncate_partial_tail()?;
        Ok(log)
    }

    /// Append an action to the active log.
    ///
    /// Serializes the action as a single JSON line, appends it and syncs to
    /// disk before returning.
    pub fn append(&mut self, action: &Action) -> Result<Appended> {
        let offset = self.file.seek(SeekFrom::End(0))?;
        let json = serde_json::to_string(action)?;
        writeln!(self.file, "{json}")?;
        self.file.sync_data()?;
        Ok(Appended {
            offset,
            end: offset + json.len() as u64 + 1,
            hash: line_hash(json.as_bytes()),
        })
    }

    /// Read actions from the active log starting at the given byte offset.
    ///
    /// Yields `(action, next_byte_offset, line_hash)` for each complete line.
    /// Empty lines and a trailing partial line are skipped.
    pub fn read_from(
        &self,
        offset: u64,
    ) -> Result<impl Iterator<Item = Result<(Action, u64, String)>> + use<>> {
        let mut file = File::open(&self.log_path)?;
        file.seek(SeekFrom::Start(offset))?;

        let file_len = file.metadata()?.len();
        let reader = BufReader::new(file);

        Ok(LogIterator {
            lines: reader.split(b'\n'),
            pos: offset,
            file_len,
        })
    }

    /// Read every action ever logged: the archive, then the active log.
    ///
    /// Yields `(action, line_hash)`.
    pub fn read_full(&self) -> Result<impl Iterator<Item = Result<(Action, String)>> + use<>> {
        let archived: Box<dyn Iterator<Item = Result<(Action, String)>>> =
            match archive::open_archive_reader(&self.archive_path)? {
                Some(reader) => Box::new(ArchiveIterator {
                    lines: reader.split(b'\n'),
                    pos: 0,
                }),
                None => Box::new(std::iter::empty()),
            };
        let active = self
            .read_from(0)?
            .map(|r| r.map(|(action, _, hash)| (action, hash)));
        Ok(archived.chain(active))
    }

    /// Compress the active log into the archive and truncate it.
    ///
    /// Offsets into the active log taken before rotation are invalid
    /// afterwards. A crash between the archive write and the truncation
    /// leaves the same actions in both files.
    pub fn rotate(&mut self) -> Result<()> {
        let mut contents = Vec::new();
        File::open(&self.log_path)?.read_to_end(&mut contents)?;
        if contents.is_empty() {
            return Ok(());
        }

        archive::append_compressed_frame(&self.archive_path, &contents)?;
        self.file.set_len(0)?;
        self.file.sync_all()?;
        log::debug!(
            "statefold: rotated {} bytes into {}",
            contents.len(),
            self.archive_path.display()
        );
        Ok(())
    }

    /// Returns the path to the log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path to the active log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Returns the path to the archive file.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Returns the current size in bytes of the active log file.
    pub fn active_log_size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.log_path)?.len())
    }

    /// Read the line immediately before the given byte offset and return its hash.
    ///
    /// The offset should point to the byte after the newline of the last consumed line.
    /// Lines of any length are hashed whole.
    /// Returns `None` if offset is 0 or beyond the end of the file.
    pub fn read_line_hash_before(&self, offset: u64) -> Result<Option<String>> {
        if offset == 0 {
            return Ok(None);
        }

        let mut file = File::open(&self.log_path)?;
        let file_len = file.metadata()?.len();

        if offset > file_len {
            return Ok(None);
        }

        // offset - 1 is the '\n' ending the previous line
        let newline_pos = offset - 1;
        let mut start = 0u64;
        let mut end = newline_pos;
        let mut buf = vec![0u8; SCAN_CHUNK as usize];

        while end > 0 {
            let scan_start = end.saturating_sub(SCAN_CHUNK);
            let chunk = &mut buf[..(end - scan_start) as usize];
            file.seek(SeekFrom::Start(scan_start))?;
            file.read_exact(chunk)?;

            if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
                start = scan_start + pos as u64 + 1;
                break;
            }
            end = scan_start;
        }

        file.seek(SeekFrom::Start(start))?;
        let mut line_buf = vec![0u8; (newline_pos - start) as usize];
        file.read_exact(&mut line_buf)?;

        Ok(Some(line_hash(&line_buf)))
    }

    fn truncate_partial_tail(&self) -> Result<()> {
        let len = self.active_log_size()?;
        if len == 0 {
            return Ok(());
        }

        let mut file = File::open(&self.log_path)?;
        let scan_start = len.saturating_sub(64 * 1024);
        file.seek(SeekFrom::Start(scan_start))?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail)?;

        if tail.last() == Some(&b'\n') {
            return Ok(());
        }

        let keep = match tail.iter().rposition(|&b| b == b'\n') {
            Some(pos) => scan_start + pos as u64 + 1,
            None if scan_start == 0 => 0,
            // Last line longer than the scan window; leave it for the reader to skip.
            None => return Ok(()),
        };
        log::warn!(
            "statefold: dropping {} bytes of partial action at end of {}",
            len - keep,
            self.log_path.display()
        );
        self.file.set_len(keep)?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl std::fmt::Debug for ActionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionLog")
            .field("dir", &self.dir)
            .field("locked", &self._lock.is_some())
            .finish()
    }
}

fn acquire_lock(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(Error::Locked {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

fn parse_line(line: &[u8], offset: u64) -> Result<Action> {
    serde_json::from_slice(line).map_err(|source| Error::Corrupt { offset, source })
}

struct LogIterator<I> {
    lines: I,
    pos: u64,
    file_len: u64,
}

impl<I: Iterator<Item = io::Result<Vec<u8>>>> Iterator for LogIterator<I> {
    type Item = Result<(Action, u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };

            let line_bytes = line.len() as u64;

            // A line that runs to EOF without a newline is a partial append.
            if self.pos + line_bytes >= self.file_len {
                return None;
            }

            let next_pos = self.pos + line_bytes + 1;

            if line.is_empty() {
                self.pos = next_pos;
                continue;
            }

            let hash = line_hash(&line);
            let action = match parse_line(&line, self.pos) {
                Ok(a) => a,
                Err(e) => return Some(Err(e)),
            };

            self.pos = next_pos;
            return Some(Ok((action, next_pos, hash)));
        }
    }
}

struct ArchiveIterator<I> {
    lines: I,
    pos: u64,
}

impl<I: Iterator<Item = io::Result<Vec<u8>>>> Iterator for ArchiveIterator<I> {
    type Item = Result<(Action, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            let offset = self.pos;
            self.pos += line.len() as u64 + 1;
            if line.is_empty() {
                continue;
            }
            let hash = line_hash(&line);
            return Some(parse_line(&line, offset).map(|action| (action, hash)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_hash_is_fixed_width_hex() {
        let h = line_hash(b"{\"type\":\"A\"}");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, line_hash(b"{\"type\":\"A\"}"));
        assert_ne!(h, line_hash(b"{\"type\":\"B\"}"));
    }
}
