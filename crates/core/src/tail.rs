// crates/core/src/tail.rs
//! Incremental reader for the game client's growing log file.
//!
//! The client appends to one `Client.txt` for months, so the reader never
//! scans from the start on attach: it seeds its offset at the current end of
//! file and hands back only a bounded trailing window for bootstrapping.
//! After that, each poll reads exactly the bytes appended since the last one.
//!
//! Only complete (`\n`-terminated) lines are decoded. An unterminated trailing
//! fragment is kept as raw bytes and joined with the next poll's data, so a
//! marker split across two writes is still seen whole.

use std::io;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::TailError;

/// Default bootstrap window: 128 KiB.
pub const DEFAULT_TAIL_WINDOW: u64 = 128 * 1024;

/// Identity of the file behind the path, used to tell "file replaced" apart
/// from "file grew". `None` on platforms without inode numbers, where only
/// shrinking is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(metadata: &std::fs::Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(_metadata: &std::fs::Metadata) -> Option<Self> {
        None
    }
}

/// Byte offset + identity for incremental tailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TailState {
    identity: Option<FileIdentity>,
    offset: u64,
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The file has not grown.
    Idle,
    /// Newly appended complete lines (possibly empty if only a partial line
    /// arrived).
    Text(String),
    /// The file shrank or was replaced. The offset is back at 0 and the next
    /// poll reads the new file from its start.
    Reset,
    /// The appended bytes were not valid UTF-8. Nothing was consumed; the
    /// next poll re-reads the same range.
    Malformed,
}

/// Tails one log file. Not `Clone`: exactly one poller owns the offset.
#[derive(Debug)]
pub struct TailReader {
    path: PathBuf,
    state: TailState,
    /// Bytes already read past the last newline, not yet decoded.
    pending: Vec<u8>,
    /// Offset of a range that failed to decode once. A second failure at the
    /// same offset is decoded lossily instead of retried forever.
    malformed_at: Option<u64>,
}

impl TailReader {
    /// Open `path`, seed the offset at its current size and return the text
    /// of the last `window` bytes for bootstrapping.
    ///
    /// When the window starts mid-file, everything up to the first line
    /// start inside it is dropped. The byte just before the window is read
    /// too, so a window that begins exactly on a line start keeps that line.
    /// The unterminated last line is held back for the first poll.
    pub async fn attach(path: impl Into<PathBuf>, window: u64) -> Result<(Self, String), TailError> {
        let path = path.into();
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| TailError::io(&path, e))?;
        let metadata = file.metadata().await.map_err(|e| TailError::io(&path, e))?;
        let file_len = metadata.len();
        let start = file_len.saturating_sub(window);
        let read_start = start.saturating_sub(1);

        let buf = read_range(&mut file, read_start, file_len)
            .await
            .map_err(|e| TailError::io(&path, e))?;
        let read_len = buf.len() as u64;

        let mut body: &[u8] = &buf;
        if start > 0 {
            body = match memchr::memchr(b'\n', body) {
                Some(pos) => &body[pos + 1..],
                None => &[],
            };
        }
        let (complete, fragment) = split_complete(body);
        let bootstrap = String::from_utf8_lossy(complete).into_owned();

        tracing::info!(
            path = %path.display(),
            file_len,
            window_bytes = file_len - start,
            "Attached to log file"
        );

        let reader = Self {
            state: TailState {
                identity: FileIdentity::of(&metadata),
                offset: read_start + read_len,
            },
            pending: fragment.to_vec(),
            malformed_at: None,
            path,
        };
        Ok((reader, bootstrap))
    }

    /// Read whatever was appended since the previous call.
    ///
    /// Errors only when the file can no longer be opened or read; the
    /// session must treat that as the end of syncing.
    pub async fn poll(&mut self) -> Result<PollOutcome, TailError> {
        let mut file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| TailError::io(&self.path, e))?;
        let metadata = file.metadata().await.map_err(|e| TailError::io(&self.path, e))?;
        let file_len = metadata.len();
        let identity = FileIdentity::of(&metadata);

        let replaced = matches!(
            (self.state.identity, identity),
            (Some(old), Some(new)) if old != new
        );
        if replaced || file_len < self.state.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.state.offset,
                new_file_len = file_len,
                replaced,
                "Log file shrank or was replaced; resetting to start"
            );
            self.state = TailState {
                identity,
                offset: 0,
            };
            self.pending.clear();
            self.malformed_at = None;
            return Ok(PollOutcome::Reset);
        }

        if file_len == self.state.offset {
            return Ok(PollOutcome::Idle);
        }

        let chunk_start = self.state.offset;
        let buf = read_range(&mut file, chunk_start, file_len)
            .await
            .map_err(|e| TailError::io(&self.path, e))?;
        let new_offset = chunk_start + buf.len() as u64;

        let mut joined = Vec::with_capacity(self.pending.len() + buf.len());
        joined.extend_from_slice(&self.pending);
        joined.extend_from_slice(&buf);
        let (complete, fragment) = split_complete(&joined);

        let text = match std::str::from_utf8(complete) {
            Ok(text) => text.to_owned(),
            Err(e) if self.malformed_at != Some(chunk_start) => {
                tracing::warn!(
                    path = %self.path.display(),
                    offset = chunk_start,
                    error = %e,
                    "Appended bytes are not valid UTF-8; re-reading next poll"
                );
                self.malformed_at = Some(chunk_start);
                return Ok(PollOutcome::Malformed);
            }
            Err(_) => {
                tracing::debug!(offset = chunk_start, "Decoding range lossily after repeated failure");
                String::from_utf8_lossy(complete).into_owned()
            }
        };

        self.pending = fragment.to_vec();
        self.malformed_at = None;
        self.state.offset = new_offset;
        self.state.identity = identity;
        Ok(PollOutcome::Text(text))
    }

    pub fn offset(&self) -> u64 {
        self.state.offset
    }
}

/// Read bytes `[start, end)`; stops early if the file is shorter by now.
async fn read_range(file: &mut tokio::fs::File, start: u64, end: u64) -> io::Result<Vec<u8>> {
    let len = end.saturating_sub(start);
    let mut buf = Vec::with_capacity(len as usize);
    file.seek(io::SeekFrom::Start(start)).await?;
    file.take(len).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Split at the last newline: `(complete lines, trailing fragment)`.
fn split_complete(bytes: &[u8]) -> (&[u8], &[u8]) {
    match memchr::memrchr(b'\n', bytes) {
        Some(pos) => bytes.split_at(pos + 1),
        None => (&[], bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn append(path: &Path, data: &[u8]) {
        let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(data).unwrap();
        f.flush().unwrap();
    }

    #[tokio::test]
    async fn attach_seeds_offset_at_end_of_file() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "line1\nline2\n").unwrap();
        f.flush().unwrap();

        let (mut reader, bootstrap) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();
        assert_eq!(bootstrap, "line1\nline2\n");
        assert_eq!(reader.offset(), 12);
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Idle);
    }

    #[tokio::test]
    async fn attach_reads_only_the_trailing_window() {
        let mut f = NamedTempFile::new().unwrap();
        for i in 0..1000 {
            writeln!(f, "line{i:04}").unwrap();
        }
        f.flush().unwrap();

        // 9 bytes per line; a 40-byte window starts mid-line.
        let (reader, bootstrap) = TailReader::attach(f.path(), 40).await.unwrap();
        assert_eq!(bootstrap, "line0996\nline0997\nline0998\nline0999\n");
        assert_eq!(reader.offset(), 9000);
    }

    #[tokio::test]
    async fn attach_keeps_first_line_when_window_starts_on_a_line() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "old\n[SCENE] Set Source [The Coast]\n").unwrap();
        f.flush().unwrap();

        // Exactly the second line: the window begins right after "old\n".
        let (reader, bootstrap) = TailReader::attach(f.path(), 31).await.unwrap();
        assert_eq!(bootstrap, "[SCENE] Set Source [The Coast]\n");
        assert_eq!(reader.offset(), 35);

        // One byte short of the line start: that line is cut and dropped.
        let (_, bootstrap) = TailReader::attach(f.path(), 30).await.unwrap();
        assert_eq!(bootstrap, "");
    }

    #[tokio::test]
    async fn attach_holds_back_unterminated_last_line() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "done\n[SCENE] Set So").unwrap();
        f.flush().unwrap();

        let (mut reader, bootstrap) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();
        assert_eq!(bootstrap, "done\n");

        append(f.path(), b"urce [The Coast]\n");
        assert_eq!(
            reader.poll().await.unwrap(),
            PollOutcome::Text("[SCENE] Set Source [The Coast]\n".into())
        );
    }

    #[tokio::test]
    async fn attach_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = TailReader::attach(dir.path().join("Client.txt"), DEFAULT_TAIL_WINDOW)
            .await
            .unwrap_err();
        assert!(matches!(err, TailError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn poll_returns_only_appended_text() {
        let f = NamedTempFile::new().unwrap();
        let (mut reader, bootstrap) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();
        assert!(bootstrap.is_empty());

        append(f.path(), b"a\nb\n");
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Text("a\nb\n".into()));
        append(f.path(), b"c\n");
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Text("c\n".into()));
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Idle);
        assert_eq!(reader.offset(), 6);
    }

    #[tokio::test]
    async fn partial_line_advances_offset_but_is_not_decoded() {
        let f = NamedTempFile::new().unwrap();
        let (mut reader, _) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();

        append(f.path(), b"partial");
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Text(String::new()));
        assert_eq!(reader.offset(), 7);

        append(f.path(), b" line\nnext");
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Text("partial line\n".into()));
        assert_eq!(reader.offset(), 17);
    }

    #[tokio::test]
    async fn shrink_resets_then_reads_from_start() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "original-line1\noriginal-line2\n").unwrap();
        f.flush().unwrap();
        let (mut reader, _) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();

        // Truncate in place (same inode) and write shorter content.
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(f.path())
                .unwrap();
            write!(file, "new\n").unwrap();
        }

        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Reset);
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Text("new\n".into()));
        assert_eq!(reader.offset(), 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn replaced_file_resets_even_when_larger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Client.txt");
        std::fs::write(&path, "old\n").unwrap();
        let (mut reader, _) = TailReader::attach(&path, DEFAULT_TAIL_WINDOW).await.unwrap();

        // Rotate: a new file with a new inode takes the path. Create the
        // replacement before removing the original so the inode cannot be
        // recycled.
        let rotated = dir.path().join("Client.txt.new");
        std::fs::write(&rotated, "replacement line one\nreplacement line two\n").unwrap();
        std::fs::rename(&rotated, &path).unwrap();

        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Reset);
        assert_eq!(
            reader.poll().await.unwrap(),
            PollOutcome::Text("replacement line one\nreplacement line two\n".into())
        );
    }

    #[tokio::test]
    async fn deleted_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Client.txt");
        std::fs::write(&path, "x\n").unwrap();
        let (mut reader, _) = TailReader::attach(&path, DEFAULT_TAIL_WINDOW).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        let err = reader.poll().await.unwrap_err();
        assert!(matches!(err, TailError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn invalid_utf8_is_retried_then_decoded_lossily() {
        let f = NamedTempFile::new().unwrap();
        let (mut reader, _) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();

        append(f.path(), b"bad \xff byte\n");
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Malformed);
        assert_eq!(reader.offset(), 0);

        // Same bytes again: decoded lossily rather than stuck forever.
        match reader.poll().await.unwrap() {
            PollOutcome::Text(text) => assert!(text.starts_with("bad ") && text.ends_with(" byte\n")),
            other => panic!("expected lossy text, got {other:?}"),
        }
        assert_eq!(reader.offset(), 11);
    }

    #[tokio::test]
    async fn multibyte_text_split_across_polls_survives() {
        let f = NamedTempFile::new().unwrap();
        let (mut reader, _) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();

        let line = "[SCENE] Set Source [죄수의 문]\n".as_bytes();
        let cut = line.len() - 4; // inside the last Hangul syllable
        append(f.path(), &line[..cut]);
        assert_eq!(reader.poll().await.unwrap(), PollOutcome::Text(String::new()));
        append(f.path(), &line[cut..]);
        assert_eq!(
            reader.poll().await.unwrap(),
            PollOutcome::Text("[SCENE] Set Source [죄수의 문]\n".into())
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn offset_tracks_total_bytes_appended(
            initial in proptest::collection::vec(any::<u8>(), 0..256),
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..128), 1..8),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let f = NamedTempFile::new().unwrap();
                append(f.path(), &initial);
                let (mut reader, _) = TailReader::attach(f.path(), DEFAULT_TAIL_WINDOW).await.unwrap();
                let mut expected = initial.len() as u64;
                prop_assert_eq!(reader.offset(), expected);

                for chunk in &chunks {
                    append(f.path(), chunk);
                    expected += chunk.len() as u64;
                    // Invalid UTF-8 is retried once, then consumed.
                    for _ in 0..2 {
                        if reader.poll().await.unwrap() != PollOutcome::Malformed {
                            break;
                        }
                    }
                    prop_assert_eq!(reader.offset(), expected);
                }
                Ok(())
            })?;
        }
    }
}
