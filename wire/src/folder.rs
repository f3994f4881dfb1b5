//! The folder-message codec.
//!
//! A folder-message is an ordered record list followed by a payload:
//!
//! ```text
//! <N> <path>@<size|-1> <path>@<size|-1> ... <payload>
//! ```
//!
//! Directory records carry `-1` and no payload. File records carry their byte
//! length, and their contents appear in the payload in record order. Nothing in
//! the payload is tagged, so decoding relies entirely on record order.

use crate::error::{Result, WireError};
use bytes::{BufMut, Bytes, BytesMut};

const DIRECTORY_MARKER: &[u8] = b"-1";
const ROOT_RECORD: &str = ".";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File(Bytes),
}

/// One record of a folder-message. `path` is relative to the tree root and
/// uses `/` as separator regardless of host platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderEntry {
    path: String,
    kind: EntryKind,
}

impl FolderEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    fn size_token(&self) -> String {
        match &self.kind {
            EntryKind::Directory => "-1".to_string(),
            EntryKind::File(contents) => contents.len().to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderMessage {
    entries: Vec<FolderEntry>,
}

impl FolderMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FolderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push_dir(&mut self, path: impl Into<String>) -> Result<()> {
        self.push(path.into(), EntryKind::Directory)
    }

    pub fn push_file(&mut self, path: impl Into<String>, contents: impl Into<Bytes>) -> Result<()> {
        self.push(path.into(), EntryKind::File(contents.into()))
    }

    fn push(&mut self, path: String, kind: EntryKind) -> Result<()> {
        validate_path(&path)?;
        self.entries.push(FolderEntry { path, kind });
        Ok(())
    }

    /// Total number of payload bytes carried by file records.
    pub fn payload_len(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match &entry.kind {
                EntryKind::File(contents) => contents.len(),
                EntryKind::Directory => 0,
            })
            .sum()
    }

    /// Exact size of the encoded message.
    pub fn encoded_len(&self) -> usize {
        let header: usize = self
            .entries
            .iter()
            .map(|entry| 1 + entry.path.len() + 1 + entry.size_token().len())
            .sum();
        self.entries.len().to_string().len() + header + 1 + self.payload_len()
    }

    /// Serialize into a single message of at most `max_bytes` bytes.
    pub fn encode(&self, max_bytes: usize) -> Result<Bytes> {
        let size = self.encoded_len();
        if size > max_bytes {
            return Err(WireError::MessageTooLarge {
                size,
                limit: max_bytes,
            });
        }

        let mut buf = BytesMut::with_capacity(size);
        buf.put_slice(self.entries.len().to_string().as_bytes());
        for entry in &self.entries {
            buf.put_u8(b' ');
            buf.put_slice(entry.path.as_bytes());
            buf.put_u8(b'@');
            buf.put_slice(entry.size_token().as_bytes());
        }
        buf.put_u8(b' ');
        for entry in &self.entries {
            if let EntryKind::File(contents) = &entry.kind {
                buf.put_slice(contents);
            }
        }
        debug_assert_eq!(buf.len(), size);
        Ok(buf.freeze())
    }

    /// Parse a complete message. File contents are sliced out of `message`
    /// without copying.
    pub fn decode(message: Bytes) -> Result<Self> {
        let mut cursor = 0;
        let count_token = next_token(&message, &mut cursor, b' ', "entry count")?;
        let count = parse_len(count_token, "entry count")?;

        // (path, None) is a directory, (path, Some(n)) a file of n bytes
        let mut records = Vec::new();
        for _ in 0..count {
            let path = next_token(&message, &mut cursor, b'@', "entry path")?;
            let path = std::str::from_utf8(path)
                .map_err(|_| WireError::format("entry path is not valid UTF-8"))?
                .to_string();
            let size = next_token(&message, &mut cursor, b' ', "entry size")?;
            let size = if size == DIRECTORY_MARKER {
                None
            } else {
                Some(parse_len(size, "entry size")?)
            };
            records.push((path, size));
        }

        let mut folder = FolderMessage::new();
        for (path, size) in records {
            match size {
                // older encoders list the root itself first
                None if path == ROOT_RECORD => {}
                None => folder.push_dir(path)?,
                Some(size) => {
                    let end = cursor
                        .checked_add(size)
                        .filter(|end| *end <= message.len())
                        .ok_or_else(|| {
                            WireError::format(format!("payload for {path} is truncated"))
                        })?;
                    folder.push_file(path, message.slice(cursor..end))?;
                    cursor = end;
                }
            }
        }

        if cursor != message.len() {
            return Err(WireError::format(format!(
                "{} unexpected trailing payload bytes",
                message.len() - cursor
            )));
        }
        Ok(folder)
    }
}

/// Return the bytes from `cursor` up to `delimiter` and move past it.
fn next_token<'a>(
    message: &'a [u8],
    cursor: &mut usize,
    delimiter: u8,
    what: &str,
) -> Result<&'a [u8]> {
    let rest = &message[*cursor..];
    let end = rest
        .iter()
        .position(|b| *b == delimiter)
        .ok_or_else(|| WireError::format(format!("missing delimiter after {what}")))?;
    *cursor += end + 1;
    Ok(&rest[..end])
}

fn parse_len(token: &[u8], what: &str) -> Result<usize> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return Err(WireError::format(format!(
            "{what} {:?} is not a number",
            String::from_utf8_lossy(token)
        )));
    }
    std::str::from_utf8(token)
        .ok()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| WireError::format(format!("{what} is out of range")))
}

/// Record paths must stay inside the tree root and must not contain the
/// record delimiters.
fn validate_path(path: &str) -> Result<()> {
    if path.contains('@') {
        return Err(WireError::format(format!("path {path:?} contains '@'")));
    }
    if path.contains('\0') || path.contains('\\') {
        return Err(WireError::format(format!(
            "path {path:?} contains a reserved character"
        )));
    }
    let escapes = path
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..");
    if escapes {
        return Err(WireError::format(format!(
            "path {path:?} is not a plain relative path"
        )));
    }
    Ok(())
}
