//! Moves directory trees between disk and [`FolderMessage`]s.
//!
//! Everything here is blocking file I/O. Async callers should go through
//! `tokio::task::spawn_blocking`.

use crate::error::{Result, WireError};
use crate::folder::{EntryKind, FolderMessage};
use bytes::Bytes;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Read the tree rooted at `root` into a folder-message.
///
/// Entries come out depth first, each directory before its contents, siblings
/// sorted by file name. The root itself is not an entry. Reading stops with
/// [`WireError::MessageTooLarge`] as soon as file contents alone exceed
/// `max_bytes`.
pub fn read_folder(root: &Path, max_bytes: usize) -> Result<FolderMessage> {
    let mut folder = FolderMessage::new();
    let mut payload = 0usize;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            WireError::io(path, io::Error::from(err))
        })?;
        let rel_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| WireError::format(format!("{} escapes root", entry.path().display())))?;
        if rel_path.as_os_str().is_empty() {
            continue;
        }
        let name = wire_path(rel_path)?;

        // symlinked directories are recorded but not descended into
        if entry.path().is_dir() {
            folder.push_dir(name)?;
            continue;
        }

        let remaining = max_bytes.saturating_sub(payload);
        let contents = read_capped(entry.path(), remaining)?;
        payload += contents.len();
        if payload > max_bytes {
            return Err(WireError::MessageTooLarge {
                size: payload,
                limit: max_bytes,
            });
        }
        folder.push_file(name, contents)?;
    }

    Ok(folder)
}

/// Read `root` and encode it in one go.
pub fn encode_folder(root: &Path, max_bytes: usize) -> Result<Bytes> {
    read_folder(root, max_bytes)?.encode(max_bytes)
}

/// Materialize `folder` below `root`, creating directories as needed and
/// overwriting files that already exist.
pub fn write_folder(root: &Path, folder: &FolderMessage) -> Result<()> {
    for entry in folder.entries() {
        let path = host_path(root, entry.path());
        match entry.kind() {
            EntryKind::Directory => ensure_dir(&path)?,
            EntryKind::File(contents) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|err| WireError::io(parent, err))?;
                }
                fs::write(&path, contents).map_err(|err| WireError::io(&path, err))?;
            }
        }
    }
    Ok(())
}

/// Decode `message` and materialize it below `root`.
pub fn decode_folder(root: &Path, message: Bytes) -> Result<()> {
    let folder = FolderMessage::decode(message)?;
    write_folder(root, &folder)
}

fn ensure_dir(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(WireError::NotADirectory(path.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|err| WireError::io(path, err))
        }
        Err(err) => Err(WireError::io(path, err)),
    }
}

/// Read at most `limit + 1` bytes so an oversized file is detected without
/// pulling all of it into memory.
fn read_capped(path: &Path, limit: usize) -> Result<Bytes> {
    let file = File::open(path).map_err(|err| WireError::io(path, err))?;
    let mut contents = Vec::new();
    file.take(limit as u64 + 1)
        .read_to_end(&mut contents)
        .map_err(|err| WireError::io(path, err))?;
    Ok(Bytes::from(contents))
}

fn wire_path(rel_path: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in rel_path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(|| {
                WireError::format(format!("{} is not valid UTF-8", rel_path.display()))
            })?),
            _ => {
                return Err(WireError::format(format!(
                    "{} is not a plain relative path",
                    rel_path.display()
                )))
            }
        }
    }
    Ok(parts.join("/"))
}

fn host_path(root: &Path, wire_path: &str) -> PathBuf {
    wire_path.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}
