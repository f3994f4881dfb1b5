use crate::error::{Result, WireError};
use bytes::{BufMut, Bytes, BytesMut};

/// Status string returned by `check` when no job has the given location.
pub const STATUS_NONE: &str = "none";

/// One client request. Every connection carries exactly one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Upload a folder-message as a new job.
    Submit(Bytes),
    /// Ask for the status of the job at a location.
    Check(String),
    /// Fetch the job's folder and release the job.
    Retrieve(String),
}

impl Request {
    pub fn command(&self) -> &'static str {
        match self {
            Request::Submit(_) => "submit",
            Request::Check(_) => "check",
            Request::Retrieve(_) => "retrieve",
        }
    }

    /// Parse a raw request. The command word ends at the first space; for
    /// `check` and `retrieve` the location ends at the next space or the end
    /// of the message.
    pub fn parse(message: Bytes) -> Result<Self> {
        let split = message.iter().position(|b| *b == b' ');
        let (command, rest) = match split {
            Some(at) => (message.slice(..at), message.slice(at + 1..)),
            None => (message.clone(), Bytes::new()),
        };

        match &command[..] {
            b"submit" => {
                if split.is_none() {
                    return Err(WireError::format("submit without a folder-message"));
                }
                Ok(Request::Submit(rest))
            }
            b"check" => Ok(Request::Check(parse_location(&rest)?)),
            b"retrieve" => Ok(Request::Retrieve(parse_location(&rest)?)),
            other => Err(WireError::UnsupportedCommand(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(self.command().as_bytes());
        buf.put_u8(b' ');
        match self {
            Request::Submit(folder) => buf.put_slice(folder),
            Request::Check(location) | Request::Retrieve(location) => {
                buf.put_slice(location.as_bytes())
            }
        }
        buf.freeze()
    }
}

fn parse_location(rest: &[u8]) -> Result<String> {
    let end = rest.iter().position(|b| *b == b' ').unwrap_or(rest.len());
    let location = std::str::from_utf8(&rest[..end])
        .map_err(|_| WireError::format("location is not valid UTF-8"))?;
    validate_location(location)?;
    Ok(location.to_string())
}

/// Locations travel inside space-separated request lines, so they may contain
/// neither spaces nor `@`.
pub fn validate_location(location: &str) -> Result<()> {
    if location.is_empty() {
        return Err(WireError::format("missing location"));
    }
    if location.contains(|c: char| c == '@' || c.is_whitespace()) {
        return Err(WireError::format(format!(
            "location {location:?} contains a reserved character"
        )));
    }
    Ok(())
}
