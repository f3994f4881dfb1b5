//! One request per TCP connection: the client writes its request and
//! half-closes, the server answers once and closes.

use crate::error::{Result, WireError};
use crate::request::Request;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Room for the command word in front of a folder-message.
pub const REQUEST_OVERHEAD: usize = 64;

/// Read until end-of-stream, failing once more than `max_bytes` arrive.
pub async fn read_to_end_capped<R>(reader: &mut R, max_bytes: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(max_bytes.min(64 * 1024));
    loop {
        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(buf.freeze());
        }
        if buf.len() > max_bytes {
            return Err(WireError::MessageTooLarge {
                size: buf.len(),
                limit: max_bytes,
            });
        }
    }
}

/// Send one request and wait for the server's single response.
pub async fn send_request<A>(addr: A, request: &Request, max_bytes: usize) -> Result<Bytes>
where
    A: ToSocketAddrs,
{
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(&request.to_bytes()).await?;
    // half-close so the server sees end-of-request
    stream.shutdown().await?;
    read_to_end_capped(&mut stream, max_bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn capped_read_accepts_up_to_the_limit() {
        let mut input: &[u8] = b"0123456789";
        let read = read_to_end_capped(&mut input, 10).await.unwrap();
        assert_eq!(&read[..], b"0123456789");

        let mut input: &[u8] = b"0123456789";
        assert!(matches!(
            read_to_end_capped(&mut input, 9).await,
            Err(WireError::MessageTooLarge { limit: 9, .. })
        ));
    }

    #[tokio::test]
    async fn request_is_half_closed_before_the_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let request = read_to_end_capped(&mut conn, 1024).await.unwrap();
            conn.write_all(b"queue").await.unwrap();
            conn.shutdown().await.unwrap();
            request
        });

        let response = send_request(addr, &Request::Check("/srv/job-1".into()), 1024)
            .await
            .unwrap();
        assert_eq!(&response[..], b"queue");
        assert_eq!(&server.await.unwrap()[..], b"check /srv/job-1");
    }
}
