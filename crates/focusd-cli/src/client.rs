//! Socket client for the daemon protocol.
//!
//! One connection per action: connect, send one request line, read one
//! reply line.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UnixStream};

use focusd_core::StatusReport;

use crate::proto::{Request, Response};

/// Where the daemon listens.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

/// Perform one request and return the daemon's status reply.
pub async fn call(
    endpoint: &Endpoint,
    request: Request,
) -> Result<StatusReport, Box<dyn std::error::Error>> {
    match endpoint {
        Endpoint::Unix(path) => {
            let stream = UnixStream::connect(path).await?;
            roundtrip(stream, request).await
        }
        Endpoint::Tcp(addr) => {
            let stream = TcpStream::connect(addr).await?;
            roundtrip(stream, request).await
        }
    }
}

async fn roundtrip<S>(stream: S, request: Request) -> Result<StatusReport, Box<dyn std::error::Error>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);

    let mut payload = serde_json::to_vec(&request)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;

    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line).await?;
    if line.is_empty() {
        return Err("daemon closed the connection without replying".into());
    }

    match serde_json::from_str::<Response>(&line)? {
        Response::Ok { status } => Ok(status),
        Response::Error { message } => Err(message.into()),
    }
}
