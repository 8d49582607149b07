//! TCP command server
//!
//! Every client speaks the same line protocol as the interactive prompt, with
//! `RPRT` status lines. The accept loop runs on tokio; each client is moved
//! to a blocking thread because the session itself is synchronous.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

use anyhow::{Context, Result};
use rig_core::SharedRig;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::dispatch::{execute, run_line, Flow, ReplyStyle};

/// Accept clients until the listener fails
pub async fn serve(listener: TcpListener, rig: SharedRig) -> Result<()> {
    info!(
        "Listening on {}",
        listener.local_addr().context("listener has no address")?
    );
    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        let stream = match stream.into_std() {
            Ok(s) => s,
            Err(e) => {
                warn!("Dropping client {}: {}", peer, e);
                continue;
            }
        };
        info!("Client {} connected", peer);
        let rig = rig.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = serve_stream(stream, &rig) {
                warn!("Client {} failed: {}", peer, e);
            }
            info!("Client {} disconnected", peer);
        });
    }
}

fn serve_stream(stream: TcpStream, rig: &SharedRig) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    let reader = BufReader::new(stream.try_clone()?);
    serve_client(reader, stream, rig)
}

/// Serve one client until it quits or hangs up
pub fn serve_client(reader: impl BufRead, mut writer: impl Write, rig: &SharedRig) -> io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let flow = run_line(&line, ReplyStyle::Report, &mut writer, |request| {
            rig.with(|r| execute(r, request))
        })?;
        writer.flush()?;
        if flow == Flow::Quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_backends::Dummy;
    use rig_core::{NullTransport, Rig};
    use std::io::Cursor;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    fn shared() -> SharedRig {
        let mut rig = Rig::new(Box::new(Dummy::new()));
        rig.open(Box::new(NullTransport)).unwrap();
        SharedRig::new(rig)
    }

    #[test]
    fn test_client_session() {
        let rig = shared();
        let input = Cursor::new("F 14074000\n\nf\nT 9\nq\nf\n");
        let mut out = Vec::new();
        serve_client(input, &mut out, &rig).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "RPRT 0\n14074000\nRPRT -1\n"
        );
    }

    #[test]
    fn test_clients_share_the_rig() {
        let rig = shared();
        serve_client(Cursor::new("V VFOB F 7074000\n"), io::sink(), &rig).unwrap();
        let mut out = Vec::new();
        serve_client(Cursor::new("v f\n"), &mut out, &rig).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "VFOB\n7074000\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, shared()));

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = tokio::io::BufReader::new(read).lines();

        write.write_all(b"F 3573000\nf\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "RPRT 0");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "3573000");

        write.write_all(b"q\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap(), None);
        server.abort();
    }
}
