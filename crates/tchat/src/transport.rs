//! Establishing the connection a session runs over.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use tchat_core::{Error, Result};

/// Listen on `bind:port` and accept exactly one peer.
pub async fn accept_one(bind: &str, port: u16) -> Result<(TcpStream, SocketAddr)> {
    let listener = TcpListener::bind((bind, port))
        .await
        .map_err(|e| Error::Transport {
            message: format!("failed to bind {bind}:{port}: {e}"),
        })?;
    let local = listener.local_addr().map_err(Error::Io)?;
    info!(addr = %local, "Waiting for a peer");
    accept_from(&listener).await
}

/// Accept one peer on an already bound listener.
pub async fn accept_from(listener: &TcpListener) -> Result<(TcpStream, SocketAddr)> {
    let (stream, peer) = listener.accept().await.map_err(Error::Io)?;
    prepare(&stream)?;
    info!(%peer, "Peer connected");
    Ok((stream, peer))
}

/// Connect to a listening peer.
pub async fn connect(host: &str, port: u16) -> Result<TcpStream> {
    debug!(host, port, "Connecting");
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::Transport {
            message: format!("failed to connect to {host}:{port}: {e}"),
        })?;
    prepare(&stream)?;
    info!(host, port, "Connected");
    Ok(stream)
}

fn prepare(stream: &TcpStream) -> Result<()> {
    // Chat lines are small; don't hold them back.
    stream.set_nodelay(true).map_err(Error::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_and_accept_pair_up() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (client, server) = tokio::join!(connect("127.0.0.1", port), accept_from(&listener));
        let client = client.unwrap();
        let (server, peer) = server.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
        assert_eq!(server.peer_addr().unwrap(), client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn connect_refused_is_transport_error() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert!(err.is_fatal());
    }
}
