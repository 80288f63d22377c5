//! Line Protocol Server
//!
//! Accepts TCP connections and answers one response line per request line.
//! Each connection runs in its own task; all of them share one
//! `StorageService`.

mod command;

use std::future::Future;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::storage::StorageService;

pub use command::{
    Command, CommandError, DELETED, NOT_DELETED, NOT_FOUND, NOT_STORED, STORED, UNKNOWN,
};

/// Serves connections from `listener` until `shutdown` completes.
///
/// Connections already accepted keep running; only new accepts stop.
pub async fn serve<F>(
    listener: TcpListener,
    storage: Arc<StorageService>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "Server listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Server no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "Failed to accept connection");
                        continue;
                    }
                };
                debug!(%peer, "Connection accepted");
                let storage = Arc::clone(&storage);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, storage).await {
                        warn!(%peer, error = %err, "Connection closed with error");
                    } else {
                        debug!(%peer, "Connection closed");
                    }
                });
            }
        }
    }
}

/// Reads request lines until the peer hangs up.
async fn handle_connection(stream: TcpStream, storage: Arc<StorageService>) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }

        let response = match Command::parse(&line) {
            Ok(command) => command.execute(&storage),
            Err(err) => {
                debug!(error = %err, "Rejected request");
                Bytes::from_static(err.response().as_bytes())
            }
        };

        writer.write_all(&response).await?;
        writer.write_all(b"\n").await?;
    }
}
