//! Event bus feeder.

use jobwatch_common::JobwatchError;
use jobwatch_events::{EventSource, SaltEvent, SourceError};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::info;

pub type FeedReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Open the event feed: a TCP `host:port` if given, stdin otherwise.
pub async fn connect(addr: Option<&str>) -> Result<FeedReader, JobwatchError> {
    match addr {
        Some(addr) => {
            let stream = TcpStream::connect(addr).await.map_err(|e| {
                JobwatchError::EventSource(format!("failed to connect to {addr}: {e}"))
            })?;
            info!(addr, "Connected to event feed");
            Ok(Box::new(BufReader::new(stream)))
        }
        None => {
            info!("Reading events from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Forward every event from `source` to all current subscribers until the
/// feed ends. Returns the number of events forwarded.
pub async fn run_feed<R>(
    mut source: EventSource<R>,
    tx: broadcast::Sender<SaltEvent>,
) -> Result<u64, SourceError>
where
    R: AsyncBufRead + Unpin,
{
    let mut forwarded = 0;
    while let Some(event) = source.next_event().await? {
        // No subscribers just means no session is watching yet.
        let _ = tx.send(event);
        forwarded += 1;
    }
    info!(forwarded, skipped = source.skipped(), "Event feed ended");
    Ok(forwarded)
}
