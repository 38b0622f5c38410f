//! Change-feed task — an explicit reconnect / catch-up state machine.
//!
//! The task cycles between two states: **streaming** the table's NDJSON
//! feed line by line, and — whenever the stream is lost — **catching up**:
//! wait out the reconnect delay, re-fetch the full table, deliver it as a
//! `Resync` snapshot, then stream again. Missed events are therefore
//! covered by the snapshot rather than replayed. The task exits as soon as
//! the receiving [`ChangeFeed`] has been dropped.

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use cask_core::feed::{ChangeEvent, ChangeFeed, FeedEvent};

use crate::{Result, store::HttpStore};

/// Why a streaming attempt stopped.
enum StreamEnd {
  /// The consumer dropped its `ChangeFeed`; the task must exit.
  Unsubscribed,
  /// The server closed the response body; reconnect and catch up.
  ServerClosed,
}

pub(crate) fn spawn<T>(store: HttpStore, table: &'static str) -> ChangeFeed<T>
where
  T: DeserializeOwned + Send + Sync + 'static,
{
  let (tx, feed) = ChangeFeed::channel();
  tokio::spawn(run(store, table, tx));
  feed
}

async fn run<T>(
  store: HttpStore,
  table: &'static str,
  tx: mpsc::Sender<FeedEvent<T>>,
) where
  T: DeserializeOwned + Send + Sync + 'static,
{
  let mut first_connect = true;
  loop {
    if !first_connect {
      tokio::time::sleep(store.config().reconnect_delay).await;

      // Catch up on whatever the dropped stream missed with a full
      // snapshot before resuming event delivery.
      match store.fetch_all::<T>(table, &[]).await {
        Ok(rows) => {
          if tx.send(FeedEvent::Resync(rows)).await.is_err() {
            return;
          }
        }
        Err(err) => {
          warn!(table, %err, "resync fetch failed; will retry");
          continue;
        }
      }
    }
    first_connect = false;

    match stream(&store, table, &tx).await {
      Ok(StreamEnd::Unsubscribed) => return,
      Ok(StreamEnd::ServerClosed) => {
        debug!(table, "feed stream closed by server");
      }
      Err(err) => {
        warn!(table, %err, "feed stream lost");
      }
    }
  }
}

/// One streaming attempt: read the chunked response, frame it into lines,
/// and forward each parsed event in delivery order.
async fn stream<T>(
  store: &HttpStore,
  table: &str,
  tx: &mpsc::Sender<FeedEvent<T>>,
) -> Result<StreamEnd>
where
  T: DeserializeOwned,
{
  let url = store.feed_url(table);
  let mut resp = store.feed_request(table).send().await?;

  let status = resp.status();
  if !status.is_success() {
    return Err(crate::Error::Status { status, url });
  }

  let mut buf: Vec<u8> = Vec::new();
  while let Some(chunk) = resp.chunk().await? {
    buf.extend_from_slice(&chunk);

    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
      let line: Vec<u8> = buf.drain(..=pos).collect();
      let line = line.strip_suffix(b"\n").unwrap_or(&line);
      if line.iter().all(u8::is_ascii_whitespace) {
        continue;
      }

      match serde_json::from_slice::<ChangeEvent<T>>(line) {
        Ok(event) => {
          if tx.send(FeedEvent::Change(event)).await.is_err() {
            return Ok(StreamEnd::Unsubscribed);
          }
        }
        Err(err) => {
          warn!(table, %err, "skipping malformed feed line");
        }
      }
    }
  }

  Ok(StreamEnd::ServerClosed)
}
