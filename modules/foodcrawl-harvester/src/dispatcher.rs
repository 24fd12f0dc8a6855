use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Push every identifier onto the work channel in input order, then close it.
///
/// No filtering or dedup: repeated identifiers are sent as many times as
/// they appear. Dropping `tx` on return is the only exhaustion signal the
/// workers get. Returns the number of identifiers sent.
pub async fn dispatch(
    ids: Vec<String>,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> usize {
    let total = ids.len();
    let mut sent = 0usize;

    for id in ids {
        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(sent, total, "Dispatch cancelled");
                break;
            }
            res = tx.send(id) => res.is_ok(),
        };

        if !delivered {
            warn!(sent, total, "All workers gone, stopping dispatch");
            break;
        }

        sent += 1;
        if sent % 1000 == 0 {
            debug!(sent, total, "Dispatching");
        }
    }

    info!(sent, total, "Dispatch complete");
    sent
}
