// Server loop module
// Accepts connections until a shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

/// How long shutdown waits for open connections to finish
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the accept loop until `signals` reports a shutdown.
///
/// After a shutdown the listener is closed first, then open connections get
/// up to [`SHUTDOWN_GRACE`] to finish. Whatever is still running afterwards
/// is cancelled when the caller drops the local task set.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    signals: Arc<SignalHandler>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = signals.wait_for_shutdown() => {
                logger::log_shutdown("Shutdown requested");
                break;
            }
        }
    }

    drop(listener);
    let remaining = drain_connections(&active_connections, SHUTDOWN_GRACE).await;
    if remaining > 0 {
        logger::log_warning(&format!(
            "{remaining} connection(s) still open after {}s, closing them",
            SHUTDOWN_GRACE.as_secs()
        ));
    }
}

/// Wait until `active` reaches zero or `grace` runs out, returning what is left
async fn drain_connections(active: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let open = active.load(Ordering::SeqCst);
        if open == 0 || tokio::time::Instant::now() >= deadline {
            return open;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
