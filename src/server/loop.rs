// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on `listener`.
///
/// Returns once `shutdown` completes. Connections already being served keep
/// running on their own tasks; accept errors are logged and the loop goes on.
pub async fn start_server_loop<S>(listener: TcpListener, state: Arc<AppState>, shutdown: S)
where
    S: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                tracing::info!("shutdown requested, no longer accepting connections");
                break;
            }
        }
    }
}
