use crate::api::http::service::GatewayService;
use crate::errors::GatewayError;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use std::pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info};

pub async fn start(
    notifier: Arc<Notify>,
    addr: String,
    service: GatewayService,
) -> Result<(), GatewayError> {
    let addr = common::socket::parse_address(addr.clone())
        .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
    let socket = common::socket::listen_reuse_socket(&addr)
        .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
    let listener = TcpListener::from_std(socket.into())
        .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

    info!("gateway: listening on http://{}", addr);

    let http = http1::Builder::new();
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let mut signal = pin::pin!(notifier.notified());

    loop {
        tokio::select! {
            Ok((stream, _addr)) = listener.accept() => {
                let service = service.clone();
                let io = TokioIo::new(stream);
                let conn = http.serve_connection(io, service);
                let fut = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = fut.await {
                        error!("gateway: serve: {:?}", e);
                    }
                });
            },
            _ = &mut signal => {
                info!("gateway: http server: graceful shutdown");
                break;
            }
        }
    }

    tokio::select! {
        _ = graceful.shutdown() => {
            info!("gateway: http server: all connections gracefully closed");
        },
        // Open download relays can hold connections for a long time; cap the
        // drain instead of waiting them out.
        _ = tokio::time::sleep(std::time::Duration::from_secs(30)) => {
            info!("gateway: timed out wait for all connections to close");
        }
    }
    Ok(())
}
