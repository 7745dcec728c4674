use sd_notify::NotifyState;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{error, info};

/// Wires process lifecycle into the given notifier: sd-notify readiness once
/// the server had a moment to bind, and signal-driven shutdown waking every
/// task that waits on the notifier.
pub fn run(notifier: Arc<Notify>) {
    tokio::spawn(handle_signals(notifier.clone()));
    tokio::spawn(async move {
        sleep(Duration::from_secs(1)).await;
        let r = sd_notify::notify(false, &[NotifyState::Ready]);
        if let Err(e) = r {
            error!("notify ready: {}", e);
        }
    });
}

async fn handle_signals(notifier: Arc<Notify>) {
    let mut interrupt = signal(SignalKind::interrupt()).unwrap();
    let mut terminate = signal(SignalKind::terminate()).unwrap();
    let mut quit = signal(SignalKind::quit()).unwrap();

    let mut sigint = false;
    tokio::select! {
        _ = interrupt.recv() => {
            info!("received interrupt signal");
            sigint = true;
        },
        _ = terminate.recv() => {
            info!("received terminate signal");
        },
        _ = quit.recv() => {
            info!("received quit signal");
        },
    }

    let _ = sd_notify::notify(true, &[NotifyState::Stopping]);

    notifier.notify_waiters();
    if sigint {
        process::exit(0);
    }
}
