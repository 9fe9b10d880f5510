use std::future::Future;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

/// Receiving side of the shutdown flag. Cloned freely; all clones observe the
/// same flag.
#[derive(Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Sending side of the shutdown flag.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn channel() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Cancellation {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if every
    /// handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Runs `fut` unless cancellation wins first, in which case `fut` is dropped
/// and `None` is returned. A flag that is already set always wins.
pub async fn until_cancelled<F: Future>(fut: F, cancel: &mut Cancellation) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

/// Wire Ctrl+C and the console quit key to a fresh cancellation flag.
///
/// Both listeners run as tasks on the caller's runtime; they only flip the
/// flag, the scan loop does the actual shutdown.
pub fn install(quit_key: &str) -> Cancellation {
    let (handle, cancellation) = channel();

    let on_interrupt = handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                on_interrupt.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
        }
    });

    let quit_key = quit_key.trim().to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if is_quit_key(&line, &quit_key) => {
                    info!(key = quit_key, "quit key pressed, shutting down");
                    handle.cancel();
                    return;
                }
                Ok(Some(_)) => {}
                Ok(None) => return,
                Err(e) => {
                    warn!(error = %e, "stdin closed, quit key disabled");
                    return;
                }
            }
        }
    });

    cancellation
}

fn is_quit_key(line: &str, quit_key: &str) -> bool {
    line.trim().eq_ignore_ascii_case(quit_key)
}
