//! CLI command implementations.

pub mod config;
pub mod credits;
pub mod key;
pub mod process;
pub mod quota;
pub mod stage;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `token` when the user presses Ctrl-C.
///
/// Abort the returned handle once the run has finished.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            token.cancel();
        }
    })
}
