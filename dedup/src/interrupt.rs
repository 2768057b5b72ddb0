use std::future::Future;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
#[error("interrupted by Ctrl-C")]
pub struct Interrupted;

/// Drive `work` to completion unless Ctrl-C arrives first.
///
/// Once tokio installs its SIGINT handler the default terminate action is
/// gone for the rest of the process, so the whole pipeline has to sit under
/// one listener. On interrupt `work` is dropped, which kills a running ffmpeg
/// child; a blocking dedup pass keeps running until the process exits.
pub async fn until_ctrl_c<F: Future>(work: F) -> Result<F::Output, Interrupted> {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C; running uninterruptible");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        biased;
        output = work => Ok(output),
        _ = interrupt => {
            warn!("interrupted, stopping pipeline");
            Err(Interrupted)
        }
    }
}
