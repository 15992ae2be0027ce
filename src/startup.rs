//! Process startup: listener, dependency connects, and the serve loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::create_router;
use crate::config::Config;
use crate::context::AppContext;
use crate::dependency::Dependency;
use crate::error::Result;
use crate::metrics;
use crate::retry::{ConnectionRetrier, RetryOutcome, RetryPolicy};
use crate::utils::shutdown_signal;

/// Bind the fixed port and serve until a shutdown signal arrives.
pub async fn run(config: &Config) -> Result<()> {
    let ctx = AppContext::from_config(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], ctx.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on http://localhost:{}", ctx.port);

    serve(listener, ctx, RetryPolicy::default(), shutdown_signal()).await
}

/// Serve on an already bound listener.
///
/// The document store retry chain and the single cache connect start in the
/// background; requests are accepted without waiting for either. When
/// `shutdown` resolves the retry chain is cancelled, the server drains, and
/// both dependencies release their driver resources.
pub async fn serve<F>(
    listener: TcpListener,
    ctx: AppContext,
    policy: RetryPolicy,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let _document_store = connect_with_retry(ctx.document_store.clone(), policy, cancel.clone());
    let _cache = connect_once(ctx.cache.clone());

    let dependencies = [ctx.document_store.clone(), ctx.cache.clone()];
    let router = create_router(ctx);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            cancel.cancel();
        })
        .await?;

    for dependency in &dependencies {
        dependency.shutdown().await;
    }
    info!("Server stopped");
    Ok(())
}

/// Start the retry chain for `dependency` in the background.
pub fn connect_with_retry(
    dependency: Arc<dyn Dependency>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) -> JoinHandle<RetryOutcome> {
    ConnectionRetrier::with_cancellation(policy, cancel).spawn(dependency)
}

/// Connect `dependency` once in the background. Failures are logged only.
pub fn connect_once(dependency: Arc<dyn Dependency>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = dependency.name();
        metrics::inc_connect_attempts(name);

        match dependency.connect().await {
            Ok(()) => metrics::inc_connected(name),
            Err(e) => {
                metrics::inc_connect_failures(name);
                error!(dependency = name, "Failed to connect to {}: {}", name, e);
            }
        }
    })
}
