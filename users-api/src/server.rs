use std::future::Future;

use tokio::net::TcpListener;

use crate::{router::router, state::State};

pub async fn serve<F>(state: State, listener: TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state.user_service(), state.cache_admin(), state.metrics);

    tracing::info!("listening on {:?}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}
