use std::{
    net::SocketAddr,
    sync::{Arc, Once},
    time::Duration,
};

use common_redis::MockRedisClient;
use tokio::{net::TcpListener, sync::Notify};
use users_api::users::user_source::InMemoryUserSource;
use users_api::{config::Config, server::serve, state::State};

static TRACING_INIT: Once = Once::new();
pub fn setup_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::TestWriter::new())
            .init()
    });
}

pub struct ServerHandle {
    pub addr: SocketAddr,
    pub shutdown: Arc<Notify>,
    pub store: MockRedisClient,
    pub source: InMemoryUserSource,
}

impl ServerHandle {
    /// Serve the API backed by an in-memory store and the seeded user database.
    pub async fn for_store(store: MockRedisClient) -> Self {
        setup_tracing();
        let config = Config::default_for_test();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let state = State::new(
            &config,
            Arc::new(store.clone()),
            Arc::new(source.clone()),
            None,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();

        tokio::spawn(async move {
            serve(state, listener, async move { notify.notified().await }).await
        });

        Self {
            addr,
            shutdown,
            store,
            source,
        }
    }

    pub async fn start() -> Self {
        Self::for_store(MockRedisClient::new()).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}
