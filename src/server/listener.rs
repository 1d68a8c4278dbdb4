use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use notify::RecommendedWatcher;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::routing::Router;
use crate::server::file_cache::{CacheInvalidator, FileCache};
use crate::server::service::Service;
use crate::server::static_files::StaticFiles;

/// An HTTP server: routes, static fallback and the accept loop.
///
/// `start` binds and accepts in the background; `stop` stops watching the
/// static root, stops accepting and waits for the accept loop. Connections
/// already accepted are left to finish on their own.
pub struct Server {
    listen_addr: String,
    max_connections: usize,
    service: Arc<Service>,
    watcher: Option<RecommendedWatcher>,
    shutdown: Option<watch::Sender<bool>>,
    accept_task: Option<JoinHandle<anyhow::Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl Server {
    pub fn new(cfg: &Config, router: Router) -> anyhow::Result<Self> {
        Self::with_file_cache(cfg, router, FileCache::new())
    }

    /// Like [`Server::new`], sharing the given static file cache.
    pub fn with_file_cache(cfg: &Config, router: Router, cache: FileCache) -> anyhow::Result<Self> {
        cfg.validate()?;

        let static_files = match &cfg.static_files {
            Some(s) => StaticFiles::new(&s.root, cache)
                .with_context(|| format!("opening static root {}", s.root.display()))?,
            None => StaticFiles::disabled(),
        };

        Ok(Self {
            listen_addr: cfg.server.listen_addr.clone(),
            max_connections: cfg.server.max_connections,
            service: Arc::new(Service::new(router, static_files)),
            watcher: None,
            shutdown: None,
            accept_task: None,
            local_addr: None,
        })
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn file_cache(&self) -> &FileCache {
        self.service.static_files().cache()
    }

    pub fn is_running(&self) -> bool {
        self.accept_task.is_some()
    }

    /// Binds the listener and starts accepting in the background.
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        if self.is_running() {
            anyhow::bail!("server is already running");
        }

        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("binding {}", self.listen_addr))?;
        let addr = listener.local_addr()?;
        info!("Listening on {}", addr);

        if let Some(root) = self.service.static_files().root() {
            let invalidator = CacheInvalidator::new(root, self.file_cache().clone());
            self.watcher = Some(invalidator.run()?);
        }

        let (tx, rx) = watch::channel(false);
        let limit = Arc::new(Semaphore::new(self.max_connections));
        let service = self.service.clone();

        self.accept_task = Some(tokio::spawn(run(listener, service, limit, rx)));
        self.shutdown = Some(tx);
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Waits for the accept loop to end, returning its error if it failed.
    pub async fn wait(&mut self) -> anyhow::Result<()> {
        let Some(handle) = self.accept_task.as_mut() else {
            return Ok(());
        };
        let result = handle.await;
        self.accept_task = None;
        result.context("accept loop panicked")?
    }

    pub async fn stop(&mut self) -> anyhow::Result<()> {
        // Dropping the watcher ends filesystem notifications.
        self.watcher = None;

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }

        self.wait().await
    }
}

/// Accepts connections until shutdown is signalled, spawning a task per
/// connection. Any accept failure other than shutdown ends the loop with an
/// error.
pub async fn run(
    listener: TcpListener,
    service: Arc<Service>,
    limit: Arc<Semaphore>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    loop {
        let permit = tokio::select! {
            _ = shutdown.changed() => break,
            permit = limit.clone().acquire_owned() => permit?,
        };

        let (socket, peer) = tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => accepted?,
        };
        info!("Accepted connection from {}", peer);

        let service = service.clone();
        tokio::spawn(
            async move {
                let mut conn = Connection::new(socket, service);
                if let Err(e) = conn.run().await {
                    tracing::warn!("Connection error from {}: {}", peer, e);
                }
                drop(permit);
            }
            .instrument(tracing::info_span!("conn", %peer)),
        );
    }

    info!("Listener stopped");
    Ok(())
}
