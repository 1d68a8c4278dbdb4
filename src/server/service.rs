use crate::http::exchange::Exchange;
use crate::routing::Router;
use crate::server::static_files::StaticFiles;

/// What the server does with each exchange: routes first, then static files.
pub struct Service {
    router: Router,
    static_files: StaticFiles,
}

impl Service {
    pub fn new(router: Router, static_files: StaticFiles) -> Self {
        Self {
            router,
            static_files,
        }
    }

    pub fn static_files(&self) -> &StaticFiles {
        &self.static_files
    }

    pub async fn handle(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        if self.router.dispatch(exchange)? {
            return Ok(());
        }
        self.static_files.serve(exchange).await
    }
}
