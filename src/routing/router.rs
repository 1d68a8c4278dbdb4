use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::http::exchange::Exchange;
use crate::http::response::StatusCode;

/// A route handler. It receives the exchange and the non-empty `/`
/// segments of the path, and is expected to write the response itself.
pub type Handler = Arc<dyn Fn(&mut Exchange, &[String]) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Error)]
#[error("invalid route pattern {pattern:?}: {source}")]
pub struct RouteError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

struct Route {
    pattern: Regex,
    handler: Handler,
}

/// Ordered list of `(pattern, handler)` routes; first match wins.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route. The pattern is anchored, so it must match the
    /// whole request path.
    pub fn route<F>(mut self, pattern: &str, handler: F) -> Result<Self, RouteError>
    where
        F: Fn(&mut Exchange, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let anchored = format!("^(?:{})$", pattern);
        let compiled = Regex::new(&anchored).map_err(|source| RouteError {
            pattern: pattern.to_string(),
            source,
        })?;

        self.routes.push(Route {
            pattern: compiled,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the first route matching the request path.
    ///
    /// Returns `Ok(false)` when nothing matched. A handler that returns
    /// without writing a response gets a default empty 200. A handler that
    /// panics is reported as an error like any other handler failure.
    pub fn dispatch(&self, exchange: &mut Exchange) -> anyhow::Result<bool> {
        let path = exchange.request().path.clone();

        let Some(route) = self.routes.iter().find(|r| r.pattern.is_match(&path)) else {
            return Ok(false);
        };

        tracing::debug!(path = %path, pattern = %route.pattern, "Route matched");

        let tokens = split_path(&path);
        match panic::catch_unwind(AssertUnwindSafe(|| (route.handler)(exchange, &tokens))) {
            Ok(result) => result?,
            Err(payload) => {
                anyhow::bail!("handler for {} panicked: {}", path, panic_message(&*payload))
            }
        }

        if !exchange.response_written() {
            exchange.write_response(StatusCode::Ok, Vec::new(), None)?;
        }
        Ok(true)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Splits a path into its `/`-separated segments, dropping empty ones.
///
/// ```
/// # use tinyrest::routing::split_path;
/// assert_eq!(split_path("/rest/teams/"), vec!["rest", "teams"]);
/// assert!(split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
