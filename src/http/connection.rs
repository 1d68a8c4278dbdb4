use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};

use crate::http::error::HttpError;
use crate::http::exchange::{Exchange, server_failure_response};
use crate::http::parser::read_request;
use crate::http::request::{Method, Request};
use crate::http::writer::ResponseWriter;
use crate::server::service::Service;

pub struct Connection<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    service: Arc<Service>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, service: Arc<Service>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
            service,
            state: ConnectionState::Reading,
        }
    }

    /// Runs exchanges until the peer asks to close, a request fails, or the
    /// transport breaks. Only transport failures are returned as errors.
    pub async fn run(&mut self) -> Result<(), HttpError> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => match read_request(&mut self.reader).await {
                    Ok(Some(req)) => ConnectionState::Processing(req),
                    Ok(None) => ConnectionState::Closed,
                    Err(e) if e.is_transport() => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "Rejecting request");
                        let writer = ResponseWriter::new(&server_failure_response(), true);
                        ConnectionState::Writing(writer, false)
                    }
                },

                ConnectionState::Processing(req) => {
                    let include_body = req.method != Method::HEAD;
                    let method = req.method;
                    let path = req.path.clone();

                    let mut exchange = Exchange::new(req);
                    if let Err(e) = self.service.handle(&mut exchange).await {
                        tracing::error!(%method, %path, error = %e, "Request handler failed");
                        if exchange.response_written() {
                            exchange.force_close();
                        } else {
                            exchange.write_server_failure()?;
                        }
                    }

                    let (response, keep_alive) = exchange.finish();
                    tracing::info!(
                        %method,
                        %path,
                        status = response.status.as_u16(),
                        "Request handled"
                    );

                    let writer = ResponseWriter::new(&response, include_body);
                    ConnectionState::Writing(writer, keep_alive)
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.writer).await?;

                    if keep_alive {
                        ConnectionState::Reading // go back for next request
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        // The peer may already be gone.
        let _ = self.writer.shutdown().await;
        Ok(())
    }
}
