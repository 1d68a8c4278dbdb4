use crate::http::error::HttpError;
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Value of the `X-Powered-By` header stamped on every response.
pub const POWERED_BY: &str = concat!("tinyrest/", env!("CARGO_PKG_VERSION"));

const NOT_FOUND_BODY: &str = "<b>404, nothing lives at this address.</b>";
const AUTH_REQUIRED_BODY: &str = "<b>401, log in before trying that.</b>";
const SERVER_FAILURE_BODY: &str = "<b>500, something broke while handling this request.</b>";

/// One request/response cycle on a connection.
///
/// Handlers read the parsed request and record exactly one response. A
/// second write fails with [`HttpError::DoubleResponse`].
#[derive(Debug)]
pub struct Exchange {
    request: Request,
    connection: String,
    response_headers: Headers,
    set_cookies: Vec<(String, String)>,
    response: Option<Response>,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        let connection = request.connection().to_string();
        Self {
            request,
            connection,
            response_headers: Headers::new(),
            set_cookies: Vec::new(),
            response: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Queues a header for the response. Has no effect once it is written.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response_headers.insert(name, value);
    }

    /// Queues a `Set-Cookie` line for the response.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set_cookies.push((name.into(), value.into()));
    }

    pub fn response_written(&self) -> bool {
        self.response.is_some()
    }

    /// The response recorded so far, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Whether the connection may serve another exchange after this one.
    pub fn keep_alive(&self) -> bool {
        !self.connection.trim().eq_ignore_ascii_case("close")
    }

    /// Records the response for this exchange.
    ///
    /// `Content-Type` defaults to `text/html` and is only sent with a
    /// non-empty body; `Content-Length` is the body's byte length.
    pub fn write_response(
        &mut self,
        status: StatusCode,
        body: impl Into<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Result<(), HttpError> {
        if self.response.is_some() {
            return Err(HttpError::DoubleResponse);
        }

        let body = body.into();

        self.response_headers.insert("X-Powered-By", POWERED_BY);
        self.response_headers.insert("Access-Control-Allow-Origin", "*");

        let mut builder = ResponseBuilder::new(status).header("Connection", self.connection.as_str());
        if !body.is_empty() {
            let content_type = content_type.filter(|c| !c.trim().is_empty()).unwrap_or("text/html");
            builder = builder.header("Content-Type", content_type);
        }

        let mut response = builder
            .header("Content-Length", body.len().to_string())
            .headers(self.response_headers.iter())
            .body(body)
            .build();
        response.set_cookies = std::mem::take(&mut self.set_cookies);

        self.response = Some(response);
        Ok(())
    }

    /// 200 with a body, `application/json` unless told otherwise.
    pub fn write_success(
        &mut self,
        body: impl Into<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Result<(), HttpError> {
        let content_type = content_type.unwrap_or("application/json");
        self.write_response(StatusCode::Ok, body, Some(content_type))
    }

    /// 404 with the given message, or a stock one.
    pub fn write_failure(&mut self, message: Option<&str>) -> Result<(), HttpError> {
        self.write_response(StatusCode::NotFound, message.unwrap_or(NOT_FOUND_BODY), None)
    }

    /// 401, adding a Basic `WWW-Authenticate` challenge when `realm` is set.
    pub fn write_auth_required(
        &mut self,
        realm: Option<&str>,
        message: Option<&str>,
    ) -> Result<(), HttpError> {
        if let Some(realm) = realm {
            self.set_header("WWW-Authenticate", format!("Basic realm=\"{}\"", realm));
        }
        self.write_response(
            StatusCode::Unauthorized,
            message.unwrap_or(AUTH_REQUIRED_BODY),
            None,
        )
    }

    /// 500 that also forces the connection closed.
    pub(crate) fn write_server_failure(&mut self) -> Result<(), HttpError> {
        self.force_close();
        self.write_response(StatusCode::InternalServerError, SERVER_FAILURE_BODY, None)
    }

    pub(crate) fn force_close(&mut self) {
        self.connection = "close".to_string();
        if let Some(response) = self.response.as_mut() {
            response.headers.insert("Connection", "close");
        }
    }

    /// Ends the exchange, returning its response and keep-alive decision.
    /// An exchange nobody answered gets an empty 200.
    pub(crate) fn finish(mut self) -> (Response, bool) {
        if self.response.is_none() {
            // Cannot fail: no response has been written yet.
            let _ = self.write_response(StatusCode::Ok, Vec::new(), None);
        }
        let keep_alive = self.keep_alive();
        let response = self
            .response
            .take()
            .unwrap_or_else(server_failure_response);
        (response, keep_alive)
    }
}

/// The 500 sent when a request could not even be parsed.
pub(crate) fn server_failure_response() -> Response {
    let body = SERVER_FAILURE_BODY.as_bytes().to_vec();
    ResponseBuilder::new(StatusCode::InternalServerError)
        .header("Connection", "close")
        .header("Content-Type", "text/html")
        .header("Content-Length", body.len().to_string())
        .header("X-Powered-By", POWERED_BY)
        .header("Access-Control-Allow-Origin", "*")
        .body(body)
        .build()
}
