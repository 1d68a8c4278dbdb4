//! HTTP protocol implementation.
//!
//! A small HTTP/1.1 server layer with keep-alive support, read straight off
//! a byte stream.
//!
//! # Architecture
//!
//! - **`connection`**: The per-socket request/response state machine
//! - **`exchange`**: One request plus the single response written for it
//! - **`parser`**: Line-oriented request parsing from a buffered stream
//! - **`headers`**: Case-insensitive, order-preserving header map
//! - **`request`**: HTTP request representation
//! - **`response`**: Status codes and the response value
//! - **`writer`**: Serializes and writes responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Parse request line, headers, cookies, body
//!        └──────┬──────┘
//!               │ Request received (parse failure → 500, close)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Dispatch, else static files
//!        └──────┬───────────┘
//!               │ Response recorded
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Connection != close → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod error;
pub mod exchange;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
