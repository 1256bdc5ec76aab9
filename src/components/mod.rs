//! Pluggable crawler components
//!
//! A crawl is assembled from four kinds of component:
//! - a transport that sends HTTP requests ([`Transport`] / [`AsyncTransport`])
//! - a parser that turns a response into structured content ([`ResponseParser`])
//! - a data handler that post-processes the parsed content ([`DataHandler`])
//! - a persistence sink that stores the result ([`crate::persistence::PersistenceSink`])
//!
//! The reqwest-backed transports and the JSON/HTML parsers in this module
//! are ready-made implementations; any other implementation of the traits
//! plugs into the crawler roles the same way.

mod handler;
mod http;
mod parser;
mod transport;

pub use handler::{DataHandler, PassThrough, Row, RowHandler};
pub use http::{
    build_async_client, build_blocking_client, user_agent_string, AsyncReqwestTransport,
    HttpResponse, ReqwestTransport,
};
pub use parser::{
    HtmlTableParser, JsonParser, JsonRowsParser, ResponseParser, DEFAULT_ROW_SELECTOR,
};
pub use transport::{AsyncTransport, HttpMethod, RequestDescriptor, Transport};
