//! Client core for the DocuChat question answering service.
//!
//! [`controller::QueryController`] owns the lifecycle of a single query,
//! [`citations::normalize`] turns response hits into displayable citations, and
//! [`api::ApiClient`] is the HTTP transport behind them.

pub mod api;
pub mod citations;
pub mod config;
pub mod constants;
pub mod controller;

pub use api::{ApiClient, ChatTransport, QueryParams, QueryRequest};
pub use citations::{Hit, Locator};
pub use config::Config;
pub use controller::{Dispatch, QueryController, QueryState, RequestToken};
