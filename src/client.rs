//! Session client for the notebook service.
//!
//! Owns one scraped session and drives create-notebook, add-source, run-tool
//! and artifact polling over the batch-RPC protocol. All remote failures are
//! returned unmodified; classification happens in the orchestrator.

pub mod scrape;
pub mod session;
pub mod transport;

pub use session::{ClientTimings, SessionClient, SessionContext};
pub use transport::{HttpResponse, ReqwestTransport, RpcRequest, Transport};
