pub mod client;
pub mod config;
pub mod exception;
pub mod param;
pub mod request;
pub mod resolver;
pub mod response;
pub mod server;
pub mod util;

pub use client::{ClientSession, ClientState};
pub use config::{ClientConfig, ServerConfig};
pub use exception::Exception;
pub use param::{ConnectionDirective, Endpoint, HttpRequestMethod, HttpVersion, SessionMode};
pub use request::Request;
pub use resolver::{FileResolver, Resolve};
pub use response::Response;
pub use server::{Server, ServerSession, SessionState, SessionSummary};
