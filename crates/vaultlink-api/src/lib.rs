// vaultlink-api: Async Rust client for a router's JSON-RPC management API

pub mod auth;
pub mod client;
pub mod clients;
pub mod crypt;
pub mod error;
pub mod rpc;
pub mod session;
pub mod system;
pub mod transport;

pub use client::RouterClient;
pub use crypt::{CryptAlgorithm, login_hash, md5_crypt};
pub use error::{Error, ErrorKind};
pub use rpc::Params;
pub use session::AuthState;
pub use transport::{TlsMode, TransportConfig};
