pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod server;
pub mod upstream;
pub mod utils;

pub use error::{RelayError, SessionError};
