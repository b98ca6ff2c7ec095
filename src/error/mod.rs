mod relay;
mod session;

pub use relay::RelayError;
pub use session::SessionError;
