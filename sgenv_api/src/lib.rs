mod client;
mod errors;
pub mod types;
pub use self::client::{Client, DEFAULT_TIMEOUT};
pub use self::errors::Error;
