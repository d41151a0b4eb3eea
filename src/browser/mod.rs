pub mod chrome;
pub mod dom;

pub use chrome::{ChromeSession, ConnectionMode};
