pub mod controller;
pub mod protocol;
mod receiver;
mod sender;
mod session;

pub use controller::{SessionController, StopOutcome};
pub use session::RESAMPLE_HEADER;
