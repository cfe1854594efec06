pub mod history;
pub mod session;
pub mod snapshot;
