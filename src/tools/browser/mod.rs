//! Browser automation module
//!
//! Remote browser backends, session provisioning, and the tool executor that
//! drives them.

pub mod backend;
mod executor;
pub mod remote;
pub mod sessions;

pub use backend::{BrowserBackend, BrowserError, BrowserResult, LOCATION_INSTRUCTION};
pub use executor::ToolExecutor;
pub use remote::RemoteBrowser;
pub use sessions::{BrowserbaseSessions, SessionInfo, SessionProvider};
