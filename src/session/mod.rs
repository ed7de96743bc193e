//! Browser sessions shared across a suite run
//!
//! A [`SessionPool`] is built once per suite run and handed to the runner.
//! It owns every session it launches and closes them in [`SessionPool::release_all`].

mod environment;
mod pool;

pub use environment::{BrowserInfo, Environment, HostInfo, UNKNOWN};
pub use pool::{node_address, HubLauncher, PoolEntry, SessionLauncher, SessionPool};
