// Synchronization controller: the push channel, the poll and refresh
// timers, and the command dispatcher that ties user actions to the API.

pub mod channel;
pub mod dispatcher;
pub mod poller;
pub mod refresh;

#[cfg(test)]
pub(crate) mod support;

pub use channel::{ChannelSupervisor, ConnectionState};
pub use dispatcher::CommandDispatcher;
pub use poller::ScanPoller;
pub use refresh::RefreshScheduler;
