mod poller;
mod state;

pub(crate) use poller::AdaptivePoller;
pub use poller::PollStrategy;
pub use state::{preferred_screen, Screen};
