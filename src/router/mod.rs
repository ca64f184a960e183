//! Central broker connecting the external caller and every worker.
//!
//! The router runs as a single event-loop task. It owns the connection
//! table, the registry of worker names and the table of pending forwards;
//! nothing else touches them. Other components talk to it through a
//! [`RouterHandle`] or by sending envelopes on their connection.
//!
//! Inbound envelopes are handled in this order:
//!
//! 1. a reply whose request id matches a pending forward is relayed verbatim
//!    to the connection that issued the forward
//! 2. `register` binds a worker name to the sending connection
//! 3. `user-message` is validated, then either run as a `/config` command or
//!    delivered according to the [`DeliveryPolicy`]
//! 4. `forward` records the sender and delivers the inner envelope
//! 5. unmatched terminal envelopes reach the caller as `agent-message`

mod builder;
mod command;
mod error;
mod event_loop;
mod handle;
mod registry;
mod settings;

pub use builder::{Router, RouterBuilder};
pub use command::{ConfigCommand, ConfigCommandError};
pub use error::RouterError;
pub use handle::{RegisteredWorker, RouterHandle, RouterSnapshot};
pub use registry::ConnectionId;
pub use settings::{DeliveryPolicy, RouterSettings};

#[cfg(test)]
mod tests;
