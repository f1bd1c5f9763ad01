//! Message passing between the restricted and privileged contexts.
//!
//! The two contexts share nothing but an unaddressed broadcast channel:
//! every listener sees every message. [`MessageBus`] models that channel
//! with explicit tag filtering at subscription time, and [`RelayClient`]
//! layers request/response correlation with a deadline on top of it.

// Library code reports through tracing, never directly to the terminal.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod channel;
mod client;

pub use channel::ContextOrigin;
pub use channel::Envelope;
pub use channel::LocalBus;
pub use channel::MessageBus;
pub use channel::MessageFilter;
pub use channel::Subscription;
pub use client::BusError;
pub use client::DEFAULT_REQUEST_TIMEOUT;
pub use client::RelayClient;
