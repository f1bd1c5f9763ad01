//! Root of the `ytqf-core` library.
//!
//! Everything that runs in the privileged context: capturing the host
//! session, signing and sending edit calls, walking the variant cascade,
//! and the bus listener that exposes all of it to the restricted side.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output goes through the binary or the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod bridge;
pub mod cascade;
pub mod classify;
pub mod config;
pub mod executor;
pub mod favorites;
pub mod session;
pub mod transport;
mod value;

pub use bridge::Bridge;
pub use config::ConfigLoadError;
pub use config::ConfigLoader;
pub use config::RelayConfig;
pub use executor::ExecutorError;
pub use executor::Exhaustion;
pub use executor::MutationExecutor;
pub use favorites::FavoriteCollection;
pub use favorites::FavoritesError;
pub use favorites::FavoritesStore;
pub use session::CookieJar;
pub use session::CookieStore;
pub use session::RuntimeConfig;
pub use session::SessionError;
pub use session::SessionProvider;
pub use session::SnapshotSession;
pub use transport::EditTransport;
pub use transport::HttpTransport;
