//! Connection Dispatcher
//!
//! Manages individual client connections. Each accepted socket is handled
//! by its own async task running the dispatcher loop:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                      (main.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │ Read bytes  │──►│Decode frame │──►│ Execute cmd │        │
//! │  └─────────────┘   └─────────────┘   └──────┬──────┘        │
//! │         ▲                                   │               │
//! │         │                            ┌──────▼──────┐        │
//! │         └────────────────────────────│ Write reply │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Tokio tasks, one per connection, no shared buffers
//! - **Pipelining**: every complete frame in the buffer is served before
//!   the next read
//! - **Pub/sub delivery**: subscribed connections service their delivery
//!   mailbox alongside the socket
//! - **Statistics**: connection and command counters shared with `INFO`
//!   consumers and tests

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
