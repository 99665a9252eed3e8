// Server module entry point
// Listener setup, connection handling and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

#[path = "loop.rs"]
mod server_loop;

pub use listener::create_reusable_listener;
pub use server_loop::start_server_loop;
