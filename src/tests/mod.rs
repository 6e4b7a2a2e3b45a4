pub mod client;
pub mod context;
pub mod io;
pub mod webhook;
