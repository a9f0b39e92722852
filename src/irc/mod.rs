mod client;
mod message;
mod transport;

pub use client::Client;
