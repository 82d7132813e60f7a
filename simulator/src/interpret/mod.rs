pub mod client;

pub use client::InterpretationClient;
