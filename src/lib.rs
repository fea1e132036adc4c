//! chatrelay - thin HTTP relay for hosted chat models
//!
//! Accepts a chat conversation from a client, forwards it to a hosted
//! completion API using a server-side credential, and returns the reply in a
//! stable `{"choices": [{"message": {"content": ...}}]}` shape, optionally
//! with synthesized speech.

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod telemetry;
pub mod upstream;
