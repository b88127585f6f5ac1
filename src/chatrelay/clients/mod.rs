//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular backend
//! while conforming to the uniform chatrelay contract.

pub mod common;

pub mod ollama;
pub mod openai_compat;
