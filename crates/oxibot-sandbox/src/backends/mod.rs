//! Built-in sandbox backend implementations.

pub mod srt;
