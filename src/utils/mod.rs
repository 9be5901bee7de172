//! Cross-cutting helpers.
//!
//! - `logging`: Tracing subscriber initialization.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
