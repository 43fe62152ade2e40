//! API request handlers

mod artifacts;
mod codegen;
mod compile;
mod health;
mod jobs;

pub use artifacts::*;
pub use codegen::*;
pub use compile::*;
pub use health::*;
pub use jobs::*;
