//! Language model access
//!
//! The agent loop depends only on the `LanguageModel` trait; `OpenAiChat`
//! is the production implementation.

mod openai;
#[cfg(test)]
mod scripted;
mod traits;

pub use openai::OpenAiChat;
#[cfg(test)]
pub use scripted::ScriptedModel;
pub use traits::*;
