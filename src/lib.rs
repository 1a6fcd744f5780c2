//! Discord relay bot: forwards allow-listed channel conversations to an
//! OpenAI-compatible completion API and threads the replies back.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod subsystems;
