pub mod cli;
pub mod config;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod handler;
pub mod llm;
pub mod logging;
pub mod model;
pub mod prompt;
pub mod schema;
