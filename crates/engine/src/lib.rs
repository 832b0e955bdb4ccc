//! AI RPG engine library.
//!
//! ## Structure
//!
//! - `infrastructure/` - Port traits and their adapters (LLM, files, clock, config)
//! - `prompt_templates` - Prompt catalogue with env/file overrides
//! - `use_cases/` - Turn processing, content generation and game sessions
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod prompt_templates;
pub mod use_cases;

pub use app::App;
