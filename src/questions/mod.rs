/// Built-in prompt tables and the draw used at game start.
pub mod bank;
/// Generated prompts and their fallback.
pub mod generator;
