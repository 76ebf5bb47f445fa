/// TOML configuration (`quill.toml`).
pub mod toml_config;
