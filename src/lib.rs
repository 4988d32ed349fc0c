pub mod api;
pub mod compiler;
pub mod config;
pub mod dsl;
pub mod merge;
pub mod plugins;
pub mod runtime;
pub mod schema;
pub mod template;
