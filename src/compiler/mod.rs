pub mod connections;
pub mod graph;
pub mod loader;
pub mod validator;
