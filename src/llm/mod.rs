pub mod provider;
pub mod providers;
pub mod reasoner;
pub mod registry;
pub mod sse_parser;
pub mod types;
