pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod github;
pub mod http;
pub mod package;
pub mod provision;
pub mod release;
pub mod runtime;
pub mod state;
pub mod target;
