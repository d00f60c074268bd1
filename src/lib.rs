pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod journal;
pub mod output;
pub mod policy;
pub mod provider;
pub mod settings;
pub mod store;
