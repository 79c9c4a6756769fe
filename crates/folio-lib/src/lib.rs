// folio-lib: gallery, Dropbox client and asset cache behind the `folio` binary

pub mod cache;
pub mod cli;
pub mod cloud;
pub mod commands;
pub mod config;
pub mod errors;
pub mod gallery;
pub mod http_client;
pub mod logger;
pub mod output;
