pub mod admin;
pub mod aggregator;
pub mod auth;
pub mod category;
pub mod config;
pub mod fetcher;
pub mod logger;
pub mod post;
pub mod selector;
pub mod server;
pub mod store;
pub mod uploader;
mod query_string;
mod test_data;
mod view;
