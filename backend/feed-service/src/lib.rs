pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{FeedError, Result};
pub use handlers::FeedHandler;
pub use services::{merge_feed_queries, FeedSubquery, MergeParams};
