pub mod feed;

pub use feed::FeedHandler;
