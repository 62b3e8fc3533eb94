pub mod merger;
pub mod subqueries;

pub use merger::{merge_feed_queries, MergeParams};
pub use subqueries::{
    FeedSubquery, FixedSlotSubquery, RecommendationsSubquery, SortedPostsSubquery,
};
