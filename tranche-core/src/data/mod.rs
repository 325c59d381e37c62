//! Bar feed contract and in-memory replay feed

pub mod align;
pub mod feed;

pub use align::{Alignment, ReplayFeed};
pub use feed::{BarFeed, FeedRow};
