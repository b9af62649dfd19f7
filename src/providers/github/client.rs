mod core;
mod pulls;

pub use self::core::GitHubClient;
pub use pulls::{PullRequestDto, RequestedReviewersDto};
