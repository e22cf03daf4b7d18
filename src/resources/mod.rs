//! Resources managed by the provider.

pub mod gitlab_runner;

pub use gitlab_runner::{GitLabRunnerModel, GitLabRunnerResource};
