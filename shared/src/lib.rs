mod comment;
mod item;

#[cfg(feature = "github")]
pub mod github;

pub use comment::*;
pub use item::*;

pub type GithubHandle = String;
