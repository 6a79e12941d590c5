//! Core data model: tag names, posts, and tag relationships.

pub mod post;
pub mod relationship;
pub mod tag_name;

pub use post::Post;
pub use relationship::{RelationKind, RelationStatus, Relationship, TransitionError};
pub use tag_name::TagName;
