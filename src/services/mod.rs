//! Services layer - Business logic
//!
//! Services sit between the web layer and the repositories. They are
//! responsible for:
//! - Enforcing the data rules (staff authors, lowercase tags, slug format)
//! - Combining batch queries into fully populated posts
//! - Mapping storage failures into typed errors

pub mod comment;
pub mod post;
pub mod tag;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use post::{generate_slug, validate_slug, PostService, PostServiceError};
pub use tag::{normalize_tag_title, TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
