pub mod article;
pub mod author;
pub mod comment;
pub mod common;
pub mod document;
pub mod filter;
pub mod populate;
pub mod post;
pub mod reference;
pub mod schema;
pub mod section;
pub mod spotlight;

pub use article::*;
pub use author::*;
pub use comment::*;
pub use common::*;
pub use document::*;
pub use filter::*;
pub use populate::*;
pub use post::*;
pub use reference::*;
pub use schema::*;
pub use section::*;
pub use spotlight::*;
