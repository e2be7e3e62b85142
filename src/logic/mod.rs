pub mod odm;
pub mod populate;
pub mod resolve;
pub mod sections;
pub mod validate;

pub use odm::*;
pub use populate::*;
pub use resolve::*;
pub use sections::*;
pub use validate::SchemaValidator;
