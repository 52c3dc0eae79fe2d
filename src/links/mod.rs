pub mod code;
pub mod error;
pub mod service;

pub use error::{ErrorResponse, LinkError};
pub use service::{LinkService, NewLink};
