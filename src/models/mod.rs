mod link;

pub use link::{CreateLinkRequest, LinkPage, LinkPatch, ShortLink, UpdateLinkRequest};
