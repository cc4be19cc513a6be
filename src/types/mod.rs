//! Core data types for hypermedia navigation.

mod link;
mod page;
mod params;
mod response;
mod root;

pub use bytes::Bytes;
pub use link::{Link, Linked, Links};
pub use page::{PageMetadata, PageRequest, Paged, PagedResource};
pub use params::Params;
pub(crate) use params::scalar_text;
pub use response::HttpResponse;
pub use root::RootResource;
