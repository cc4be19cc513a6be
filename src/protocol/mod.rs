//! Pure hypermedia protocol helpers.
//!
//! Nothing in this module performs I/O. It turns relation names and parameters into
//! concrete URLs and builds the header set every request carries.
//!
//! ```text
//! protocol/
//! ├── headers  - standard headers, RequestOptions
//! ├── link     - resolve_link, build_url
//! └── template - RFC 6570 expansion
//! ```

mod headers;
mod link;
mod template;

pub use headers::{
    header_names, standard_headers, RequestOptions, ALLOWED_METHODS, JSON_MEDIA_TYPE,
};
pub(crate) use headers::with_json_body;
pub(crate) use link::append_query;
pub use link::{build_url, build_url_overriding, resolve_link};
pub use template::{expand, Expansion};
