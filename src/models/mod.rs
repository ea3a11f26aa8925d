//! Data types exchanged with the transport and with cache consumers.

pub mod requests;
pub mod responses;
pub mod view;

// Re-export commonly used types
pub use requests::RequestOptions;
pub use responses::HttpResponse;
pub use view::CacheView;
