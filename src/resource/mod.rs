//! Resource Module
//!
//! One generic cache service parameterized per resource, plus the registry
//! that shares it across consumers.
//!
//! # Resources
//! - `clientes` - `GET /clientes/`, identified by `cedula`
//! - `productos` - `GET /productos/`, identified by `id`
//! - `usuarios` - `GET /usuarios/`, identified by `id`

mod cache;
mod config;
mod registry;

pub use cache::ResourceCache;
pub use config::{ResourceConfig, CLIENTES, DEFAULT_ID_FIELD, PRODUCTOS, USUARIOS};
pub use registry::CacheRegistry;
