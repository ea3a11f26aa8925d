//! Per-resource cache parameters.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TTL_MS;

/// Resource name of the client collection.
pub const CLIENTES: &str = "clientes";
/// Resource name of the product collection.
pub const PRODUCTOS: &str = "productos";
/// Resource name of the user collection.
pub const USUARIOS: &str = "usuarios";

/// Identifying field used when a resource does not name one.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Binds a resource name to its endpoint, identifying field and TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Cache key, one store row per name
    pub name: String,
    /// Backend path returning the collection
    pub endpoint: String,
    /// Field that uniquely identifies an entity in the collection
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Freshness window in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

fn default_ttl_ms() -> u64 {
    DEFAULT_TTL_MS
}

impl ResourceConfig {
    /// Resource identified by `id` with the default TTL.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            id_field: default_id_field(),
            ttl_ms: DEFAULT_TTL_MS,
        }
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    // == Stock Resources ==
    /// Clients, keyed by their national id number.
    pub fn clientes() -> Self {
        Self::new(CLIENTES, "/clientes/").with_id_field("cedula")
    }

    pub fn productos() -> Self {
        Self::new(PRODUCTOS, "/productos/")
    }

    pub fn usuarios() -> Self {
        Self::new(USUARIOS, "/usuarios/")
    }
}
