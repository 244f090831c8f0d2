//! Service records as stored by the registry backend.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single running instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Node {
    /// Instance identifier, unique within a service version.
    pub id: String,
    /// Network address (`host:port`).
    pub address: String,
    /// Free-form instance metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// An endpoint exposed by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Endpoint {
    /// Endpoint name, e.g. `Greeter.Hello`.
    pub name: String,
    /// Request type description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<serde_json::Value>,
    /// Response type description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    /// Free-form endpoint metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A named, versioned set of endpoints and nodes.
///
/// Identity within a domain is `(name, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Service {
    /// Service name, e.g. `go.micro.service.greeter`.
    pub name: String,
    /// Service version.
    #[serde(default)]
    pub version: String,
    /// Free-form service metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Exposed endpoints.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Running instances.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Service {
    /// Creates a service with no metadata, endpoints or nodes.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            metadata: HashMap::new(),
            endpoints: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Adds a node, builder style.
    #[must_use]
    pub fn with_node(mut self, id: impl Into<String>, address: impl Into<String>) -> Self {
        self.nodes.push(Node {
            id: id.into(),
            address: address.into(),
            metadata: HashMap::new(),
        });
        self
    }

    /// Returns `true` if `other` has the same `(name, version)` identity.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}
