use std::any::Any;

use super::{Resource, ResourceId, ResourceKind, UpdatePolicy};

/// Shader program sources. Compilation belongs to the driver; failures are
/// reported through the resource status message.
#[derive(Debug)]
pub struct Shader {
    id: ResourceId,
    vertex_source: String,
    fragment_source: String,
    policy: UpdatePolicy,
}

impl Shader {
    #[must_use]
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            id: ResourceId::next(),
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            policy: UpdatePolicy::Manual,
        }
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }
}

impl Resource for Shader {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Shader
    }

    fn update_policy(&self) -> UpdatePolicy {
        self.policy
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
