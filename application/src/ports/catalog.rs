//! Model catalog port
//!
//! Read-only view of the models this agent can serve. The registry behind it
//! may be mutated concurrently (live reload, admin surface); `snapshot`
//! returns one coherent generation, so a mid-task registry change never
//! affects an in-flight task.

use tokiame_domain::ModelDescriptor;

/// Read-coherent snapshot access to the supported-model list.
pub trait ModelCatalog: Send + Sync {
    /// Returns all descriptors of the current generation, in registry order.
    fn snapshot(&self) -> Vec<ModelDescriptor>;

    /// Looks up one model of the current generation by id.
    fn find(&self, model_id: &str) -> Option<ModelDescriptor> {
        self.snapshot().into_iter().find(|m| m.id == model_id)
    }
}
