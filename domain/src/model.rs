//! Supported-model descriptors.
//!
//! A [`ModelDescriptor`] describes one backend model this agent can serve.
//! Descriptors are loaded from the registry file, advertised to the
//! coordinator at registration, and consulted by the task runner to resolve
//! the backend base URL for an instruction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operational status of a backend model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelStatus {
    Loading,
    #[default]
    Ready,
    Error,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Loading => "LOADING",
            ModelStatus::Ready => "READY",
            ModelStatus::Error => "ERROR",
        }
    }
}

/// One model served by this agent. Identity is `id`.
///
/// `backend_base` is local routing information and is never sent to the
/// coordinator; everything else is part of the advertised snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub capabilities: HashMap<String, String>,
    #[serde(default)]
    pub backend_engine: String,
    /// Base URL of the OpenAI-compatible endpoint serving this model,
    /// e.g. `http://localhost:11434/v1`.
    pub backend_base: String,
    #[serde(default)]
    pub status: ModelStatus,
    /// Current load, 0–100.
    #[serde(default)]
    pub current_load_factor: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&ModelStatus::Loading).unwrap();
        assert_eq!(json, "\"LOADING\"");
        let back: ModelStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ModelStatus::Loading);
    }

    #[test]
    fn descriptor_deserializes_with_defaults() {
        let toml = r#"
            id = "m1"
            backend_base = "http://localhost:11434/v1"
        "#;
        let m: ModelDescriptor = toml::from_str(toml).unwrap();
        assert_eq!(m.id, "m1");
        assert_eq!(m.status, ModelStatus::Ready);
        assert!(m.capabilities.is_empty());
        assert_eq!(m.current_load_factor, 0);
    }
}
