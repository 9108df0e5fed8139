use serde::{Deserialize, Serialize};

/// Placeholder domain entity demonstrating how the scaffold wires a
/// resource through handler, port, and adapter. Replace with real
/// entities when building on the scaffold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub id: u32,
    pub description: String,
}

impl Example {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }
}
