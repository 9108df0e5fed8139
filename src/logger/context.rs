use uuid::Uuid;

/// Correlation context for one request. Created by the context
/// middleware (or on demand) and carried through request extensions so
/// every log line and error response can be tied back to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    context_id: String,
}

impl RequestContext {
    /// Creates a context with a freshly generated correlation id.
    pub fn new() -> Self {
        Self {
            context_id: Uuid::new_v4().to_string(),
        }
    }

    /// Adopts a caller-supplied correlation id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            context_id: id.into(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
