use crate::model::LlmClient;
use std::fmt;
use std::sync::Arc;

/// A model client plus a marker recording whether it already carries
/// instrumentation.
///
/// The marker is explicit so resolution never wraps a client twice.
#[derive(Clone)]
pub struct ClientHandle {
    client: Arc<dyn LlmClient>,
    instrumented: bool,
}

impl ClientHandle {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client, instrumented: false }
    }

    /// Wrap a client that is already instrumented by the caller.
    pub fn instrumented(client: Arc<dyn LlmClient>) -> Self {
        Self { client, instrumented: true }
    }

    pub fn is_instrumented(&self) -> bool {
        self.instrumented
    }

    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    /// Apply `instrumentation` unless the handle is already marked.
    pub fn instrument_with(self, instrumentation: &dyn Instrumentation) -> Self {
        if self.instrumented {
            return self;
        }
        Self::instrumented(instrumentation.wrap(self.client))
    }
}

impl<C: LlmClient + 'static> From<Arc<C>> for ClientHandle {
    fn from(client: Arc<C>) -> Self {
        Self::new(client)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("client", &self.client.name())
            .field("instrumented", &self.instrumented)
            .finish()
    }
}

/// Hook applied to every resolved client, e.g. to emit tracing spans.
pub trait Instrumentation: Send + Sync {
    fn wrap(&self, client: Arc<dyn LlmClient>) -> Arc<dyn LlmClient>;
}

impl<F> Instrumentation for F
where
    F: Fn(Arc<dyn LlmClient>) -> Arc<dyn LlmClient> + Send + Sync,
{
    fn wrap(&self, client: Arc<dyn LlmClient>) -> Arc<dyn LlmClient> {
        self(client)
    }
}
