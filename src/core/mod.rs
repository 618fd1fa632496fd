pub mod connection;
pub mod dispatcher;
pub mod health;
pub mod host;
pub mod naming;
pub mod orchestrator;
pub mod protocol;
pub mod registry;

pub use connection::{ConnectionFactory, ProviderConnection, RpcConnection, SseConnectionFactory};
pub use dispatcher::{CapabilityDescriptor, Dispatcher, InvocationResult, ToolInvocation};
pub use health::HealthMonitor;
pub use host::Host;
pub use naming::{CompositeName, NameCodec, SEPARATOR};
pub use orchestrator::{CompletionOrchestrator, CompletionOutcome};
pub use registry::{CapabilitySnapshot, HealthRecord, Registry};
