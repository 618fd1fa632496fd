pub mod sse;
pub mod traits;

pub use sse::SseTransport;
pub use traits::Transport;
