pub mod errors;
pub mod logging;
pub mod shutdown;

pub use errors::{HostError, HostResult};
pub use logging::init_logging;
pub use shutdown::{cancellable, ShutdownCoordinator};
