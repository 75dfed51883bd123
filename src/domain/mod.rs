pub mod format;
pub mod metrics;
pub mod payload;
pub mod snapshot;

pub use format::*;
pub use metrics::*;
pub use payload::*;
pub use snapshot::*;
