pub mod capabilities;
pub mod events;
pub mod ids;
pub mod record;

pub use capabilities::QueueCapabilities;
pub use events::JobEvent;
pub use ids::{JobId, LeaseToken};
pub use record::{JobRecord, JobStatus, LeasedJob};
