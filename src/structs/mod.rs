/// Allow normal error handling from structs
pub use super::Result;

mod infrastructure;
pub use self::infrastructure::Infrastructure;

mod field;
pub use self::field::{DefaultHandling, FieldDef, FieldType, Visibility};

mod volume;
pub use self::volume::{VolumeKind, VolumeSpec};

mod healthcheck;
pub use self::healthcheck::HealthCheck;

mod network;
pub use self::network::Network;

mod release;
pub use self::release::Release;
