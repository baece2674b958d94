pub mod bootstrap;
pub mod descriptor;
pub mod lifecycle;

pub use descriptor::{EnvironmentBuilder, EnvironmentDescriptor, ServiceExposure};
pub use lifecycle::{with_running_environment, RunningEnvironment};
