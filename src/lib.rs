/* src/lib.rs */

// Re-export modules for both binary and tests
pub mod builder;
pub mod control;
pub mod error;
pub mod logger;
pub mod parse;
pub mod plan;
pub mod registry;
pub mod runtime;
pub mod service;
pub mod shutdown;

pub use builder::build_registry;
pub use error::{ConfigError, EngineError, LoadError, RegistryError};
pub use parse::{ConfigFile, ConfigSource};
pub use registry::Registry;
pub use runtime::Watchdog;
pub use service::ServiceSpec;
pub use shutdown::{ShutdownCoordinator, Shutdowner};
