//! Error types for the watchdog.

use std::path::PathBuf;
use thiserror::Error;

/// The configuration source could not be read or parsed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported value for {section}.{option}: expected a scalar")]
    UnsupportedValue { section: String, option: String },

    #[error("no option {option} in section {section}")]
    NoOption { section: String, option: String },
}

/// The engine refused a service definition or one of its attributes.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("service name must not be empty")]
    EmptyName,

    #[error("service {name} already registered")]
    DuplicateService { name: String },

    #[error("service {name} has unusable binary {binary:?}: {reason}")]
    InvalidBinary {
        name: String,
        binary: String,
        reason: &'static str,
    },

    #[error("priority {priority} out of range {min}..={max}")]
    PriorityOutOfRange { priority: i32, min: i32, max: i32 },

    #[error("unknown user {user}")]
    UnknownUser { user: String },

    #[error("failed to look up user {user}: {source}")]
    UserLookup {
        user: String,
        #[source]
        source: nix::Error,
    },

    #[error(transparent)]
    UnknownDependency(#[from] UnknownDependency),
}

/// A service names a dependency that is not registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("service {service} depends on unknown service {dependency}")]
pub struct UnknownDependency {
    pub service: String,
    pub dependency: String,
}

/// Fatal errors raised while turning configuration into a registry.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("service {section} has missing {option} option")]
    MissingOption { section: String, option: String },

    #[error("service {section} has invalid {option} {value:?}: {reason}")]
    Validation {
        section: String,
        option: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to add service {section}: {source}")]
    Registration {
        section: String,
        #[source]
        source: RegistryError,
    },
}

/// Errors raised by the supervision engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid registry: {0}")]
    InvalidRegistry(#[from] RegistryError),

    #[error("dependency cycle involving services: {}", .services.join(", "))]
    DependencyCycle { services: Vec<String> },

    #[error("failed to spawn {service}: {source}")]
    Spawn {
        service: String,
        #[source]
        source: std::io::Error,
    },
}
