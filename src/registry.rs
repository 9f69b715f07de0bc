//! Service registry.
//!
//! Holds every service definition in declaration order and enforces the
//! engine's acceptance rules: unique names, usable binaries, priorities in
//! range, resolvable users, and dependencies that name registered services.

use crate::error::{RegistryError, UnknownDependency};
use crate::service::{split_args, ServiceSpec, ServiceUser};
use nix::unistd::User;
use std::time::Duration;
use tracing::debug;

/// Lowest accepted priority. Lower values start earlier.
pub const MIN_PRIORITY: i32 = -20;
/// Highest accepted priority.
pub const MAX_PRIORITY: i32 = 19;

#[derive(Debug, Default)]
pub struct Registry {
    services: Vec<ServiceSpec>,
}

/// Mutable access to one registered service, returned by [`Registry::add_service`].
/// Each setter touches exactly one field of that service.
#[derive(Debug)]
pub struct ServiceHandle<'a> {
    spec: &'a mut ServiceSpec,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with `binary`, rejecting duplicate names and binaries
    /// that can never be executed.
    pub fn add_service(&mut self, name: &str, binary: &str) -> Result<ServiceHandle<'_>, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.get(name).is_some() {
            return Err(RegistryError::DuplicateService { name: name.to_string() });
        }
        check_binary(name, binary)?;

        debug!(service = %name, binary = %binary, "service registered");
        self.services.push(ServiceSpec::new(name, binary));
        let idx = self.services.len() - 1;
        Ok(ServiceHandle {
            spec: &mut self.services[idx],
        })
    }

    pub fn get(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Services in registration order.
    pub fn services(&self) -> &[ServiceSpec] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Checks that every dependency names a registered service. Runs once all
    /// services are loaded, so declaration order does not matter.
    pub fn validate(&self) -> Result<(), UnknownDependency> {
        for spec in &self.services {
            if let Some(dep) = &spec.dependency {
                if self.get(dep).is_none() {
                    return Err(UnknownDependency {
                        service: spec.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn into_services(self) -> Vec<ServiceSpec> {
        self.services
    }
}

fn check_binary(name: &str, binary: &str) -> Result<(), RegistryError> {
    let reason = if binary.trim().is_empty() {
        "empty path"
    } else if binary.contains('\0') {
        "contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidBinary {
        name: name.to_string(),
        binary: binary.to_string(),
        reason,
    })
}

fn lookup_user(name: &str) -> Result<ServiceUser, RegistryError> {
    match User::from_name(name) {
        Ok(Some(user)) => Ok(ServiceUser {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
        }),
        Ok(None) => Err(RegistryError::UnknownUser { user: name.to_string() }),
        Err(source) => Err(RegistryError::UserLookup {
            user: name.to_string(),
            source,
        }),
    }
}

impl ServiceHandle<'_> {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Replaces the argument list with the whitespace-separated words of `args`.
    pub fn add_args(&mut self, args: &str) {
        self.spec.args = split_args(args);
    }

    pub fn add_dependency(&mut self, name: &str) {
        self.spec.dependency = Some(name.to_string());
    }

    pub fn set_priority(&mut self, priority: i32) -> Result<(), RegistryError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(RegistryError::PriorityOutOfRange {
                priority,
                min: MIN_PRIORITY,
                max: MAX_PRIORITY,
            });
        }
        self.spec.priority = priority;
        Ok(())
    }

    pub fn set_term_timeout(&mut self, timeout: Duration) {
        self.spec.term_timeout = timeout;
    }

    /// Resolves `user` against the system user database.
    pub fn set_user(&mut self, user: &str) -> Result<(), RegistryError> {
        self.spec.user = Some(lookup_user(user)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::DEFAULT_TERM_TIMEOUT;

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = Registry::new();
        reg.add_service("web", "/bin/web").unwrap();
        let err = reg.add_service("web", "/bin/other").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateService { ref name } if name == "web"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("web").unwrap().binary, "/bin/web");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut reg = Registry::new();
        reg.add_service("web", "/bin/web").unwrap();
        reg.add_service("Web", "/bin/web").unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_unusable_binary_rejected() {
        let mut reg = Registry::new();
        assert!(matches!(
            reg.add_service("web", "   "),
            Err(RegistryError::InvalidBinary { .. })
        ));
        assert!(matches!(
            reg.add_service("web", "/bin/w\0eb"),
            Err(RegistryError::InvalidBinary { .. })
        ));
        assert!(matches!(reg.add_service("", "/bin/web"), Err(RegistryError::EmptyName)));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_defaults_after_add() {
        let mut reg = Registry::new();
        reg.add_service("web", "/bin/web").unwrap();
        let spec = reg.get("web").unwrap();
        assert!(spec.args.is_empty());
        assert_eq!(spec.dependency, None);
        assert_eq!(spec.priority, 0);
        assert_eq!(spec.term_timeout, DEFAULT_TERM_TIMEOUT);
        assert_eq!(spec.user, None);
    }

    #[test]
    fn test_priority_range() {
        let mut reg = Registry::new();
        let mut svc = reg.add_service("web", "/bin/web").unwrap();
        assert!(svc.set_priority(MIN_PRIORITY).is_ok());
        assert!(svc.set_priority(MAX_PRIORITY).is_ok());
        assert!(matches!(
            svc.set_priority(MAX_PRIORITY + 1),
            Err(RegistryError::PriorityOutOfRange { priority: 20, .. })
        ));
        assert_eq!(reg.get("web").unwrap().priority, MAX_PRIORITY);
    }

    #[test]
    fn test_set_user_resolves_root() {
        let mut reg = Registry::new();
        let mut svc = reg.add_service("web", "/bin/web").unwrap();
        svc.set_user("root").unwrap();
        let user = reg.get("web").unwrap().user.clone().unwrap();
        assert_eq!(user.uid, 0);
    }

    #[test]
    fn test_set_user_unknown() {
        let mut reg = Registry::new();
        let mut svc = reg.add_service("web", "/bin/web").unwrap();
        let err = svc.set_user("no-such-user-watchdog").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownUser { .. }));
        assert_eq!(reg.get("web").unwrap().user, None);
    }

    #[test]
    fn test_forward_dependency_validates() {
        let mut reg = Registry::new();
        reg.add_service("api", "/bin/api").unwrap().add_dependency("db");
        reg.add_service("db", "/bin/db").unwrap();
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn test_unknown_dependency_fails_validation() {
        let mut reg = Registry::new();
        reg.add_service("api", "/bin/api").unwrap().add_dependency("db");
        let err = reg.validate().unwrap_err();
        assert_eq!(err.service, "api");
        assert_eq!(err.dependency, "db");
    }
}
