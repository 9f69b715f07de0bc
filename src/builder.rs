use crate::error::{LoadError, UnknownDependency};
use crate::parse::{ConfigSource, DEFAULT_SECTION};
use crate::registry::Registry;
use tracing::{debug, info};

pub fn read_optional_option<C: ConfigSource + ?Sized>(
    cfg: &C,
    section: &str,
    option: &str,
) -> Result<String, LoadError> {
    if !cfg.has_option(section, option) {
        return Ok(String::new());
    }
    Ok(cfg.get_string(section, option)?)
}

pub fn read_required_option<C: ConfigSource + ?Sized>(
    cfg: &C,
    section: &str,
    option: &str,
) -> Result<String, LoadError> {
    let value = read_optional_option(cfg, section, option)?;
    if value.is_empty() {
        return Err(LoadError::MissingOption {
            section: section.to_string(),
            option: option.to_string(),
        });
    }
    Ok(value)
}

fn invalid(section: &str, option: &'static str, value: &str, reason: impl ToString) -> LoadError {
    LoadError::Validation {
        section: section.to_string(),
        option,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/*
    @@@
    @build_service();
    . Reads binary (required) and registers the section under its own name; a rejected registration is fatal.
    . Attaches args, dependency, priority, term_timeout and user in that order, each only when present.
    . priority must parse as a base-10 integer, term_timeout as a duration such as "30s" or "2m".
    . Unknown dependency targets are left for Registry::validate, so forward references work.
*/
pub fn build_service<C: ConfigSource + ?Sized>(
    cfg: &C,
    registry: &mut Registry,
    section: &str,
) -> Result<(), LoadError> {
    let binary = read_required_option(cfg, section, "binary")?;
    let args = read_optional_option(cfg, section, "args")?;

    let mut svc = registry
        .add_service(section, &binary)
        .map_err(|source| LoadError::Registration {
            section: section.to_string(),
            source,
        })?;
    svc.add_args(&args);

    let dep = read_optional_option(cfg, section, "dependency")?;
    if !dep.is_empty() {
        svc.add_dependency(&dep);
    }

    let opt = read_optional_option(cfg, section, "priority")?;
    if !opt.is_empty() {
        let prio: i32 = opt
            .parse()
            .map_err(|e| invalid(section, "priority", &opt, e))?;
        svc.set_priority(prio)
            .map_err(|e| invalid(section, "priority", &opt, e))?;
    }

    let opt = read_optional_option(cfg, section, "term_timeout")?;
    if !opt.is_empty() {
        let timeout = humantime::parse_duration(&opt)
            .map_err(|e| invalid(section, "term_timeout", &opt, e))?;
        svc.set_term_timeout(timeout);
    }

    let user = read_optional_option(cfg, section, "user")?;
    if !user.is_empty() {
        svc.set_user(&user)
            .map_err(|e| invalid(section, "user", &user, e))?;
    }

    debug!(service = %svc.name(), "service configured");
    Ok(())
}

/*
    @@@
    @build_registry();
    . Builds every section except 'default' into the registry, stopping at the first error.
    . Once all sections are in, checks that every dependency names a loaded service.
    . Nothing is started here: an Err means the caller must not run anything.
*/
pub fn build_registry<C: ConfigSource + ?Sized>(cfg: &C) -> Result<Registry, LoadError> {
    let mut registry = Registry::new();
    for name in cfg.sections() {
        if name == DEFAULT_SECTION {
            continue;
        }
        build_service(cfg, &mut registry, &name)?;
    }

    registry
        .validate()
        .map_err(|UnknownDependency { service, dependency }| LoadError::Validation {
            reason: format!("no service named {} is configured", dependency),
            section: service,
            option: "dependency",
            value: dependency,
        })?;

    info!(services = registry.len(), "configuration loaded");
    Ok(registry)
}
