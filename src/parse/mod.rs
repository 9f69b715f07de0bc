/* src/parse/mod.rs */

mod ini;
mod yaml;

use crate::error::ConfigError;
use std::{fs, path::Path};

/// Section whose options are fallbacks for every other section.
/// It never becomes a service.
pub const DEFAULT_SECTION: &str = "default";

/// Read access to a sectioned key/value configuration.
pub trait ConfigSource {
    /// Section names in declaration order.
    fn sections(&self) -> Vec<String>;
    fn has_option(&self, section: &str, option: &str) -> bool;
    fn get_string(&self, section: &str, option: &str) -> Result<String, ConfigError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    options: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Section {
            name: name.to_string(),
            options: Vec::new(),
        }
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == option)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, option: &str, value: &str) {
        match self.options.iter_mut().find(|(k, _)| k == option) {
            Some((_, v)) => *v = value.to_string(),
            None => self.options.push((option.to_string(), value.to_string())),
        }
    }
}

/// A parsed configuration file, sections kept in the order they first appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    sections: Vec<Section>,
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the section, creating an empty one if needed.
    pub fn add_section(&mut self, name: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    pub fn set(&mut self, section: &str, option: &str, value: &str) {
        self.add_section(section).set(option, value);
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn lookup(&self, section: &str, option: &str) -> Option<&str> {
        self.section(section)
            .and_then(|s| s.get(option))
            .or_else(|| self.section(DEFAULT_SECTION).and_then(|s| s.get(option)))
    }

    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        ini::parse(text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        yaml::parse(text)
    }

    /*
        @@@
        @load();
        . Reads the whole file; any I/O error is returned with the offending path.
        . Files ending in .yml/.yaml go through serde_yaml, everything else is read as INI.
    */
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml_str(&text),
            _ => Self::from_ini_str(&text),
        }
    }
}

impl ConfigSource for ConfigFile {
    fn sections(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }

    fn has_option(&self, section: &str, option: &str) -> bool {
        self.lookup(section, option).is_some()
    }

    fn get_string(&self, section: &str, option: &str) -> Result<String, ConfigError> {
        self.lookup(section, option)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::NoOption {
                section: section.to_string(),
                option: option.to_string(),
            })
    }
}
