use super::ConfigFile;
use crate::error::ConfigError;
use serde::Deserialize;
use serde_yaml::Value;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::UInt(u) => u.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/*
    @@@
    @parse();
    . Hands the raw YAML text to serde_yaml, expecting a mapping of section name to a mapping of options.
    . Mapping order is preserved so sections come out in file order.
    . Scalars (strings, numbers, booleans) become option strings; nested values are rejected.
*/
pub(super) fn parse(text: &str) -> Result<ConfigFile, ConfigError> {
    let mut cfg = ConfigFile::new();
    let root: Value = serde_yaml::from_str(text)?;

    let sections = match root {
        Value::Null => return Ok(cfg),
        Value::Mapping(map) => map,
        _ => {
            return Err(ConfigError::Syntax {
                line: 1,
                message: "top level must be a mapping of sections".to_string(),
            })
        }
    };

    for (name, body) in sections {
        let name = key_string(&name).ok_or_else(|| ConfigError::Syntax {
            line: 1,
            message: "section names must be scalars".to_string(),
        })?;
        cfg.add_section(&name);

        let options = match body {
            Value::Null => continue,
            Value::Mapping(options) => options,
            _ => {
                return Err(ConfigError::Syntax {
                    line: 1,
                    message: format!("section {} must be a mapping", name),
                })
            }
        };

        for (option, value) in options {
            let option = key_string(&option).ok_or_else(|| ConfigError::Syntax {
                line: 1,
                message: format!("option names in {} must be scalars", name),
            })?;
            if value.is_null() {
                continue;
            }
            let scalar: Scalar = serde_yaml::from_value(value).map_err(|_| {
                ConfigError::UnsupportedValue {
                    section: name.clone(),
                    option: option.clone(),
                }
            })?;
            cfg.set(&name, &option, &scalar.into_string());
        }
    }

    Ok(cfg)
}
