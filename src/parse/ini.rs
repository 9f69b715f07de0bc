use super::{ConfigFile, DEFAULT_SECTION};
use crate::error::ConfigError;

/*
    @@@
    @parse();
    . Walks the text line by line; blank lines and lines starting with '#' or ';' are skipped.
    . '[name]' opens (or reopens) a section, options before any header land in 'default'.
    . 'key = value' and 'key: value' both set an option; the later of two identical keys wins.
*/
pub(super) fn parse(text: &str) -> Result<ConfigFile, ConfigError> {
    let mut cfg = ConfigFile::new();
    let mut current = DEFAULT_SECTION.to_string();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| ConfigError::Syntax {
                    line: idx + 1,
                    message: format!("malformed section header {:?}", line),
                })?;
            cfg.add_section(name);
            current = name.to_string();
            continue;
        }

        let split = line.find(['=', ':']).ok_or_else(|| ConfigError::Syntax {
            line: idx + 1,
            message: format!("expected 'key = value', got {:?}", line),
        })?;
        let key = line[..split].trim();
        if key.is_empty() {
            return Err(ConfigError::Syntax {
                line: idx + 1,
                message: "empty option name".to_string(),
            });
        }
        cfg.set(&current, key, line[split + 1..].trim());
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ConfigSource;

    const SAMPLE: &str = r#"
# global settings
[default]
term_timeout = 5s

[db]
binary = /usr/sbin/db
priority: 1

; api needs the database
[api]
binary = /usr/bin/api
args = --port 8080 --verbose
dependency = db
"#;

    #[test]
    fn parses_sections_and_options() {
        let cfg = parse(SAMPLE).unwrap();
        assert_eq!(cfg.sections(), vec!["default", "db", "api"]);
        assert_eq!(cfg.get_string("db", "priority").unwrap(), "1");
        assert_eq!(cfg.get_string("api", "args").unwrap(), "--port 8080 --verbose");
        assert_eq!(cfg.get_string("api", "dependency").unwrap(), "db");
    }

    #[test]
    fn values_keep_embedded_separators() {
        let cfg = parse("[web]\nargs = --bind=0.0.0.0:80\n").unwrap();
        assert_eq!(cfg.get_string("web", "args").unwrap(), "--bind=0.0.0.0:80");
    }

    #[test]
    fn options_before_header_are_defaults() {
        let cfg = parse("user = nobody\n[web]\nbinary = /bin/web\n").unwrap();
        assert_eq!(cfg.get_string("web", "user").unwrap(), "nobody");
    }

    #[test]
    fn reopened_section_merges() {
        let cfg = parse("[web]\nbinary = /bin/a\n[db]\nbinary = /bin/db\n[web]\nbinary = /bin/b\n").unwrap();
        assert_eq!(cfg.sections(), vec!["web", "db"]);
        assert_eq!(cfg.get_string("web", "binary").unwrap(), "/bin/b");
    }

    #[test]
    fn rejects_garbage_with_line_number() {
        let err = parse("[web]\nbinary = /bin/web\nnot an option\n").unwrap_err();
        match err {
            ConfigError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unterminated_header() {
        assert!(matches!(parse("[web\n"), Err(ConfigError::Syntax { line: 1, .. })));
    }
}
