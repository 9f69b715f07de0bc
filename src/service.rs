use std::time::Duration;

/// Grace period between SIGTERM and SIGKILL when none is configured.
pub const DEFAULT_TERM_TIMEOUT: Duration = Duration::from_secs(5);

/// A resolved run-as identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUser {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

/// One supervised child process definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub binary: String,
    pub args: Vec<String>,
    pub dependency: Option<String>,
    pub priority: i32,
    pub term_timeout: Duration,
    pub user: Option<ServiceUser>,
}

impl ServiceSpec {
    pub fn new(name: &str, binary: &str) -> Self {
        ServiceSpec {
            name: name.to_string(),
            binary: binary.to_string(),
            args: Vec::new(),
            dependency: None,
            priority: 0,
            term_timeout: DEFAULT_TERM_TIMEOUT,
            user: None,
        }
    }
}

/// Splits an argument string on whitespace. Quotes and escapes are not interpreted.
pub fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_on_any_whitespace() {
        assert_eq!(split_args("  -v\t--port  8080 \n"), vec!["-v", "--port", "8080"]);
        assert!(split_args("").is_empty());
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn split_args_keeps_quotes_verbatim() {
        assert_eq!(split_args("-m \"hello world\""), vec!["-m", "\"hello", "world\""]);
    }
}
