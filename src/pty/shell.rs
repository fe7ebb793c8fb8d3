//! Shell selection utilities

/// Fallback when neither the command line, the config file nor `$SHELL`
/// name a shell.
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// Select shell based on priority:
/// 1. CLI argument (if provided)
/// 2. `[shell] command` from the config file
/// 3. $SHELL environment variable
/// 4. /bin/sh
pub fn select_shell(cli_shell: Option<&str>, config_shell: Option<&str>) -> String {
    if let Some(shell) = cli_shell.or(config_shell) {
        return shell.to_string();
    }

    match std::env::var("SHELL") {
        Ok(shell) if !shell.is_empty() => shell,
        _ => FALLBACK_SHELL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_shell_with_cli_arg() {
        // CLI arg takes highest priority
        let shell = select_shell(Some("/bin/fish"), Some("/bin/zsh"));
        assert_eq!(shell, "/bin/fish");
    }

    #[test]
    fn test_select_shell_with_config() {
        let shell = select_shell(None, Some("/bin/zsh"));
        assert_eq!(shell, "/bin/zsh");
    }

    #[test]
    fn test_select_shell_falls_back_to_env_or_default() {
        let shell = select_shell(None, None);
        let expected = std::env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_SHELL.to_string());
        assert_eq!(shell, expected);
    }
}
