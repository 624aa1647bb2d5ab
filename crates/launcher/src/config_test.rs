//! Tests for config parsing, file loading and environment overrides

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use crate::config::{Config, ConfigError, DebuggerConfig, SearchPath, SYSTEM_CONFIG_PATH};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn os_lookup(vars: &[(&str, &Path)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_os_str().to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn home_config(home: &Path) -> PathBuf {
        home.join(".config").join("catalyst").join("launcher.toml")
    }

    fn write_file(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Shared buffer the fmt layer writes log lines into
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// Run `f` with WARN and above logged into the returned buffer
    fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, captured.text())
    }

    #[test]
    fn defaults_match_dap_listener() {
        let config = Config::default();
        assert_eq!(config.debugger.facility, "dap");
        assert_eq!(config.debugger.address(), "0.0.0.0:5678");
        assert_eq!(config.debugger.poll_interval_ms, 100);
        assert!(config.entry.program.is_none());
        assert!(config.entry.args.is_empty());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml = r#"
            [debugger]
            port = 9000
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.debugger.port, 9000);
        assert_eq!(config.debugger.host, "0.0.0.0", "host should keep its default");
        assert_eq!(config.debugger.facility, "dap", "facility should keep its default");
    }

    #[test]
    fn full_config_parses() {
        let toml = r#"
            [debugger]
            facility = "ptrace"
            host = "127.0.0.1"
            port = 5679
            poll_interval_ms = 25

            [entry]
            program = "catalyst-agent"
            args = ["--inbound-transport", "http", "0.0.0.0", "8020"]
            replace_process = false
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.debugger,
            DebuggerConfig {
                facility: "ptrace".to_string(),
                host: "127.0.0.1".to_string(),
                port: 5679,
                poll_interval_ms: 25,
            }
        );
        assert_eq!(config.entry.program.as_deref(), Some("catalyst-agent"));
        assert_eq!(config.entry.args.len(), 4);
        assert!(!config.entry.replace_process);
    }

    #[test]
    fn explicit_path_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[entry]\nprogram = \"agent\"").unwrap();

        let (config, source) = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.entry.program.as_deref(), Some("agent"));
        assert_eq!(source.as_deref(), Some(file.path()));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "got {err:?}");
    }

    #[test]
    fn explicit_invalid_path_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[debugger]\nport = \"not a number\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("DEBUGGER_FACILITY", "ptrace"),
            ("DEBUGGER_HOST", "127.0.0.1"),
            ("DEBUGGER_PORT", "7000"),
        ]));

        assert_eq!(config.debugger.facility, "ptrace");
        assert_eq!(config.debugger.address(), "127.0.0.1:7000");
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("DEBUGGER_PORT", "99999")]));
        assert_eq!(config.debugger.port, 5678);

        config.apply_overrides(lookup(&[("DEBUGGER_PORT", "abc")]));
        assert_eq!(config.debugger.port, 5678);
    }

    #[test]
    fn empty_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("DEBUGGER_FACILITY", ""),
            ("DEBUGGER_HOST", ""),
            ("DEBUGGER_PORT", ""),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn search_order_is_env_then_home_then_system() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("env.toml");
        let home = dir.path().join("home");

        let paths = Config::search_paths_with(os_lookup(&[
            ("CATALYST_LAUNCHER_CONFIG", explicit.as_path()),
            ("HOME", home.as_path()),
        ]));

        assert_eq!(
            paths,
            vec![
                SearchPath { path: explicit, from_env: true },
                SearchPath { path: home_config(&home), from_env: false },
                SearchPath { path: PathBuf::from(SYSTEM_CONFIG_PATH), from_env: false },
            ]
        );
    }

    #[test]
    fn unset_or_empty_env_leaves_system_path() {
        let paths = Config::search_paths_with(|_| None);
        assert_eq!(paths, vec![SearchPath { path: PathBuf::from(SYSTEM_CONFIG_PATH), from_env: false }]);

        let paths = Config::search_paths_with(|_| Some(OsString::new()));
        assert_eq!(paths.len(), 1, "empty variables are ignored: {paths:?}");
    }

    #[test]
    fn invalid_env_file_falls_back_to_home() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("env.toml");
        let home = dir.path().join("home");
        write_file(&explicit, "[debugger]\nport = \"not a number\"\n");
        write_file(&home_config(&home), "[debugger]\nfacility = \"ptrace\"\n");

        let ((config, source), logs) = capture_warnings(|| {
            Config::load_with(None, os_lookup(&[("CATALYST_LAUNCHER_CONFIG", explicit.as_path()), ("HOME", home.as_path())])).unwrap()
        });

        assert_eq!(config.debugger.facility, "ptrace");
        assert_eq!(source, Some(home_config(&home)));
        assert!(logs.contains("skipping config"), "logs: {logs}");
    }

    #[test]
    fn missing_env_file_warns_and_falls_back_to_home() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("typo.toml");
        let home = dir.path().join("home");
        write_file(&home_config(&home), "[debugger]\nport = 7001\n");

        let ((config, source), logs) = capture_warnings(|| {
            Config::load_with(None, os_lookup(&[("CATALYST_LAUNCHER_CONFIG", explicit.as_path()), ("HOME", home.as_path())])).unwrap()
        });

        assert_eq!(config.debugger.port, 7001);
        assert_eq!(source, Some(home_config(&home)));
        assert!(logs.contains("CATALYST_LAUNCHER_CONFIG points at a missing file"), "logs: {logs}");
        assert!(logs.contains("typo.toml"), "warning should name the path: {logs}");
    }

    #[test]
    fn missing_home_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let present = dir.path().join("present.toml");
        write_file(&present, "[debugger]\nport = 7002\n");

        let ((config, _), logs) = capture_warnings(|| {
            Config::load_with(None, os_lookup(&[("HOME", home.as_path()), ("CATALYST_LAUNCHER_CONFIG", present.as_path())])).unwrap()
        });
        assert_eq!(config.debugger.port, 7002);
        assert!(logs.is_empty(), "nothing to warn about: {logs}");

        let (_, logs) = capture_warnings(|| Config::load_with(None, os_lookup(&[("HOME", home.as_path())])));
        assert!(!logs.contains("missing file"), "default locations stay quiet: {logs}");
    }
}
