use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use cmdflow::config::{EngineConfig, load_and_validate, load_from_path, parse_duration};
use cmdflow::logging::LogLevel;
use cmdflow::{CommandError, CommandRef, Commands};
use cmdflow_test_utils::TestCommand;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_full_config_loads() {
    let file = write_config(
        r#"
[proxy]
timeout = "250ms"

[group]
skip_failures = true
skip_cancellations = false

[logging]
level = "debug"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.proxy.timeout, Some(Duration::from_millis(250)));
    assert!(cfg.group.skip_failures);
    assert!(!cfg.group.skip_cancellations);
    assert_eq!(cfg.log_level, Some(LogLevel::Debug));
}

#[test]
fn test_empty_config_uses_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg, EngineConfig::default());

    let raw = load_from_path(file.path()).unwrap();
    assert!(raw.proxy.timeout.is_none());
}

#[test]
fn test_invalid_duration_unit_returns_config_error() {
    let result = EngineConfig::from_toml_str(
        r#"
[proxy]
timeout = "10x"
"#,
    );

    match result {
        Err(CommandError::Config(msg)) => {
            assert!(msg.contains("[proxy].timeout"));
            assert!(msg.contains("unsupported duration unit"));
        }
        Err(e) => panic!("Expected Config error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_zero_timeout_is_rejected() {
    let result: Result<EngineConfig, _> = "[proxy]\ntimeout = \"0ms\"\n".parse();
    assert!(matches!(result, Err(CommandError::Config(msg)) if msg.contains("greater than zero")));
}

#[test]
fn test_oversized_timeout_is_rejected() {
    let result: Result<EngineConfig, _> = "[proxy]\ntimeout = \"5124095576030432h\"\n".parse();
    assert!(matches!(
        result,
        Err(CommandError::Config(msg)) if msg.contains("[proxy].timeout") && msg.contains("too large")
    ));
}

#[test]
fn test_unknown_field_is_toml_error() {
    let result = EngineConfig::from_toml_str("[group]\nskip_everything = true\n");
    assert!(matches!(result, Err(CommandError::Toml(_))));
}

#[test]
fn test_unknown_log_level_is_toml_error() {
    let result = EngineConfig::from_toml_str("[logging]\nlevel = \"loud\"\n");
    assert!(matches!(result, Err(CommandError::Toml(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("missing.toml"));
    assert!(matches!(result, Err(CommandError::Io(_))));
}

#[test]
fn test_parse_duration_units() {
    assert_eq!(parse_duration("15ms"), Ok(Duration::from_millis(15)));
    assert_eq!(parse_duration(" 2s "), Ok(Duration::from_secs(2)));
    assert_eq!(parse_duration("3m"), Ok(Duration::from_secs(180)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("42").is_err());
    assert!(parse_duration("ms").is_err());
    assert_eq!(
        parse_duration("5124095576030432h"),
        Err("duration '5124095576030432h' is too large".to_string())
    );
    assert!(parse_duration("307445734561825861m").is_err());
    assert_eq!(
        parse_duration("307445734561825860m"),
        Ok(Duration::from_secs(307445734561825860 * 60))
    );
}

#[test]
fn test_commands_apply_config_defaults() {
    let cfg = EngineConfig::from_toml_str(
        r#"
[proxy]
timeout = "1s"

[group]
skip_failures = true
skip_cancellations = true
"#,
    )
    .unwrap();
    let commands = Commands::new().with_config(cfg);

    let target: CommandRef = TestCommand::asynchronous("t").shared();
    let proxy = commands.wrap(target).build();
    assert_eq!(proxy.timeout(), Some(Duration::from_secs(1)));

    let seq = commands.sequence().build();
    assert!(seq.skips_failures());
    assert!(seq.skips_cancellations());

    let par = commands.parallel().skip_failures(false).build();
    assert!(!par.skips_failures());
    assert!(par.skips_cancellations());
}

#[test]
fn test_log_level_parsing() {
    assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
    assert!("verbose".parse::<LogLevel>().is_err());
    assert_eq!(LogLevel::Info.to_string(), "info");
}
