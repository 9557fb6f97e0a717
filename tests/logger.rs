use std::fs;
use tasklane::config::LoggingConfig;
use tasklane::logger::Logger;

fn temp_log(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("tasklane_logger_{}", std::process::id()))
        .join(name)
}

#[test]
fn test_config_based_logging_disabled() {
    let logger = Logger::from_config(&LoggingConfig::default()).unwrap();
    assert!(!logger.is_enabled());
    assert!(logger.log_file().is_none());

    // Installing a disabled logger is a no-op
    assert!(logger.install().is_ok());

    logger.log("Test message");
    let logs = logger.get_logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].contains("Test message"));
}

#[test]
fn test_invalid_level_is_rejected() {
    let config = LoggingConfig {
        level: "chatty".to_string(),
        ..LoggingConfig::default()
    };
    assert!(Logger::from_config(&config).is_err());
}

#[test]
fn test_logs_are_newest_first_and_bounded() {
    let logger = Logger::new();
    for i in 0..600 {
        logger.log(format!("entry {}", i));
    }

    let logs = logger.get_logs();
    assert_eq!(logs.len(), 500);
    assert!(logs[0].ends_with("entry 599"));
    assert!(logs[499].ends_with("entry 100"));

    logger.clear();
    assert!(logger.get_logs().is_empty());
}

#[test]
fn test_config_based_logging_enabled() {
    let path = temp_log("tasklane.log");
    let config = LoggingConfig {
        enabled: true,
        level: "debug".to_string(),
        file: Some(path.to_string_lossy().into_owned()),
    };

    let logger = Logger::from_config(&config).unwrap();
    assert!(logger.is_enabled());
    assert_eq!(logger.level(), log::LevelFilter::Debug);
    assert_eq!(logger.log_file(), Some(&path));

    logger.install().unwrap();
    log::info!("Test message with file");
    log::trace!("Below the configured level");
    log::logger().flush();

    // In-memory buffer receives records from the global logger
    let logs = logger.get_logs();
    assert!(logs.iter().any(|entry| entry.contains("Test message with file")));
    assert!(!logs.iter().any(|entry| entry.contains("Below the configured level")));

    let file_content = fs::read_to_string(&path).unwrap();
    assert!(file_content.contains("Test message with file"));

    // Only one global logger per process
    assert!(Logger::from_config(&config).unwrap().install().is_err());

    let _ = fs::remove_dir_all(path.parent().unwrap());
}
