/*!
 * Configuration Tests
 * Environment loading and validation
 */

use pretty_assertions::assert_eq;
use serial_test::serial;
use syscall_trampoline::core::CONFIG_ENV;
use syscall_trampoline::{Trampoline, TrampolineConfig, TrampolineError};

struct EnvGuard;

impl EnvGuard {
    fn set(value: &str) -> Self {
        // settle the process-wide trampoline before its source changes
        let _ = Trampoline::native();
        std::env::set_var(CONFIG_ENV, value);
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        std::env::remove_var(CONFIG_ENV);
    }
}

#[test]
#[serial]
fn test_from_env_defaults_when_unset() {
    std::env::remove_var(CONFIG_ENV);
    assert_eq!(TrampolineConfig::from_env().unwrap(), TrampolineConfig::default());
}

#[test]
#[serial]
fn test_from_env_reads_json() {
    let _env = EnvGuard::set(r#"{"kick_interval_us": 250, "max_eintr_retries": 1}"#);

    let config = TrampolineConfig::from_env().unwrap();
    assert_eq!(config.kick_interval_us, 250);
    assert_eq!(config.max_eintr_retries, Some(1));
    assert_eq!(config.interrupt_signal, libc::SIGRTMIN());
}

#[test]
#[serial]
fn test_from_env_rejects_bad_signal() {
    let _env = EnvGuard::set(&format!(r#"{{"interrupt_signal": {}}}"#, libc::SIGSTOP));

    let err = TrampolineConfig::from_env().unwrap_err();
    assert!(matches!(err, TrampolineError::Config(_)));
}

#[test]
fn test_config_roundtrips_through_json() {
    let config = TrampolineConfig::aggressive();
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(TrampolineConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_retry_once_bounds_eintr() {
    assert_eq!(TrampolineConfig::retry_once().max_eintr_retries, Some(1));
    assert_eq!(TrampolineConfig::default().max_eintr_retries, None);
}

#[test]
#[serial]
fn test_env_changes_leave_native_trampoline_alone() {
    let _env = EnvGuard::set(r#"{"max_eintr_retries": 1}"#);
    assert_eq!(Trampoline::native().config(), &TrampolineConfig::default());
}
