// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tests for [`RunContext::from_env`], which reads process-global state.

use rsp_core::RunContext;
use serial_test::serial;

/// Guard that sets env vars for the duration of a test and restores the
/// previous values on drop.
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn new(pairs: &[(&'static str, Option<&str>)]) -> Self {
        let saved = pairs
            .iter()
            .map(|(k, _)| (*k, std::env::var(k).ok()))
            .collect();
        for (k, v) in pairs {
            // SAFETY: tests in this file are marked #[serial].
            unsafe {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, v) in &self.saved {
            // SAFETY: restoring the previous state, still serialized.
            unsafe {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
        }
    }
}

#[test]
#[serial]
fn from_env_prefers_logname() {
    let _env = EnvGuard::new(&[
        ("LOGNAME", Some("logname-user")),
        ("USER", Some("user-user")),
        ("LNAME", None),
        ("USERNAME", None),
    ]);
    let ctx = RunContext::from_env().unwrap();
    assert_eq!(ctx.user, "logname-user");
    assert_eq!(ctx.ambient_user.as_deref(), Some("user-user"));
}

#[test]
#[serial]
fn from_env_falls_back_to_user() {
    let _env = EnvGuard::new(&[
        ("LOGNAME", None),
        ("USER", Some("plain-user")),
        ("LNAME", None),
        ("USERNAME", None),
    ]);
    let ctx = RunContext::from_env().unwrap();
    assert_eq!(ctx.user, "plain-user");
}

#[test]
#[serial]
fn from_env_treats_empty_user_as_unset() {
    let _env = EnvGuard::new(&[
        ("LOGNAME", Some("someone")),
        ("USER", Some("")),
        ("LNAME", None),
        ("USERNAME", None),
    ]);
    let ctx = RunContext::from_env().unwrap();
    assert_eq!(ctx.user, "someone");
    assert!(ctx.ambient_user.is_none());
}

#[test]
#[serial]
fn from_env_errors_when_no_user_variable_is_set() {
    let _env = EnvGuard::new(&[
        ("LOGNAME", None),
        ("USER", None),
        ("LNAME", None),
        ("USERNAME", None),
    ]);
    let err = RunContext::from_env().unwrap_err();
    assert!(err.to_string().contains("run context unavailable"));
}

#[test]
#[serial]
fn from_env_records_process_cwd() {
    let _env = EnvGuard::new(&[("USER", Some("cwd-user"))]);
    let ctx = RunContext::from_env().unwrap();
    assert_eq!(ctx.cwd, std::env::current_dir().unwrap());
}
