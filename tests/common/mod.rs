#![allow(dead_code)]

pub mod db_test_context;

pub fn from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// Set process variables for the duration of a `#[serial]` test.
pub struct EnvGuard {
    keys: Vec<String>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        for (key, value) in vars {
            // SAFETY: callers are #[serial], so no other test thread touches the environment.
            unsafe { std::env::set_var(key, value) };
        }
        Self {
            keys: vars.iter().map(|(k, _)| k.to_string()).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            // SAFETY: see EnvGuard::set.
            unsafe { std::env::remove_var(key) };
        }
    }
}
