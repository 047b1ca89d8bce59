use poll_admin::{
    AppConfig, AppState, ConfigError,
    config::{Env, LOCAL_JWT_SECRET},
};
use serial_test::serial;
use std::{env, panic};

const CONFIG_VARS: [&str; 7] = [
    "APP_ENV",
    "SUPABASE_URL",
    "SUPABASE_SERVICE_ROLE_KEY",
    "SUPABASE_JWT_SECRET",
    "SESSION_ACCESS_COOKIE",
    "SESSION_REFRESH_COOKIE",
    "BIND_ADDR",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with every config variable cleared first, then restores the
/// previous environment even if the test panicked.
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(key, val);
            } else {
                env::remove_var(key);
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_production_requires_supabase_url() {
    let result = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("SUPABASE_SERVICE_ROLE_KEY", "service-role-key");
        }
        AppConfig::load()
    });

    assert!(matches!(result, Err(ConfigError::Missing("SUPABASE_URL"))));
}

#[test]
#[serial]
fn test_production_requires_service_role_key() {
    let result = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("SUPABASE_URL", "https://project.supabase.co");
        }
        AppConfig::load()
    });

    assert!(matches!(
        result,
        Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))
    ));
}

#[test]
#[serial]
fn test_production_config_loads() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("SUPABASE_URL", "https://project.supabase.co/");
            env::set_var("SUPABASE_SERVICE_ROLE_KEY", "service-role-key");
            env::set_var("BIND_ADDR", "127.0.0.1:8080");
        }
        AppConfig::load()
    })
    .unwrap();

    assert_eq!(config.env, Env::Production);
    let supabase = config.supabase.as_ref().unwrap();
    // Trailing slash is dropped so endpoint paths can be appended.
    assert_eq!(supabase.url, "https://project.supabase.co");
    assert_eq!(supabase.service_role_key, "service-role-key");
    assert_eq!(config.jwt_secret, None);
    assert_eq!(config.bind_addr, "127.0.0.1:8080");

    // Hosted backend selected; no local secret needed.
    assert!(AppState::from_config(config).is_ok());
}

#[test]
#[serial]
fn test_local_env_defaults() {
    let config = run_with_env(AppConfig::load).unwrap();

    assert_eq!(config.env, Env::Local);
    assert!(config.supabase.is_none());
    assert_eq!(config.jwt_secret.as_deref(), Some(LOCAL_JWT_SECRET));
    assert_eq!(config.session_cookies.access, "sb-access-token");
    assert_eq!(config.session_cookies.refresh, "sb-refresh-token");
    assert_eq!(config.bind_addr, "0.0.0.0:3000");

    assert!(AppState::from_config(config).is_ok());
}

#[test]
#[serial]
fn test_blank_values_count_as_missing() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("SUPABASE_URL", "   ");
            env::set_var("SUPABASE_SERVICE_ROLE_KEY", "");
            env::set_var("SUPABASE_JWT_SECRET", "");
        }
        AppConfig::load()
    })
    .unwrap();

    assert!(config.supabase.is_none());
    assert_eq!(config.jwt_secret.as_deref(), Some(LOCAL_JWT_SECRET));
}

#[test]
#[serial]
fn test_local_half_configured_project_is_rejected() {
    let only_key = run_with_env(|| {
        unsafe {
            env::set_var("SUPABASE_SERVICE_ROLE_KEY", "service-role-key");
        }
        AppConfig::load()
    });
    assert!(matches!(only_key, Err(ConfigError::Missing("SUPABASE_URL"))));

    let only_url = run_with_env(|| {
        unsafe {
            env::set_var("SUPABASE_URL", "https://project.supabase.co");
        }
        AppConfig::load()
    });
    assert!(matches!(
        only_url,
        Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))
    ));

    // A blank value counts as unset.
    let blank_key = run_with_env(|| {
        unsafe {
            env::set_var("SUPABASE_URL", "https://project.supabase.co");
            env::set_var("SUPABASE_SERVICE_ROLE_KEY", "  ");
        }
        AppConfig::load()
    });
    assert!(matches!(
        blank_key,
        Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))
    ));
}

#[test]
#[serial]
fn test_custom_cookie_names() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("SESSION_ACCESS_COOKIE", "app-access");
            env::set_var("SESSION_REFRESH_COOKIE", "app-refresh");
            env::set_var("SUPABASE_JWT_SECRET", "local-override-secret");
        }
        AppConfig::load()
    })
    .unwrap();

    assert_eq!(config.session_cookies.access, "app-access");
    assert_eq!(config.session_cookies.refresh, "app-refresh");
    assert_eq!(config.jwt_secret.as_deref(), Some("local-override-secret"));
}

#[test]
#[serial]
fn test_invalid_supabase_url_is_rejected() {
    let result = run_with_env(|| {
        unsafe {
            env::set_var("SUPABASE_URL", "project.supabase.co");
            env::set_var("SUPABASE_SERVICE_ROLE_KEY", "service-role-key");
        }
        AppConfig::load()
    });

    assert!(matches!(
        result,
        Err(ConfigError::InvalidUrl { name: "SUPABASE_URL", .. })
    ));
}

#[test]
fn test_local_state_without_secret_fails() {
    let config = AppConfig {
        jwt_secret: None,
        ..AppConfig::default()
    };

    assert!(matches!(
        AppState::from_config(config),
        Err(ConfigError::Missing("SUPABASE_JWT_SECRET"))
    ));
}
