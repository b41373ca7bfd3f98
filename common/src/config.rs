use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub database_path: String,
    pub smtp_username: String,
    pub smtp_app_password: String,
    pub email_from_name: String,
    pub frontend_url: String,
    pub notification_concurrency: usize,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let project_name =
                env::var("PROJECT_NAME").unwrap_or_else(|_| "route-selection".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/core.log".into());
            let database_path =
                env::var("DATABASE_PATH").unwrap_or_else(|_| "data/route_selection.db".into());

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                fs::create_dir_all(parent).expect("Failed to create log directory");
            }

            let smtp_username = env::var("SMTP_USERNAME").expect("SMTP_USERNAME must be set");
            let smtp_app_password =
                env::var("SMTP_APP_PASSWORD").expect("SMTP_APP_PASSWORD must be set");
            let email_from_name =
                env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Route Selection".into());
            let frontend_url =
                env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into());
            let notification_concurrency = env::var("NOTIFICATION_CONCURRENCY")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(8);

            Config {
                project_name,
                log_level,
                log_file,
                database_path,
                smtp_username,
                smtp_app_password,
                email_from_name,
                frontend_url,
                notification_concurrency,
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }
}
