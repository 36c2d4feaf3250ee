use std::{path::PathBuf, str::FromStr};

use crate::api::error::SystemError;

pub const MAX_FILES: usize = 10;
pub const MAX_FIELDS: usize = 20;
pub const MAX_FIELD_VALUE_SIZE: usize = 1024 * 1024;
pub const TEMP_DIR_NAME: &str = "temp";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct Env {
    pub ip: String,
    pub port: u16,
    pub frontend_url: String,
    pub max_file_size_mb: u64,
    pub upload_path: PathBuf,
    pub temp_file_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &str, default: &str) -> Result<T, SystemError> {
    var_or(key, default).parse::<T>().map_err(|_| {
        SystemError::invalid_config(format!("{key} must be a valid {}", std::any::type_name::<T>()))
    })
}

/// The limit must be positive and still fit in `u64` once converted to bytes.
fn check_max_file_size_mb(mb: u64) -> Result<u64, SystemError> {
    if mb == 0 {
        return Err(SystemError::invalid_config("MAX_FILE_SIZE_MB must be greater than 0"));
    }
    if mb.checked_mul(1024 * 1024).is_none() {
        return Err(SystemError::invalid_config("MAX_FILE_SIZE_MB is too large"));
    }
    Ok(mb)
}

impl Env {
    pub fn load() -> Result<Self, SystemError> {
        let ip = var_or("IP", "127.0.0.1");
        let port = parse_var::<u16>("PORT", "8080")?;
        let frontend_url = var_or("FRONTEND_URL", "http://localhost:5173");

        let max_file_size_mb = check_max_file_size_mb(parse_var("MAX_FILE_SIZE_MB", "100")?)?;
        let upload_path = PathBuf::from(var_or("UPLOAD_PATH", "./uploads"));

        let temp_file_ttl_secs = parse_var::<u64>("TEMP_FILE_TTL_SECS", "86400")?;
        let sweep_interval_secs = parse_var::<u64>("SWEEP_INTERVAL_SECS", "3600")?;

        Ok(Env {
            ip,
            port,
            frontend_url,
            max_file_size_mb,
            upload_path,
            temp_file_ttl_secs,
            sweep_interval_secs,
        })
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.upload_path.join(TEMP_DIR_NAME)
    }
}
