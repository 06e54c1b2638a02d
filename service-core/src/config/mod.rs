//! Layered configuration: `<dir>/base.yaml`, then `APP_`-prefixed environment
//! variables with `__` as the section separator (`APP_SERVER__PORT=9000`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;

use crate::error::AppError;

pub const ENV_PREFIX: &str = "APP";

/// Find `<crate>/config` whether the binary runs from the workspace root or
/// from the crate directory.
pub fn configuration_directory(crate_name: &str) -> Result<PathBuf, AppError> {
    let base_path = std::env::current_dir()?;
    Ok(if base_path.ends_with(crate_name) {
        base_path.join("config")
    } else {
        base_path.join(crate_name).join("config")
    })
}

/// Read `.env`, `base.yaml` in `directory`, and the environment.
pub fn load<T: DeserializeOwned>(directory: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(File::from(directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        server: Server,
    }

    #[derive(Debug, Deserialize)]
    struct Server {
        host: String,
        port: u16,
    }

    #[test]
    fn reads_base_yaml() {
        let dir = std::env::temp_dir().join(format!("service-core-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("base.yaml"), "server:\n  host: 127.0.0.1\n  port: 8080\n").unwrap();

        let sample: Sample = load(&dir).unwrap();
        assert_eq!(sample.server.host, "127.0.0.1");
        assert_eq!(sample.server.port, 8080);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = std::env::temp_dir().join("service-core-config-missing");
        assert!(load::<Sample>(&dir).is_err());
    }
}
