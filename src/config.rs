use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the HTTP server listens on.
    pub port: u16,
    /// Base URL used when building links to locally stored files.
    pub public_base_url: String,
    /// Frontend origin allowed by CORS.
    pub frontend_origin: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory local uploads are written to.
    pub uploads_dir: String,
    /// Remote media host credentials; present only when fully configured.
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Logical folder remote uploads are grouped under.
    pub folder: String,
}

impl RemoteConfig {
    /// Remote backend credentials, present only when all three secrets are
    /// set. A partial set is treated as absent so the service still comes
    /// up, but loudly.
    pub fn from_values(
        cloud_name: Option<String>,
        api_key: Option<String>,
        api_secret: Option<String>,
        folder: Option<String>,
    ) -> Option<Self> {
        match (cloud_name, api_key, api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(RemoteConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: folder.unwrap_or_else(|| "fileuploader".to_string()),
            }),
            (None, None, None) => None,
            _ => {
                tracing::warn!(
                    "Incomplete Cloudinary credentials, remote backend stays disabled"
                );
                None
            }
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            public_base_url: "http://localhost:5001".to_string(),
            frontend_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: "./uploads".to_string(),
            remote: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables. Called once at
    /// startup; the result is read-only for the process lifetime.
    pub fn load() -> Result<Self, ConfigError> {
        let port = env_var("PORT")
            .and_then(|value| value.parse().ok())
            .unwrap_or(5001);

        let public_base_url =
            env_var("BACKEND_URL").unwrap_or_else(|| format!("http://localhost:{port}"));
        // URLs are concatenated with `/uploads/...` later, so a trailing
        // slash here would produce double slashes.
        let public_base_url = public_base_url.trim_end_matches('/').to_string();

        let frontend_origin =
            env_var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string());

        let uploads_dir = env_var("UPLOADS_DIR").unwrap_or_else(|| "./uploads".to_string());

        let config = Config {
            server: ServerConfig {
                port,
                public_base_url,
                frontend_origin,
            },
            storage: StorageConfig {
                uploads_dir,
                remote: Self::remote_from_env(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn remote_from_env() -> Option<RemoteConfig> {
        RemoteConfig::from_values(
            env_var("CLOUDINARY_CLOUD_NAME"),
            env_var("CLOUDINARY_API_KEY"),
            env_var("CLOUDINARY_API_SECRET"),
            env_var("CLOUDINARY_FOLDER"),
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.public_base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "BACKEND_URL cannot be empty".to_string(),
            ));
        }

        if self.storage.uploads_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "UPLOADS_DIR cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.server.port)
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
