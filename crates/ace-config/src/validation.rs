use thiserror::Error;
use url::Url;

use crate::Config;

/// Constraint violations detected after the configuration has loaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// An integer option that must be at least one was zero.
    #[error("configured '{option}' must be a positive integer")]
    NotPositive {
        /// Name of the offending option.
        option: &'static str,
    },
    /// A required option was not set in any layer.
    #[error("missing required configuration '{option}'")]
    Missing {
        /// Name of the missing option.
        option: &'static str,
    },
    /// The code source URI is not an absolute `http` or `https` URI.
    #[error("configured 'file-server-uri' is not an absolute http(s) URI: {uri}")]
    InvalidUri {
        /// Value as configured.
        uri: String,
    },
}

pub(crate) fn validate(config: &Config) -> Result<(), ConfigValidationError> {
    if config.concurrency == 0 {
        return Err(ConfigValidationError::NotPositive {
            option: "concurrency",
        });
    }
    if config.file_server_conn_timeout == 0 {
        return Err(ConfigValidationError::NotPositive {
            option: "file-server-conn-timeout",
        });
    }
    if config.cache_dir.as_str().is_empty() {
        return Err(ConfigValidationError::Missing {
            option: "cache-dir",
        });
    }
    let Some(uri) = config.file_server_uri.as_deref() else {
        return Err(ConfigValidationError::Missing {
            option: "file-server-uri",
        });
    };
    if !is_server_uri(uri) {
        return Err(ConfigValidationError::InvalidUri {
            uri: uri.to_owned(),
        });
    }
    Ok(())
}

fn is_server_uri(uri: &str) -> bool {
    Url::parse(uri).is_ok_and(|url| {
        !url.cannot_be_a_base() && matches!(url.scheme(), "http" | "https") && url.has_host()
    })
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn valid() -> Config {
        Config {
            file_server_uri: Some(String::from("https://puppet.example.com:8140")),
            ..Config::default()
        }
    }

    #[rstest]
    fn accepts_defaults_with_uri(valid: Config) {
        assert_eq!(valid.validate(), Ok(()));
    }

    #[rstest]
    fn rejects_zero_concurrency(valid: Config) {
        let config = Config {
            concurrency: 0,
            ..valid
        };
        let error = config.validate().expect_err("zero concurrency");
        assert!(error.to_string().contains("'concurrency' must be a positive integer"));
    }

    #[rstest]
    fn rejects_zero_timeout(valid: Config) {
        let config = Config {
            file_server_conn_timeout: 0,
            ..valid
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::NotPositive {
                option: "file-server-conn-timeout"
            })
        );
    }

    #[rstest]
    fn requires_file_server_uri() {
        assert_eq!(
            Config::default().validate(),
            Err(ConfigValidationError::Missing {
                option: "file-server-uri"
            })
        );
    }

    #[rstest]
    #[case("puppet:8140/no-scheme here")]
    #[case("mailto:ops@example.com")]
    #[case("/puppet/v3")]
    #[case("ftp://puppet.example.com/code")]
    #[case("not a uri")]
    fn rejects_uris_the_code_source_cannot_use(valid: Config, #[case] uri: &str) {
        let config = Config {
            file_server_uri: Some(uri.to_owned()),
            ..valid
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidUri {
                uri: uri.to_owned()
            })
        );
    }

    #[rstest]
    #[case("https://puppet.example.com:8140")]
    #[case("http://127.0.0.1:8140/")]
    fn accepts_http_server_uris(valid: Config, #[case] uri: &str) {
        let config = Config {
            file_server_uri: Some(uri.to_owned()),
            ..valid
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
