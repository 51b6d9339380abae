use crate::error::{RudisError, RudisResult};

/// Runtime configuration, populated from `--flag value` pairs.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub tls_cert_file: Option<String>,
    pub tls_key_file: Option<String>,
    /// Interval between active expiration passes.
    pub expire_tick_ms: u64,
    /// Random draws per expiration pass.
    pub expire_sample_keys: u32,
    /// Hit percentage above which a pass repeats immediately.
    pub expire_again_percentage: u32,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "localhost".to_string(),
            port: 6379,
            tls_cert_file: None,
            tls_key_file: None,
            expire_tick_ms: 100,
            expire_sample_keys: 20,
            expire_again_percentage: 25,
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse command-line arguments (program name already stripped).
    pub fn from_args(args: impl IntoIterator<Item = String>) -> RudisResult<Config> {
        let mut config = Config::default();
        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let value = args
                .next()
                .ok_or_else(|| RudisError::Generic(format!("missing value for {flag}")))?;
            match flag.as_str() {
                "--bind" => config.bind = value,
                "--port" => {
                    config.port = value
                        .parse()
                        .map_err(|_| RudisError::Generic(format!("invalid port: {value}")))?;
                }
                "--tlscertfile" => config.tls_cert_file = Some(value),
                "--tlskeyfile" => config.tls_key_file = Some(value),
                "--expire-tick-ms" => {
                    config.expire_tick_ms = value.parse().map_err(|_| {
                        RudisError::Generic(format!("invalid tick interval: {value}"))
                    })?;
                }
                "--expire-sample-keys" => {
                    config.expire_sample_keys = value.parse().map_err(|_| {
                        RudisError::Generic(format!("invalid sample count: {value}"))
                    })?;
                }
                "--expire-again-percentage" => {
                    config.expire_again_percentage = value.parse().map_err(|_| {
                        RudisError::Generic(format!("invalid percentage: {value}"))
                    })?;
                }
                "--loglevel" => config.loglevel = value,
                _ => return Err(RudisError::Generic(format!("unknown flag: {flag}"))),
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RudisResult<Config> {
        Config::from_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.bind, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.expire_tick_ms, 100);
        assert_eq!(config.expire_sample_keys, 20);
        assert_eq!(config.expire_again_percentage, 25);
        assert!(config.tls_cert_file.is_none());
    }

    #[test]
    fn test_flag_parsing() {
        let config = parse(&[
            "--bind", "0.0.0.0",
            "--port", "7000",
            "--tlscertfile", "server.crt",
            "--tlskeyfile", "server.key",
            "--expire-tick-ms", "250",
        ])
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 7000);
        assert_eq!(config.tls_cert_file.as_deref(), Some("server.crt"));
        assert_eq!(config.tls_key_file.as_deref(), Some("server.key"));
        assert_eq!(config.expire_tick_ms, 250);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse(&["--port"]).is_err());
        assert!(parse(&["--port", "not-a-port"]).is_err());
        assert!(parse(&["--bogus", "x"]).is_err());
    }
}
