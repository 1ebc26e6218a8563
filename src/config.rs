//! Server configuration.
//!
//! Defaults: all interfaces, port 5000, weights under
//! `../runs/detect/train/weights`. Each field can be
//! overridden from the environment at startup.

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_MODEL_PATH: &str = "../runs/detect/train/weights/best.onnx";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind host (`DETECT_HOST`)
    pub host: String,
    /// Bind port (`DETECT_PORT`)
    pub port: u16,
    /// ONNX weights, relative to the working directory (`DETECT_MODEL_PATH`)
    pub model_path: String,
    /// Largest accepted /detect body (`DETECT_MAX_UPLOAD_BYTES`)
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_path: DEFAULT_MODEL_PATH.to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            host: lookup("DETECT_HOST").unwrap_or(defaults.host),
            port: match lookup("DETECT_PORT") {
                Some(v) => v.trim().parse().with_context(|| format!("invalid DETECT_PORT '{}'", v))?,
                None => defaults.port,
            },
            model_path: lookup("DETECT_MODEL_PATH").unwrap_or(defaults.model_path),
            max_upload_bytes: match lookup("DETECT_MAX_UPLOAD_BYTES") {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid DETECT_MAX_UPLOAD_BYTES '{}'", v))?,
                None => defaults.max_upload_bytes,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn env_overrides() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("DETECT_HOST", "127.0.0.1"),
            ("DETECT_PORT", "8090"),
            ("DETECT_MODEL_PATH", "models/yolo11n.onnx"),
            ("DETECT_MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8090");
        assert_eq!(cfg.model_path, "models/yolo11n.onnx");
        assert_eq!(cfg.max_upload_bytes, 1024);
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("DETECT_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("DETECT_PORT"));
    }
}
