use serde::{Deserialize, Serialize};

/// HTTP ingress configuration, derived from the `server` config section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    /// Handler timeout in seconds; 0 disables it.
    #[serde(default)]
    pub timeout_sec: u64,
    pub body_limit_bytes: usize,
    #[serde(default)]
    pub cors_enabled: bool,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self::from(&runtime::ServerConfig::default())
    }
}

impl From<&runtime::ServerConfig> for ApiIngressConfig {
    fn from(server: &runtime::ServerConfig) -> Self {
        Self {
            bind_addr: format!("{}:{}", server.host, server.port),
            timeout_sec: server.timeout_sec,
            body_limit_bytes: server.body_limit_bytes,
            cors_enabled: server.cors_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_from_server_section() {
        let server = runtime::ServerConfig {
            host: "0.0.0.0".into(),
            port: 9000,
            timeout_sec: 5,
            cors_enabled: true,
            ..Default::default()
        };

        let cfg = ApiIngressConfig::from(&server);

        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.timeout_sec, 5);
        assert_eq!(cfg.body_limit_bytes, 1024 * 1024);
        assert!(cfg.cors_enabled);
    }

    #[test]
    fn default_binds_loopback() {
        assert_eq!(ApiIngressConfig::default().bind_addr, "127.0.0.1:8087");
    }
}
