use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub route: String,
    pub ssl: bool,

    /// How many times to try connecting before giving up.
    pub reconnect_attempts: usize,

    /// Delay between connection attempts, in milliseconds.
    pub reconnect_interval_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8181,
            route: "/core".into(),
            ssl: false,
            reconnect_attempts: 10,
            reconnect_interval_ms: 2000,
        }
    }
}

impl BusConfig {
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "wss" } else { "ws" };
        let route = self.route.trim_start_matches('/');

        format!("{}://{}:{}/{}", scheme, self.host, self.port, route)
    }
}
