//! Resolution of the websocket endpoint for the chat channel.

/// Host the production build always talks to.
pub const PRODUCTION_HOST: &str = "ia-super-cerebro-api.onrender.com";

/// Path of the chat channel on the backend.
pub const CHAT_PATH: &str = "/ws/chat";

/// Which build the client runs as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildEnvironment {
    #[default]
    Development,
    Production,
}

/// Where the client was served from: transport security and host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Whether the origin uses a secure transport (`https`).
    pub secure: bool,
    /// Host with optional port, e.g. `localhost:8000`.
    pub host: String,
}

impl Origin {
    pub fn new(secure: bool, host: impl Into<String>) -> Self {
        Self {
            secure,
            host: host.into(),
        }
    }

    /// Websocket scheme matching the origin's transport security.
    pub fn ws_scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    /// Full URL of the chat channel for this origin and build.
    pub fn chat_url(&self, env: BuildEnvironment) -> String {
        let host = match env {
            BuildEnvironment::Production => PRODUCTION_HOST,
            BuildEnvironment::Development => self.host.as_str(),
        };
        format!("{}://{}{}", self.ws_scheme(), host, CHAT_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_origin_in_development() {
        let origin = Origin::new(false, "localhost:8000");
        assert_eq!(
            origin.chat_url(BuildEnvironment::Development),
            "ws://localhost:8000/ws/chat"
        );
    }

    #[test]
    fn test_secure_origin_in_production() {
        let origin = Origin::new(true, "app.example.com");
        assert_eq!(
            origin.chat_url(BuildEnvironment::Production),
            "wss://ia-super-cerebro-api.onrender.com/ws/chat"
        );
    }

    #[test]
    fn test_production_keeps_origin_scheme() {
        let origin = Origin::new(false, "localhost:3000");
        assert!(origin
            .chat_url(BuildEnvironment::Production)
            .starts_with("ws://"));
    }
}
