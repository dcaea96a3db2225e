//! MCP method dispatch.
//!
//! Method names are parsed once into [`McpMethod`] so the server matches on
//! variants instead of strings.
//!
//! ```text
//! McpMethod (enum)
//!   ├── Initialize
//!   ├── Initialized   (notification, no response)
//!   ├── ListTools
//!   ├── CallTool
//!   ├── Ping
//!   └── Unknown(String)
//! ```

use std::fmt;

/// Prefix shared by all client notifications.
const NOTIFICATION_PREFIX: &str = "notifications/";

/// MCP method identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum McpMethod {
    /// Initialize the MCP session.
    Initialize,
    /// Client acknowledgement that initialization finished.
    Initialized,
    /// List available tools.
    ListTools,
    /// Call a specific tool.
    CallTool,
    /// Ping the server (health check).
    Ping,
    /// Unknown method (for error handling).
    Unknown(String),
}

impl McpMethod {
    /// Returns the MCP protocol method name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "notifications/initialized",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::Ping => "ping",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Returns true for client notifications, which never get a response.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.as_str().starts_with(NOTIFICATION_PREFIX)
    }
}

impl From<&str> for McpMethod {
    fn from(s: &str) -> Self {
        match s {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "ping" => Self::Ping,
            unknown => Self::Unknown(unknown.to_string()),
        }
    }
}

impl fmt::Display for McpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
