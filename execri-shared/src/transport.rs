//! Transport types for the runtime-interface endpoint.

use std::path::PathBuf;

/// Endpoint the server listens on and clients connect to.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Transport {
    /// TCP transport on the loopback interface
    Tcp { port: u16 },

    /// Unix socket transport
    Unix { socket_path: PathBuf },
}

impl Transport {
    /// Create a TCP transport.
    pub fn tcp(port: u16) -> Self {
        Self::Tcp { port }
    }

    /// Create a Unix socket transport.
    pub fn unix(socket_path: PathBuf) -> Self {
        Self::Unix { socket_path }
    }

    /// Get the URI representation of this transport.
    pub fn to_uri(&self) -> String {
        match self {
            Transport::Tcp { port } => format!("tcp://127.0.0.1:{}", port),
            Transport::Unix { socket_path } => format!("unix://{}", socket_path.display()),
        }
    }

    /// Parse a transport from a URI string.
    ///
    /// A bare absolute path is accepted as a Unix socket, which is how node
    /// agents are usually pointed at a runtime endpoint.
    pub fn from_uri(uri: &str) -> Result<Self, String> {
        if let Some(rest) = uri.strip_prefix("tcp://") {
            let port = rest
                .split(':')
                .nth(1)
                .ok_or_else(|| format!("invalid TCP URI '{}': missing port", uri))?
                .parse::<u16>()
                .map_err(|e| format!("invalid TCP port in '{}': {}", uri, e))?;
            Ok(Self::tcp(port))
        } else if let Some(path) = uri.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(format!("invalid unix URI '{}': missing path", uri));
            }
            Ok(Self::unix(PathBuf::from(path)))
        } else if uri.starts_with('/') {
            Ok(Self::unix(PathBuf::from(uri)))
        } else {
            Err(format!(
                "invalid transport URI '{}': expected tcp://, unix:// or an absolute socket path",
                uri
            ))
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}
