use serde::{Deserialize, Serialize};

use crate::core::{Result, SyncError};

const URL_SCHEME: &str = "recordsync://";

/// Which of the container's databases the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseScope {
    #[default]
    Public,
    Private,
}

impl DatabaseScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Client configuration
///
/// Names the remote container and database, and tunes query and
/// permission behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Container identifier (e.g. `iCloud.com.example.FrontRunner`)
    pub container: String,

    /// Database within the container
    pub scope: DatabaseScope,

    /// Result cap applied to queries that don't pass their own limit
    pub default_results_limit: Option<usize>,

    /// Whether the identity gate must obtain discoverability permission
    /// before handing out a client
    pub require_permission: bool,
}

impl ClientConfig {
    pub fn new(container: &str) -> Self {
        Self {
            container: container.to_string(),
            scope: DatabaseScope::Public,
            default_results_limit: None,
            require_permission: true,
        }
    }

    /// Set the database scope
    pub fn scope(mut self, scope: DatabaseScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the default result cap
    pub fn default_results_limit(mut self, limit: usize) -> Self {
        self.default_results_limit = Some(limit);
        self
    }

    /// Set whether discoverability permission is required
    pub fn require_permission(mut self, required: bool) -> Self {
        self.require_permission = required;
        self
    }

    /// Parse from connection string
    ///
    /// Format: `recordsync://<container>/<public|private>`; the scope
    /// segment is optional and defaults to `public`.
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url.strip_prefix(URL_SCHEME).ok_or_else(|| {
            SyncError::InvalidConfig(format!("URL must start with '{}'", URL_SCHEME))
        })?;

        let (container, scope) = match rest.split_once('/') {
            Some((container, "")) => (container, DatabaseScope::Public),
            Some((container, scope)) => {
                let scope = DatabaseScope::parse(scope).ok_or_else(|| {
                    SyncError::InvalidConfig(format!("Unknown database scope '{}'", scope))
                })?;
                (container, scope)
            }
            None => (rest, DatabaseScope::Public),
        };

        let config = Self::new(container).scope(scope);
        config.validate()?;
        Ok(config)
    }

    /// Convert to connection string
    pub fn to_url(&self) -> String {
        format!("{}{}/{}", URL_SCHEME, self.container, self.scope.as_str())
    }

    /// Load from a JSON document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SyncError::InvalidConfig(format!("Invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.container.is_empty() {
            return Err(SyncError::InvalidConfig("Container identifier cannot be empty".into()));
        }

        if self.container.contains('/') || self.container.chars().any(char::is_whitespace) {
            return Err(SyncError::InvalidConfig(format!(
                "Invalid container identifier '{}'",
                self.container
            )));
        }

        if self.default_results_limit == Some(0) {
            return Err(SyncError::InvalidConfig("default_results_limit must be > 0".into()));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
