use crate::execution::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::{fmt, net::Ipv6Addr, str::FromStr, time::Duration};

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_LOCAL_DC: &str = "datacenter1";
pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(900);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Replica acknowledgement level passed through to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    #[default]
    LocalOne,
    Serial,
    LocalSerial,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::LocalOne => "LOCAL_ONE",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
        }
    }
}

impl FromStr for Consistency {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "ANY" => Ok(Consistency::Any),
            "ONE" => Ok(Consistency::One),
            "TWO" => Ok(Consistency::Two),
            "THREE" => Ok(Consistency::Three),
            "QUORUM" => Ok(Consistency::Quorum),
            "ALL" => Ok(Consistency::All),
            "LOCAL_QUORUM" => Ok(Consistency::LocalQuorum),
            "EACH_QUORUM" => Ok(Consistency::EachQuorum),
            "LOCAL_ONE" => Ok(Consistency::LocalOne),
            "SERIAL" => Ok(Consistency::Serial),
            "LOCAL_SERIAL" => Ok(Consistency::LocalSerial),
            _ => Err(ModelError::UnknownConsistency(s.to_string())),
        }
    }
}

impl TryFrom<String> for Consistency {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Consistency> for String {
    fn from(value: Consistency) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `keyspace.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableRef {
    keyspace: Option<String>,
    name: String,
}

impl TableRef {
    pub fn new(keyspace: Option<&str>, name: &str) -> Self {
        TableRef {
            keyspace: keyspace.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for TableRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        let valid = |p: &str| !p.is_empty() && !p.chars().any(char::is_whitespace);
        match parts.as_slice() {
            [name] if valid(name) => Ok(TableRef::new(None, name)),
            [keyspace, name] if valid(keyspace) && valid(name) => {
                Ok(TableRef::new(Some(keyspace), name))
            }
            _ => Err(ModelError::InvalidTable(s.to_string())),
        }
    }
}

impl TryFrom<String> for TableRef {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TableRef> for String {
    fn from(value: TableRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.keyspace {
            Some(keyspace) => write!(f, "{keyspace}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Everything needed to open a session and write one input.
///
/// Two configurations are equivalent iff every field compares equal, and
/// equivalence is what decides whether an existing session can be reused.
/// Instances are immutable; build a new one to change anything.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    contact_points: Vec<String>,
    port: u16,
    username: String,
    password: String,
    local_dc: String,
    connection_timeout: Duration,
    request_timeout: Duration,
    consistency: Consistency,
    table: TableRef,
    batch_size: usize,
    dry_run: bool,
}

impl ConnectionConfig {
    pub fn builder(table: TableRef) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(table)
    }

    pub fn contact_points(&self) -> &[String] {
        &self.contact_points
    }

    /// Contact points with the port appended, as the driver expects them.
    pub fn known_nodes(&self) -> Vec<String> {
        self.contact_points
            .iter()
            .map(|host| {
                if host.parse::<Ipv6Addr>().is_ok() {
                    format!("[{host}]:{}", self.port)
                } else if host.contains(':') {
                    host.clone()
                } else {
                    format!("{host}:{}", self.port)
                }
            })
            .collect()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn local_dc(&self) -> &str {
        &self.local_dc
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Derives a new configuration that differs only in the dry-run flag.
    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        ConnectionConfig {
            dry_run,
            ..self.clone()
        }
    }

    /// Derives a new configuration that differs only in the batch size.
    pub fn with_batch_size(&self, batch_size: usize) -> Result<Self, ModelError> {
        if batch_size == 0 {
            return Err(ModelError::InvalidConfig("batch size must be positive".into()));
        }
        Ok(ConnectionConfig {
            batch_size,
            ..self.clone()
        })
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("contact_points", &self.contact_points)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("local_dc", &self.local_dc)
            .field("connection_timeout", &self.connection_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("consistency", &self.consistency)
            .field("table", &self.table)
            .field("batch_size", &self.batch_size)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[derive(Clone)]
pub struct ConnectionConfigBuilder {
    contact_points: Vec<String>,
    port: u16,
    username: String,
    password: String,
    local_dc: String,
    connection_timeout: Duration,
    request_timeout: Duration,
    consistency: Consistency,
    table: TableRef,
    batch_size: usize,
    dry_run: bool,
}

impl fmt::Debug for ConnectionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfigBuilder")
            .field("contact_points", &self.contact_points)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("local_dc", &self.local_dc)
            .field("connection_timeout", &self.connection_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("consistency", &self.consistency)
            .field("table", &self.table)
            .field("batch_size", &self.batch_size)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ConnectionConfigBuilder {
    fn new(table: TableRef) -> Self {
        ConnectionConfigBuilder {
            contact_points: vec!["127.0.0.1".to_string()],
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            local_dc: DEFAULT_LOCAL_DC.to_string(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            consistency: Consistency::default(),
            table,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }

    pub fn contact_points<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contact_points = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    pub fn local_dc(mut self, local_dc: &str) -> Self {
        self.local_dc = local_dc.to_string();
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Result<ConnectionConfig, ModelError> {
        if self.contact_points.iter().all(|h| h.trim().is_empty()) {
            return Err(ModelError::InvalidConfig(
                "at least one contact point is required".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ModelError::InvalidConfig("batch size must be positive".into()));
        }
        if self.port == 0 {
            return Err(ModelError::InvalidConfig("port must be positive".into()));
        }

        Ok(ConnectionConfig {
            contact_points: self
                .contact_points
                .into_iter()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            port: self.port,
            username: self.username,
            password: self.password,
            local_dc: self.local_dc,
            connection_timeout: self.connection_timeout,
            request_timeout: self.request_timeout,
            consistency: self.consistency,
            table: self.table,
            batch_size: self.batch_size,
            dry_run: self.dry_run,
        })
    }
}
