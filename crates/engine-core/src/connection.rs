use crate::error::ConnectionError;
use connectors::cql::session::{CqlSession, SessionFactory};
use model::{core::identifiers::SessionId, execution::connection::ConnectionConfig};
use serde::Serialize;
use std::{fmt, sync::Arc};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Whether [`ConnectionManager::acquire`] opened a session or handed back the
/// one already bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionAccess {
    New,
    Reuse,
}

impl SessionAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAccess::New => "NEW",
            SessionAccess::Reuse => "REUSE",
        }
    }
}

impl fmt::Display for SessionAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct AcquiredSession {
    pub session: Arc<dyn CqlSession>,
    pub access: SessionAccess,
}

struct BoundSession {
    config: ConnectionConfig,
    session: Arc<dyn CqlSession>,
}

/// Owns at most one live session and the configuration it was opened with.
///
/// Shared across drivers via `Arc`. Every acquire runs its compare, close and
/// reconnect steps under one lock, so callers never observe a session that
/// is half replaced.
pub struct ConnectionManager {
    factory: Arc<dyn SessionFactory>,
    bound: Mutex<Option<BoundSession>>,
}

impl ConnectionManager {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        ConnectionManager {
            factory,
            bound: Mutex::new(None),
        }
    }

    /// Returns the bound session when `config` equals the one it was opened
    /// with, otherwise closes it and opens a new one.
    pub async fn acquire(&self, config: &ConnectionConfig) -> Result<AcquiredSession, ConnectionError> {
        let mut bound = self.bound.lock().await;

        if let Some(current) = bound.as_ref()
            && current.config == *config
        {
            return Ok(AcquiredSession {
                session: current.session.clone(),
                access: SessionAccess::Reuse,
            });
        }

        if let Some(previous) = bound.take() {
            info!(
                session_id = %previous.session.id(),
                "Configuration changed; closing previous session"
            );
            previous.session.close().await;
        }

        let session = self.factory.connect(config).await.map_err(|source| {
            let hosts = config.contact_points().join(", ");
            warn!(hosts = %hosts, error = %source, "Connection attempt failed");
            ConnectionError::Connect { hosts, source }
        })?;

        info!(session_id = %session.id(), table = %config.table(), "Session opened");
        *bound = Some(BoundSession {
            config: config.clone(),
            session: session.clone(),
        });

        Ok(AcquiredSession {
            session,
            access: SessionAccess::New,
        })
    }

    /// Id of the bound session, if any.
    pub async fn current_session(&self) -> Option<SessionId> {
        self.bound.lock().await.as_ref().map(|b| b.session.id())
    }

    /// Releases the bound session. A later acquire opens a fresh one.
    pub async fn close(&self) {
        if let Some(previous) = self.bound.lock().await.take() {
            previous.session.close().await;
            info!(session_id = %previous.session.id(), "Session released");
        }
    }
}
