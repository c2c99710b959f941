use super::error::SessionError;
use super::settings::{ExternalProperties, ResourceLoader};
use crate::connection::Connection;
use crate::connection::config::ConnectionSettings;
use crate::core::Result;
use crate::facade::DatabaseRegistry;
use crate::result::QueryResult;
use log::{debug, warn};

/// Transactional handle injected into an operation.
pub trait Session {
    fn execute(&mut self, sql: &str) -> Result<QueryResult>;
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    fn in_transaction(&self) -> bool;
    fn close(&mut self) -> Result<()>;
}

/// Builds one fresh session per call from a configuration reference.
pub trait SessionProvider {
    fn open(
        &self,
        configuration: &str,
        name: Option<&str>,
    ) -> std::result::Result<Box<dyn Session>, SessionError>;
}

/// Factory bound to one set of connection settings.
///
/// Built per operation and closed together with the single session it hands
/// out; nothing is cached between operations.
pub struct ConnectionSessionFactory {
    registry: DatabaseRegistry,
    settings: ConnectionSettings,
    open: bool,
}

impl ConnectionSessionFactory {
    pub fn build(
        registry: &DatabaseRegistry,
        settings: ConnectionSettings,
    ) -> std::result::Result<Self, SessionError> {
        settings.validate().map_err(SessionError::InvalidSettings)?;
        debug!("Built session factory for {}", settings.to_url());
        Ok(Self {
            registry: registry.clone(),
            settings,
            open: true,
        })
    }

    pub fn open_session(self) -> std::result::Result<ConnectionSession, SessionError> {
        let connection = Connection::open(&self.registry, self.settings.clone())?;
        Ok(ConnectionSession {
            connection,
            factory: self,
        })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        if self.open {
            debug!("Closed session factory for {}", self.settings.to_url());
            self.open = false;
        }
    }
}

/// A [`Connection`] together with the factory that produced it.
pub struct ConnectionSession {
    connection: Connection,
    factory: ConnectionSessionFactory,
}

impl ConnectionSession {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Session for ConnectionSession {
    fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        self.connection.execute(sql)
    }

    fn begin(&mut self) -> Result<()> {
        self.connection.begin()
    }

    fn commit(&mut self) -> Result<()> {
        self.connection.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.connection.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.connection.is_in_transaction()
    }

    fn close(&mut self) -> Result<()> {
        let result = self.connection.close();
        self.factory.close();
        result
    }
}

/// Opens sessions against the databases of a [`DatabaseRegistry`].
///
/// Base settings come from the configuration resource; properties named
/// `dbbootstrap.<unit name>.<key>` override them.
pub struct MemSessionProvider {
    registry: DatabaseRegistry,
    resources: Box<dyn ResourceLoader>,
    external: ExternalProperties,
}

impl MemSessionProvider {
    pub fn new(registry: DatabaseRegistry, resources: impl ResourceLoader + 'static) -> Self {
        Self {
            registry,
            resources: Box::new(resources),
            external: ExternalProperties::default(),
        }
    }

    pub fn with_external(mut self, external: ExternalProperties) -> Self {
        self.external = external;
        self
    }

    pub fn registry(&self) -> &DatabaseRegistry {
        &self.registry
    }

    /// Resolve the effective connection settings for a unit.
    pub fn settings_for(
        &self,
        configuration: &str,
        name: Option<&str>,
    ) -> std::result::Result<ConnectionSettings, SessionError> {
        let mut properties = self.resources.load_properties(configuration)?;
        match name {
            Some(name) => self.external.overlay(name, &mut properties),
            None if !self.external.is_empty() => {
                warn!("Unit using '{}' has no name; external properties not applied", configuration)
            }
            None => {}
        }
        ConnectionSettings::from_properties(&properties).map_err(SessionError::InvalidSettings)
    }
}

impl SessionProvider for MemSessionProvider {
    fn open(
        &self,
        configuration: &str,
        name: Option<&str>,
    ) -> std::result::Result<Box<dyn Session>, SessionError> {
        let settings = self.settings_for(configuration, name)?;
        let factory = ConnectionSessionFactory::build(&self.registry, settings)?;
        Ok(Box::new(factory.open_session()?))
    }
}
