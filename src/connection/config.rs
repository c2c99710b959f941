use std::collections::HashMap;

const URL_SCHEME: &str = "memdb:";

pub const URL_KEY: &str = "connection.url";
pub const USERNAME_KEY: &str = "connection.username";
pub const PASSWORD_KEY: &str = "connection.password";

/// Connection settings for a named in-memory database
///
/// Similar to a JDBC-style connection string: `memdb:<name>` or
/// `memdb://<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Database name
    pub database: String,

    /// Username, informational only
    pub username: Option<String>,

    /// Password, never printed
    pub password: Option<String>,
}

impl ConnectionSettings {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            username: None,
            password: None,
        }
    }

    /// Set the username
    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Set the password
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Parse from connection string
    ///
    /// # Examples
    ///
    /// ```
    /// use dbbootstrap::connection::config::ConnectionSettings;
    ///
    /// let settings = ConnectionSettings::from_url("memdb://people").unwrap();
    /// assert_eq!(settings.database, "people");
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        let rest = url
            .trim()
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| format!("URL must start with '{}': {}", URL_SCHEME, url))?;
        let database = rest.strip_prefix("//").unwrap_or(rest).trim_end_matches('/');

        if database.is_empty() {
            return Err(format!("URL names no database: {}", url));
        }
        if database.contains(['/', '?', '@']) {
            return Err(format!("Invalid database name in URL: {}", url));
        }

        Ok(Self::new(database))
    }

    /// Build settings from a flat property map (`connection.url`,
    /// `connection.username`, `connection.password`).
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, String> {
        let url = properties
            .get(URL_KEY)
            .ok_or_else(|| format!("Missing required property '{}'", URL_KEY))?;

        let mut settings = Self::from_url(url)?;
        if let Some(username) = properties.get(USERNAME_KEY) {
            settings = settings.username(username);
        }
        if let Some(password) = properties.get(PASSWORD_KEY) {
            settings = settings.password(password);
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Convert to connection string
    pub fn to_url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(_)) => format!("memdb://{}:***@{}", user, self.database),
            (Some(user), None) => format!("memdb://{}@{}", user, self.database),
            _ => format!("memdb://{}", self.database),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database.trim().is_empty() {
            return Err("Database name cannot be empty".to_string());
        }

        if self.password.is_some() && self.username.is_none() {
            return Err("Password given without username".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_url_both_forms() {
        assert_eq!(ConnectionSettings::from_url("memdb:people").unwrap().database, "people");
        assert_eq!(ConnectionSettings::from_url("memdb://people/").unwrap().database, "people");
    }

    #[test]
    fn test_invalid_url() {
        assert!(ConnectionSettings::from_url("jdbc:h2:mem:people").is_err());
        assert!(ConnectionSettings::from_url("memdb://").is_err());
        assert!(ConnectionSettings::from_url("memdb://a/b").is_err());
    }

    #[test]
    fn test_from_properties() {
        let settings = ConnectionSettings::from_properties(&props(&[
            (URL_KEY, "memdb:people"),
            (USERNAME_KEY, "sa"),
            (PASSWORD_KEY, "secret"),
        ]))
        .unwrap();

        assert_eq!(settings.database, "people");
        assert_eq!(settings.username.as_deref(), Some("sa"));
    }

    #[test]
    fn test_missing_url() {
        let err = ConnectionSettings::from_properties(&props(&[(USERNAME_KEY, "sa")])).unwrap_err();
        assert!(err.contains(URL_KEY));
    }

    #[test]
    fn test_validate() {
        let invalid = ConnectionSettings::new("people").password("secret");
        assert!(invalid.validate().is_err());
        assert!(ConnectionSettings::new("people").username("sa").validate().is_ok());
    }

    #[test]
    fn test_to_url_hides_password() {
        let settings = ConnectionSettings::new("people").username("sa").password("secret123");
        let url = settings.to_url();
        assert!(!url.contains("secret123"));
        assert!(url.contains("***"));
    }
}
