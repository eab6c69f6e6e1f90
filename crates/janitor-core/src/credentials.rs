use std::collections::HashMap;

use crate::error::Error;
use crate::storage::Database;

/// Looks up the remote-store access token stored for an owner.
pub trait CredentialProvider: Send {
    fn access_token(&self, owner_id: &str) -> Result<Option<String>, Error>;
}

/// Resolve an owner's token or fail with `Unauthenticated`.
pub fn require_token(provider: &dyn CredentialProvider, owner_id: &str) -> Result<String, Error> {
    match provider.access_token(owner_id)? {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(Error::Unauthenticated(
            "No Google access token found".to_string(),
        )),
    }
}

/// Tokens kept in the `profiles` table, on a connection of its own.
pub struct ProfileCredentials {
    db: Database,
}

impl ProfileCredentials {
    pub fn open(db_path: &str) -> Result<Self, Error> {
        Ok(Self {
            db: Database::open(db_path)?,
        })
    }
}

impl CredentialProvider for ProfileCredentials {
    fn access_token(&self, owner_id: &str) -> Result<Option<String>, Error> {
        Ok(self.db.get_access_token(owner_id)?)
    }
}

/// Fixed owner → token map.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    tokens: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, owner_id: &str, token: &str) -> Self {
        self.tokens.insert(owner_id.to_string(), token.to_string());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn access_token(&self, owner_id: &str) -> Result<Option<String>, Error> {
        Ok(self.tokens.get(owner_id).cloned())
    }
}
