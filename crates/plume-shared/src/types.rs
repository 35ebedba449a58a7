use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{AT_URI_SCHEME, ENTITY_KEY_SEPARATOR};
use crate::error::IdError;

// Account or actor identity, e.g. `did:plc:abc`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    pub fn parse(s: impl Into<String>) -> Result<Self, IdError> {
        let s = s.into();
        let method_end = s
            .strip_prefix("did:")
            .and_then(|rest| rest.find(':'))
            .ok_or_else(|| IdError::InvalidDid(s.clone()))?;

        // "did:" + method + ":" + identifier, both non-empty
        if method_end == 0 || s.len() <= 4 + method_end + 1 {
            return Err(IdError::InvalidDid(s));
        }

        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Did {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record URI of the form `at://<repo>/<collection>/<rkey>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct AtUri(String);

impl AtUri {
    pub fn parse(s: impl Into<String>) -> Result<Self, IdError> {
        let s = s.into();
        let rest = s
            .strip_prefix(AT_URI_SCHEME)
            .ok_or_else(|| IdError::InvalidAtUri(s.clone()))?;

        let mut parts = rest.splitn(3, '/');
        let repo = parts.next().unwrap_or_default();
        let collection = parts.next().unwrap_or_default();
        let rkey = parts.next().unwrap_or_default();

        if repo.is_empty() || collection.is_empty() || rkey.is_empty() || rkey.contains('/') {
            return Err(IdError::InvalidAtUri(s));
        }

        Ok(Self(s))
    }

    /// Build the URI of a record owned by `repo`.
    pub fn new(repo: &Did, collection: &str, rkey: &str) -> Self {
        Self(format!("{AT_URI_SCHEME}{repo}/{collection}/{rkey}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> (&str, &str, &str) {
        let rest = &self.0[AT_URI_SCHEME.len()..];
        let first = rest.find('/').unwrap_or(rest.len());
        let after = &rest[first + 1..];
        let second = after.find('/').unwrap_or(after.len());
        (&rest[..first], &after[..second], &after[second + 1..])
    }

    /// Repository (DID or handle) that owns the record.
    pub fn repo(&self) -> &str {
        self.segments().0
    }

    pub fn collection(&self) -> &str {
        self.segments().1
    }

    pub fn rkey(&self) -> &str {
        self.segments().2
    }
}

impl TryFrom<String> for AtUri {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AtUri> for String {
    fn from(uri: AtUri) -> Self {
        uri.0
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity-map key: the session DID and the entity id joined by `|`.
///
/// The session always comes first, so the same actor seen by two signed-in
/// accounts yields two distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(session: &Did, entity_id: &str) -> Self {
        let mut key = String::with_capacity(session.as_str().len() + 1 + entity_id.len());
        key.push_str(session.as_str());
        key.push(ENTITY_KEY_SEPARATOR);
        key.push_str(entity_id);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn session(&self) -> &str {
        self.split().0
    }

    pub fn entity_id(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // DIDs never contain the separator, so the first one is the boundary.
        self.0
            .split_once(ENTITY_KEY_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const S32_CHARS: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";

/// Timestamp identifier used as the record key of newly created records.
///
/// 13 base32-sortable characters encoding the current time in microseconds
/// and a random 10-bit clock id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(String);

impl Tid {
    pub fn now() -> Self {
        let micros = Utc::now().timestamp_micros().max(0) as u64;
        let clock_id: u64 = rand::thread_rng().gen_range(0..1024);
        Self::from_parts(micros, clock_id)
    }

    pub fn from_parts(micros: u64, clock_id: u64) -> Self {
        let mut value = ((micros & 0x1F_FFFF_FFFF_FFFF) << 10) | (clock_id & 0x3FF);
        let mut out = [b'2'; 13];
        for slot in out.iter_mut().rev() {
            *slot = S32_CHARS[(value & 0x1F) as usize];
            value >>= 5;
        }
        Self(out.iter().map(|&b| b as char).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
