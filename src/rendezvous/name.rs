// Rendezvous name
//
// The shared, human-chosen string two instances must both supply to pair.

use std::fmt;

use crate::config::constants::MIN_NAME_LEN;
use crate::errors::RendezvousError;

/// A validated rendezvous name. Surrounding whitespace is trimmed and the
/// remainder must be at least `MIN_NAME_LEN` characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RendezvousName(String);

impl RendezvousName {
    pub fn parse(raw: &str) -> Result<Self, RendezvousError> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_NAME_LEN {
            return Err(RendezvousError::InvalidName { min: MIN_NAME_LEN });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RendezvousName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
