//! Insecure registry list validation.
//!
//! The `insecureDockerRegistries` option takes a comma-separated list of
//! `host:port` addresses. It may be given once per run; the validated list is
//! then frozen into an [`InsecureRegistries`] value and handed to both workers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// A validated `host:port` registry address without a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryAddress(String);

impl RegistryAddress {
    /// Validate a single, already trimmed address.
    pub fn parse(registry: &str) -> Result<Self, RegistryError> {
        if registry.contains("://") {
            return Err(RegistryError::SchemeNotAllowed {
                registry: registry.to_string(),
            });
        }
        if !registry.contains(':') {
            return Err(RegistryError::MissingPort {
                registry: registry.to_string(),
            });
        }
        Ok(Self(registry.to_string()))
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RegistryAddress {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim())
    }
}

/// Ordered list of insecure registry addresses.
///
/// Insertion order is preserved and duplicates are kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsecureRegistries(Vec<RegistryAddress>);

impl InsecureRegistries {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one occurrence of the option.
    ///
    /// Fails with [`RegistryError::AlreadySet`] if the list is already
    /// populated. On any error the list is left untouched.
    pub fn set(&mut self, value: &str) -> Result<(), RegistryError> {
        if !self.0.is_empty() {
            return Err(RegistryError::AlreadySet);
        }

        let parsed = value
            .split(',')
            .map(|token| RegistryAddress::parse(token.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        self.0 = parsed;
        Ok(())
    }

    /// Build the list from every occurrence of the option, in command-line order.
    pub fn from_flag_values<I, S>(values: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registries = Self::new();
        for value in values {
            registries.set(value.as_ref())?;
        }
        Ok(registries)
    }

    /// Iterate over the addresses in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryAddress> {
        self.0.iter()
    }

    /// Number of addresses.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no address was configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the addresses as a slice.
    pub fn as_slice(&self) -> &[RegistryAddress] {
        &self.0
    }
}

impl fmt::Display for InsecureRegistries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, registry) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", registry)?;
        }
        f.write_str("]")
    }
}

impl<'a> IntoIterator for &'a InsecureRegistries {
    type Item = &'a RegistryAddress;
    type IntoIter = std::slice::Iter<'a, RegistryAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
