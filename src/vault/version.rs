//! Vault server version values and the named gates used by the handlers.

use crate::vault::VaultError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A Vault release version. Build metadata such as `+ent` is not part of the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release tag, e.g. `rc1` in `1.15.0-rc1`.
    pub pre: Option<String>,
}

pub const VAULT_VERSION_19: VaultVersion = VaultVersion::new(1, 9, 0);
pub const VAULT_VERSION_110: VaultVersion = VaultVersion::new(1, 10, 0);
pub const VAULT_VERSION_111: VaultVersion = VaultVersion::new(1, 11, 0);
pub const VAULT_VERSION_112: VaultVersion = VaultVersion::new(1, 12, 0);
pub const VAULT_VERSION_113: VaultVersion = VaultVersion::new(1, 13, 0);
pub const VAULT_VERSION_114: VaultVersion = VaultVersion::new(1, 14, 0);
pub const VAULT_VERSION_115: VaultVersion = VaultVersion::new(1, 15, 0);
pub const VAULT_VERSION_116: VaultVersion = VaultVersion::new(1, 16, 0);
pub const VAULT_VERSION_117: VaultVersion = VaultVersion::new(1, 17, 0);

impl VaultVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }
}

impl FromStr for VaultVersion {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VaultError::Version(s.to_string());

        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed.split('+').next().unwrap_or_default();
        let (numbers, pre) = match core.split_once('-') {
            Some((numbers, pre)) if !pre.is_empty() => (numbers, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (core, None),
        };

        let mut parts = numbers.split('.');
        let mut next = |required: bool| -> Result<u64, VaultError> {
            match parts.next() {
                Some(p) => p.parse::<u64>().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl Ord for VaultVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for VaultVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VaultVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}
