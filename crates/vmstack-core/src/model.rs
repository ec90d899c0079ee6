//! Small value types shared by the resource programs and the backends.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// A marketplace OS image reference.
///
/// Config files carry these as a single colon-delimited string
/// (`"Canonical:UbuntuServer:18.04-LTS:latest"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl ImageReference {
    /// Parse a `publisher:offer:sku:version` string.
    ///
    /// Exactly four non-empty segments are required.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::InvalidImageReference(raw.to_string()));
        }

        Ok(Self {
            publisher: parts[0].to_string(),
            offer: parts[1].to_string(),
            sku: parts[2].to_string(),
            version: parts[3].to_string(),
        })
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.publisher, self.offer, self.sku, self.version
        )
    }
}

/// VM security profile selection.
///
/// `Standard` maps to no security profile on the provider side;
/// `TrustedLaunch` maps to the provider's trusted-launch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityType {
    Standard,
    TrustedLaunch,
}

impl SecurityType {
    /// Parse the config-file spelling.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "Standard" => Ok(SecurityType::Standard),
            "Trusted launch" => Ok(SecurityType::TrustedLaunch),
            other => Err(CoreError::UnknownSecurityType(other.to_string())),
        }
    }

    /// Provider security-profile value, `None` for `Standard`.
    pub fn profile(&self) -> Option<&'static str> {
        match self {
            SecurityType::Standard => None,
            SecurityType::TrustedLaunch => Some("TrustedLaunch"),
        }
    }
}

/// IP allocation method for public IPs and NIC configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpAllocationMethod {
    Static,
    Dynamic,
}

impl IpAllocationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpAllocationMethod::Static => "Static",
            IpAllocationMethod::Dynamic => "Dynamic",
        }
    }
}

/// How a managed disk comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskCreateOption {
    /// Copied from a snapshot.
    Copy,
    /// Attached as an existing OS disk.
    Attach,
}

impl DiskCreateOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskCreateOption::Copy => "Copy",
            DiskCreateOption::Attach => "Attach",
        }
    }
}

/// Operating system flavor of a VM's OS disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
    Linux,
}

impl OsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Linux => "Linux",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_reference_parse() {
        let image = ImageReference::parse("Canonical:UbuntuServer:18.04-LTS:latest").unwrap();

        assert_eq!(image.publisher, "Canonical");
        assert_eq!(image.offer, "UbuntuServer");
        assert_eq!(image.sku, "18.04-LTS");
        assert_eq!(image.version, "latest");
        assert_eq!(image.to_string(), "Canonical:UbuntuServer:18.04-LTS:latest");
    }

    #[test]
    fn test_image_reference_wrong_arity() {
        assert!(matches!(
            ImageReference::parse("Canonical:UbuntuServer:latest"),
            Err(CoreError::InvalidImageReference(_))
        ));
        assert!(matches!(
            ImageReference::parse("a:b:c:d:e"),
            Err(CoreError::InvalidImageReference(_))
        ));
    }

    #[test]
    fn test_image_reference_empty_segment() {
        assert!(matches!(
            ImageReference::parse("Canonical::18.04-LTS:latest"),
            Err(CoreError::InvalidImageReference(_))
        ));
    }

    #[test]
    fn test_security_type_mapping() {
        assert_eq!(
            SecurityType::parse("Standard").unwrap(),
            SecurityType::Standard
        );
        assert_eq!(SecurityType::parse("Standard").unwrap().profile(), None);

        assert_eq!(
            SecurityType::parse("Trusted launch").unwrap().profile(),
            Some("TrustedLaunch")
        );
    }

    #[test]
    fn test_security_type_unknown() {
        assert!(matches!(
            SecurityType::parse("Confidential"),
            Err(CoreError::UnknownSecurityType(_))
        ));
        // the spelling is exact, not case-insensitive
        assert!(SecurityType::parse("trusted launch").is_err());
    }
}
