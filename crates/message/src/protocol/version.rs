use std::fmt;
use std::str::FromStr;

use crate::protocol::{ArgumentError, MessageError};

const SUPPORTED_VERSIONS: [&str; 6] = ["1.0", "1.1", "2", "2.0", "3", "3.0"];

/// A validated http protocol version token, `1.1` by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion(&'static str);

impl ProtocolVersion {
    pub const HTTP_10: ProtocolVersion = ProtocolVersion("1.0");
    pub const HTTP_11: ProtocolVersion = ProtocolVersion("1.1");
    pub const HTTP_2: ProtocolVersion = ProtocolVersion("2");
    pub const HTTP_3: ProtocolVersion = ProtocolVersion("3");

    /// # Errors
    ///
    /// Returns an invalid-argument error for an empty or unsupported version.
    pub fn parse(version: &str) -> Result<Self, MessageError> {
        if version.is_empty() {
            return Err(ArgumentError::EmptyProtocolVersion.into());
        }

        SUPPORTED_VERSIONS
            .into_iter()
            .find(|supported| *supported == version)
            .map(ProtocolVersion)
            .ok_or_else(|| ArgumentError::InvalidProtocolVersion { version: version.to_string() }.into())
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub(crate) fn to_http(self) -> http::Version {
        match self.0 {
            "1.0" => http::Version::HTTP_10,
            "2" | "2.0" => http::Version::HTTP_2,
            "3" | "3.0" => http::Version::HTTP_3,
            _ => http::Version::HTTP_11,
        }
    }

    pub(crate) fn from_http(version: http::Version) -> Result<Self, ArgumentError> {
        match version {
            http::Version::HTTP_10 => Ok(Self::HTTP_10),
            http::Version::HTTP_11 => Ok(Self::HTTP_11),
            http::Version::HTTP_2 => Ok(Self::HTTP_2),
            http::Version::HTTP_3 => Ok(Self::HTTP_3),
            other => Err(ArgumentError::conversion(format!("unsupported http version {other:?}"))),
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl FromStr for ProtocolVersion {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolVersion::parse(s)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_versions() {
        for version in SUPPORTED_VERSIONS {
            assert_eq!(ProtocolVersion::parse(version).unwrap().as_str(), version);
        }
    }

    #[test]
    fn default_is_1_1() {
        assert_eq!(ProtocolVersion::default().as_str(), "1.1");
    }

    #[test]
    fn rejects_unsupported_versions() {
        for version in ["1", "1.2", "2.1", "4", "HTTP/1.1", " 1.1"] {
            let err = ProtocolVersion::parse(version).unwrap_err();
            assert!(err.is_invalid_argument(), "{version}");
        }
    }

    #[test]
    fn empty_version_has_its_own_error() {
        let err = ProtocolVersion::parse("").unwrap_err();
        assert!(matches!(err, MessageError::InvalidArgument { source: ArgumentError::EmptyProtocolVersion }));
    }

    #[test]
    fn http_mapping() {
        assert_eq!(ProtocolVersion::parse("2.0").unwrap().to_http(), http::Version::HTTP_2);
        assert_eq!(ProtocolVersion::from_http(http::Version::HTTP_10).unwrap(), ProtocolVersion::HTTP_10);
        assert!(ProtocolVersion::from_http(http::Version::HTTP_09).is_err());
    }
}
