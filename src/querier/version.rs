use std::{fmt, str::FromStr};

/// A `major.minor` core driver interface version.
///
/// Ordering is numeric per component, so `2.10` sorts after `2.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const V1_0: Self = Self { major: 1, minor: 0 };

    /// API 1.0 is the legacy wire shape: `DELETE /session`, no `sameSite` on
    /// tokens and no JWT payload endpoints.
    #[must_use]
    pub fn is_legacy(self) -> bool {
        self == Self::V1_0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("invalid api version: {s}"))?;
        let major = major
            .parse()
            .map_err(|_| format!("invalid api version: {s}"))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("invalid api version: {s}"))?;
        Ok(Self { major, minor })
    }
}

/// Greatest version present in both sets. Unparseable entries are ignored.
#[must_use]
pub fn negotiate<A, B>(client: &[A], core: &[B]) -> Option<ApiVersion>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let core: Vec<ApiVersion> = core
        .iter()
        .filter_map(|v| v.as_ref().parse().ok())
        .collect();
    client
        .iter()
        .filter_map(|v| v.as_ref().parse::<ApiVersion>().ok())
        .filter(|v| core.contains(v))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let version: ApiVersion = "2.1".parse().unwrap_or(ApiVersion::V1_0);
        assert_eq!(version, ApiVersion { major: 2, minor: 1 });
        assert_eq!(version.to_string(), "2.1");
        assert!("2".parse::<ApiVersion>().is_err());
        assert!("a.b".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_numeric_ordering() {
        let a: ApiVersion = "2.9".parse().unwrap_or(ApiVersion::V1_0);
        let b: ApiVersion = "2.10".parse().unwrap_or(ApiVersion::V1_0);
        assert!(b > a);
    }

    #[test]
    fn test_negotiate_picks_greatest_common() {
        assert_eq!(
            negotiate(&["1.0", "2.0"], &["1.0", "1.1", "2.0"]),
            Some(ApiVersion { major: 2, minor: 0 })
        );
        assert_eq!(
            negotiate(&["0.1", "0.2", "1.1", "2.1", "3.0"], &["0.0", "1.0", "1.1", "2.1"]),
            Some(ApiVersion { major: 2, minor: 1 })
        );
    }

    #[test]
    fn test_negotiate_disjoint() {
        assert_eq!(negotiate(&["1.0", "2.0"], &["0.1", "3.0"]), None);
        assert_eq!(negotiate::<&str, &str>(&["1.0"], &[]), None);
    }

    #[test]
    fn test_is_legacy() {
        assert!(ApiVersion::V1_0.is_legacy());
        assert!(!ApiVersion { major: 2, minor: 0 }.is_legacy());
    }
}
