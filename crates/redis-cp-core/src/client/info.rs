//! INFO reply parsing

use std::collections::HashMap;

use crate::error::{CopyError, Result};
use crate::protocol::Frame;

/// Per-database counters from the `# Keyspace` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyspaceStats {
    /// Number of keys
    pub keys: u64,
    /// Number of keys with an expiration
    pub expires: u64,
    /// Average TTL in milliseconds
    pub avg_ttl: u64,
}

/// Server metadata returned by `INFO`
///
/// The reply is a flat list of `field:value` lines grouped by `# Section`
/// headers. Section names are irrelevant here so fields are stored flat.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    fields: HashMap<String, String>,
}

impl ServerInfo {
    /// Decode an INFO reply frame
    pub fn from_reply(reply: Frame) -> Result<Self> {
        if let Some(message) = reply.error_message() {
            return Err(CopyError::server("INFO", message));
        }
        reply
            .as_str()
            .map(Self::parse)
            .ok_or_else(|| CopyError::Protocol(format!("unexpected INFO reply: {}", reply)))
    }

    /// Parse the text body of an INFO reply
    pub fn parse(text: &str) -> Self {
        let fields = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { fields }
    }

    /// Raw value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Reported server version string (`redis_version`)
    pub fn version(&self) -> Option<&str> {
        self.get("redis_version")
    }

    /// Keyspace counters for database `db`, if the server reported any
    pub fn keyspace(&self, db: u32) -> Option<KeyspaceStats> {
        let raw = self.get(&format!("db{}", db))?;
        let mut stats = KeyspaceStats::default();
        for pair in raw.split(',') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let Ok(value) = value.trim().parse::<u64>() else {
                continue;
            };
            match name.trim() {
                "keys" => stats.keys = value,
                "expires" => stats.expires = value,
                "avg_ttl" => stats.avg_ttl = value,
                _ => {}
            }
        }
        Some(stats)
    }

    /// Approximate key count for `db`; zero when the database is absent
    pub fn keys_in(&self, db: u32) -> u64 {
        self.keyspace(db).map(|s| s.keys).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Server\r\n\
redis_version:7.2.4\r\n\
redis_mode:standalone\r\n\
\r\n\
# Keyspace\r\n\
db0:keys=1520,expires=12,avg_ttl=40213\r\n\
db3:keys=7,expires=0,avg_ttl=0\r\n";

    #[test]
    fn test_parse_version() {
        let info = ServerInfo::parse(SAMPLE);
        assert_eq!(info.version(), Some("7.2.4"));
        assert_eq!(info.get("redis_mode"), Some("standalone"));
    }

    #[test]
    fn test_keyspace() {
        let info = ServerInfo::parse(SAMPLE);
        assert_eq!(
            info.keyspace(0),
            Some(KeyspaceStats {
                keys: 1520,
                expires: 12,
                avg_ttl: 40213
            })
        );
        assert_eq!(info.keys_in(3), 7);
    }

    #[test]
    fn test_from_reply() {
        let info = ServerInfo::from_reply(Frame::bulk("redis_version:2.8.24\r\n")).unwrap();
        assert_eq!(info.version(), Some("2.8.24"));
        assert!(matches!(
            ServerInfo::from_reply(Frame::Integer(1)),
            Err(CopyError::Protocol(_))
        ));
        assert!(matches!(
            ServerInfo::from_reply(Frame::error("NOAUTH Authentication required.")),
            Err(CopyError::Server { .. })
        ));
    }

    #[test]
    fn test_missing_database_counts_as_zero() {
        let info = ServerInfo::parse(SAMPLE);
        assert_eq!(info.keyspace(5), None);
        assert_eq!(info.keys_in(5), 0);
        assert_eq!(ServerInfo::parse("").keys_in(0), 0);
        assert_eq!(ServerInfo::parse("").version(), None);
    }
}
