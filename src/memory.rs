//! In-process store endpoint
//!
//! A small Redis-like server kept in memory, speaking exactly the commands
//! the copy path needs: PING, INFO, SELECT, DBSIZE, SET, GET, DEL, PEXPIRE,
//! PTTL, DUMP, RESTORE, SCAN and MIGRATE. Commands go through the same
//! [`Endpoint`] seam and reply parsing as a real [`Connection`], so a copy
//! run against memory servers exercises the full engine.
//!
//! Servers that should be reachable by MIGRATE are registered on a
//! [`MemoryNetwork`] under a `host:port`.
//!
//! Only built for tests, or with the `test-util` feature.
//!
//! [`Connection`]: redis_cp_core::client::Connection

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::endpoint::Endpoint;
use redis_cp_core::protocol::{Command, Frame};
use redis_cp_core::{CopyError, Result};

const DATABASES: usize = 16;

/// Type marker leading every DUMP payload (opaque string value)
const DUMP_STRING: u8 = 0;

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_duration_since(now))
    }
}

#[derive(Debug)]
struct ServerState {
    version: String,
    databases: Vec<HashMap<Bytes, Entry>>,
    log: Vec<Command>,
    pipelines: u64,
    rejections: HashMap<String, String>,
    offline: bool,
    password: Option<String>,
}

impl ServerState {
    fn purge(&mut self, now: Instant) {
        for db in &mut self.databases {
            db.retain(|_, entry| entry.is_live(now));
        }
    }

    fn db_mut(&mut self, db: u32) -> Option<&mut HashMap<Bytes, Entry>> {
        self.databases.get_mut(db as usize)
    }

    fn live(&mut self, db: u32, key: &[u8], now: Instant) -> Option<&Entry> {
        let map = self.db_mut(db)?;
        if !map.get(key)?.is_live(now) {
            map.remove(key);
            return None;
        }
        map.get(key)
    }
}

/// A shared in-memory server; clones refer to the same data
#[derive(Debug, Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    /// Create an empty server reporting `version` in INFO
    pub fn new(version: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                version: version.to_string(),
                databases: vec![HashMap::new(); DATABASES],
                log: Vec::new(),
                pipelines: 0,
                rejections: HashMap::new(),
                offline: false,
                password: None,
            })),
        }
    }

    /// Open a handle with database `db` selected (MIGRATE cannot reach peers)
    pub fn connect(&self, db: u32) -> MemoryEndpoint {
        MemoryEndpoint {
            server: self.clone(),
            network: None,
            db,
        }
    }

    /// Store a persistent value
    pub fn set(&self, db: u32, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.insert(db, key.as_ref(), value.as_ref(), None);
    }

    /// Store a value that expires after `ttl`
    pub fn set_with_ttl(
        &self,
        db: u32,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        ttl: Duration,
    ) {
        self.insert(db, key.as_ref(), value.as_ref(), Some(Instant::now() + ttl));
    }

    fn insert(&self, db: u32, key: &[u8], value: &[u8], expires_at: Option<Instant>) {
        let mut state = self.state.lock();
        if let Some(map) = state.db_mut(db) {
            map.insert(
                Bytes::copy_from_slice(key),
                Entry {
                    value: Bytes::copy_from_slice(value),
                    expires_at,
                },
            );
        }
    }

    /// Current value of a key
    pub fn get(&self, db: u32, key: impl AsRef<[u8]>) -> Option<Bytes> {
        let mut state = self.state.lock();
        state
            .live(db, key.as_ref(), Instant::now())
            .map(|e| e.value.clone())
    }

    /// Remaining time to live; `None` for missing or persistent keys
    pub fn ttl(&self, db: u32, key: impl AsRef<[u8]>) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.live(db, key.as_ref(), now)?.remaining(now)
    }

    /// Number of live keys in `db`
    pub fn len(&self, db: u32) -> usize {
        let mut state = self.state.lock();
        state.purge(Instant::now());
        state.databases.get(db as usize).map_or(0, HashMap::len)
    }

    /// All live key/value pairs of `db`, ordered by key
    pub fn snapshot(&self, db: u32) -> BTreeMap<Bytes, Bytes> {
        let mut state = self.state.lock();
        state.purge(Instant::now());
        state
            .databases
            .get(db as usize)
            .map(|map| {
                map.iter()
                    .map(|(k, e)| (k.clone(), e.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every command executed so far, in order
    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().log.clone()
    }

    /// How many times `name` was executed
    pub fn command_count(&self, name: &str) -> usize {
        let name = name.to_ascii_uppercase();
        self.state
            .lock()
            .log
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }

    /// Round trips received so far
    pub fn pipeline_count(&self) -> u64 {
        self.state.lock().pipelines
    }

    /// Answer every future `name` command with an error reply
    pub fn reject_command(&self, name: &str, message: &str) {
        self.state
            .lock()
            .rejections
            .insert(name.to_ascii_uppercase(), message.to_string());
    }

    /// Accept AUTH only with `password`, and require it from MIGRATE senders
    pub fn require_password(&self, password: &str) {
        self.state.lock().password = Some(password.to_string());
    }

    /// Fail every future round trip at the transport level
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn execute(&self, db: &mut u32, network: Option<&MemoryNetwork>, command: &Command) -> Frame {
        let name = command.name();
        let args = command.arguments();
        {
            let mut state = self.state.lock();
            state.log.push(command.clone());
            if let Some(message) = state.rejections.get(&name) {
                return Frame::error(message.clone());
            }
        }

        if name == "MIGRATE" {
            return self.migrate(*db, network, args);
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        match (name.as_str(), args) {
            ("PING", []) => Frame::simple("PONG"),
            ("AUTH", [password]) => match &state.password {
                None => Frame::error(
                    "ERR AUTH <password> called without any password configured for the default user",
                ),
                Some(expected) if expected.as_bytes() == &password[..] => Frame::simple("OK"),
                Some(_) => Frame::error("WRONGPASS invalid username-password pair"),
            },
            ("INFO", _) => {
                state.purge(now);
                Frame::bulk(info_text(&state))
            }
            ("SELECT", [index]) => match parse_int(index) {
                Some(n) if (0..DATABASES as i64).contains(&n) => {
                    *db = n as u32;
                    Frame::simple("OK")
                }
                _ => Frame::error("ERR DB index is out of range"),
            },
            ("DBSIZE", []) => {
                state.purge(now);
                let size = state.databases.get(*db as usize).map_or(0, HashMap::len);
                Frame::Integer(size as i64)
            }
            ("SET", [key, value]) => {
                if let Some(map) = state.db_mut(*db) {
                    map.insert(
                        key.clone(),
                        Entry {
                            value: value.clone(),
                            expires_at: None,
                        },
                    );
                }
                Frame::simple("OK")
            }
            ("GET", [key]) => match state.live(*db, key, now) {
                Some(entry) => Frame::bulk(entry.value.clone()),
                None => Frame::null(),
            },
            ("DEL", keys) if !keys.is_empty() => {
                let mut removed = 0;
                for key in keys {
                    if state.live(*db, key, now).is_some() {
                        if let Some(map) = state.db_mut(*db) {
                            map.remove(&key[..]);
                        }
                        removed += 1;
                    }
                }
                Frame::Integer(removed)
            }
            ("PEXPIRE", [key, ms]) => {
                let Some(ms) = parse_int(ms) else {
                    return not_an_integer();
                };
                if state.live(*db, key, now).is_none() {
                    return Frame::Integer(0);
                }
                if let Some(entry) = state.db_mut(*db).and_then(|m| m.get_mut(&key[..])) {
                    entry.expires_at = Some(now + Duration::from_millis(ms.max(0) as u64));
                }
                Frame::Integer(1)
            }
            ("PTTL", [key]) => match state.live(*db, key, now) {
                None => Frame::Integer(-2),
                Some(entry) => match entry.remaining(now) {
                    None => Frame::Integer(-1),
                    Some(left) => Frame::Integer(left.as_millis() as i64),
                },
            },
            ("DUMP", [key]) => match state.live(*db, key, now) {
                Some(entry) => {
                    let mut payload = Vec::with_capacity(entry.value.len() + 1);
                    payload.push(DUMP_STRING);
                    payload.extend_from_slice(&entry.value);
                    Frame::bulk(payload)
                }
                None => Frame::null(),
            },
            ("RESTORE", [key, ttl, payload, flags @ ..]) => {
                let replace = flags.iter().any(|f| f.eq_ignore_ascii_case(b"REPLACE"));
                let Some(ttl) = parse_int(ttl) else {
                    return not_an_integer();
                };
                if ttl < 0 {
                    return Frame::error("ERR Invalid TTL value, must be >= 0");
                }
                if payload.first() != Some(&DUMP_STRING) {
                    return Frame::error("ERR DUMP payload version or checksum are wrong");
                }
                if !replace && state.live(*db, key, now).is_some() {
                    return Frame::error("BUSYKEY Target key name already exists.");
                }
                let expires_at = (ttl > 0).then(|| now + Duration::from_millis(ttl as u64));
                if let Some(map) = state.db_mut(*db) {
                    map.insert(
                        key.clone(),
                        Entry {
                            value: payload.slice(1..),
                            expires_at,
                        },
                    );
                }
                Frame::simple("OK")
            }
            ("SCAN", [cursor, options @ ..]) => {
                let Some(cursor) = parse_int(cursor).filter(|c| *c >= 0) else {
                    return Frame::error("ERR invalid cursor");
                };
                let Some((pattern, count)) = scan_options(options) else {
                    return Frame::error("ERR syntax error");
                };
                state.purge(now);
                let mut keys: Vec<&Bytes> = state
                    .databases
                    .get(*db as usize)
                    .map(|m| m.keys().collect())
                    .unwrap_or_default();
                keys.sort();

                let start = (cursor as usize).min(keys.len());
                let end = start.saturating_add(count).min(keys.len());
                let next = if end >= keys.len() { 0 } else { end };
                let page = keys[start..end]
                    .iter()
                    .filter(|k| pattern.as_ref().map_or(true, |p| glob_match(p, k)))
                    .map(|k| Frame::bulk((*k).clone()))
                    .collect();
                Frame::array(vec![Frame::bulk(next.to_string()), Frame::array(page)])
            }
            (
                "PING" | "AUTH" | "SELECT" | "DBSIZE" | "SET" | "GET" | "DEL" | "PEXPIRE" | "PTTL" | "DUMP"
                | "RESTORE" | "SCAN",
                _,
            ) => Frame::error(format!(
                "ERR wrong number of arguments for '{}' command",
                name.to_ascii_lowercase()
            )),
            _ => Frame::error(format!("ERR unknown command '{}'", name)),
        }
    }

    // MIGRATE host port key|"" db timeout [COPY] [REPLACE] [AUTH pw] [KEYS k ...]
    fn migrate(&self, db: u32, network: Option<&MemoryNetwork>, args: &[Bytes]) -> Frame {
        let [host, port, key, target_db, timeout, options @ ..] = args else {
            return Frame::error("ERR wrong number of arguments for 'migrate' command");
        };
        let (Some(port), Some(target_db), Some(_timeout)) =
            (parse_int(port), parse_int(target_db), parse_int(timeout))
        else {
            return not_an_integer();
        };

        let mut copy = false;
        let mut replace = false;
        let mut auth: Option<Bytes> = None;
        let mut keys: Vec<Bytes> = Vec::new();
        let mut rest = options.iter();
        while let Some(option) = rest.next() {
            match String::from_utf8_lossy(option).to_ascii_uppercase().as_str() {
                "COPY" => copy = true,
                "REPLACE" => replace = true,
                "AUTH" => auth = rest.next().cloned(),
                "KEYS" => {
                    if !key.is_empty() {
                        return Frame::error(
                            "ERR When using MIGRATE KEYS option, the key argument must be set to the empty string",
                        );
                    }
                    keys.extend(rest.by_ref().cloned());
                }
                _ => return Frame::error("ERR syntax error"),
            }
        }
        if !key.is_empty() {
            keys.push(key.clone());
        }

        let host = String::from_utf8_lossy(host).into_owned();
        let target = network.and_then(|n| n.lookup(&host, port as u16));
        let Some(target) = target else {
            return Frame::error("IOERR error or timeout connecting to the client");
        };
        if Arc::ptr_eq(&target.state, &self.state) {
            return Frame::error("ERR Target instance is the source instance");
        }
        let target_password = target.state.lock().password.clone();
        if let Some(expected) = target_password {
            if auth.as_deref() != Some(expected.as_bytes()) {
                return Frame::error(
                    "ERR Target instance replied with error: NOAUTH Authentication required.",
                );
            }
        }

        let now = Instant::now();
        let moving: Vec<(Bytes, Entry)> = {
            let mut state = self.state.lock();
            keys.iter()
                .filter_map(|k| state.live(db, k, now).map(|e| (k.clone(), e.clone())))
                .collect()
        };
        if moving.is_empty() {
            return Frame::simple("NOKEY");
        }

        {
            let mut target_state = target.state.lock();
            let Some(map) = target_state.db_mut(target_db as u32) else {
                return Frame::error("ERR Target instance replied with error: ERR DB index is out of range");
            };
            if !replace && moving.iter().any(|(k, _)| map.get(k).is_some_and(|e| e.is_live(now))) {
                return Frame::error(
                    "ERR Target instance replied with error: BUSYKEY Target key name already exists.",
                );
            }
            for (k, entry) in &moving {
                map.insert(k.clone(), entry.clone());
            }
        }

        if !copy {
            let mut state = self.state.lock();
            if let Some(map) = state.db_mut(db) {
                for (k, _) in &moving {
                    map.remove(k);
                }
            }
        }
        Frame::simple("OK")
    }
}

/// Registry of servers reachable by MIGRATE
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    servers: Arc<Mutex<HashMap<(String, u16), MemoryServer>>>,
}

impl MemoryNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `server` reachable at `host:port`
    pub fn register(&self, host: &str, port: u16, server: MemoryServer) {
        self.servers.lock().insert((host.to_string(), port), server);
    }

    /// Server registered at `host:port`
    pub fn lookup(&self, host: &str, port: u16) -> Option<MemoryServer> {
        self.servers.lock().get(&(host.to_string(), port)).cloned()
    }

    /// Open a handle to `server` that can MIGRATE to peers on this network
    pub fn attach(&self, server: &MemoryServer, db: u32) -> MemoryEndpoint {
        MemoryEndpoint {
            server: server.clone(),
            network: Some(self.clone()),
            db,
        }
    }
}

/// A client handle to a [`MemoryServer`]
#[derive(Debug)]
pub struct MemoryEndpoint {
    server: MemoryServer,
    network: Option<MemoryNetwork>,
    db: u32,
}

impl MemoryEndpoint {
    /// Currently selected database
    pub fn db(&self) -> u32 {
        self.db
    }
}

#[async_trait]
impl Endpoint for MemoryEndpoint {
    async fn pipeline(&mut self, commands: &[Command]) -> Result<Vec<Frame>> {
        {
            let mut state = self.server.state.lock();
            if state.offline {
                return Err(CopyError::ConnectionClosed);
            }
            state.pipelines += 1;
        }
        let network = self.network.as_ref();
        Ok(commands
            .iter()
            .map(|c| self.server.execute(&mut self.db, network, c))
            .collect())
    }
}

fn info_text(state: &ServerState) -> String {
    let mut text = format!(
        "# Server\r\nredis_version:{}\r\nredis_mode:standalone\r\n\r\n# Keyspace\r\n",
        state.version
    );
    for (index, db) in state.databases.iter().enumerate() {
        if db.is_empty() {
            continue;
        }
        let expires = db.values().filter(|e| e.expires_at.is_some()).count();
        text.push_str(&format!(
            "db{}:keys={},expires={},avg_ttl=0\r\n",
            index,
            db.len(),
            expires
        ));
    }
    text
}

fn parse_int(arg: &Bytes) -> Option<i64> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

#[cold]
fn not_an_integer() -> Frame {
    Frame::error("ERR value is not an integer or out of range")
}

/// `[MATCH pattern] [COUNT n]`, default count 10
fn scan_options(options: &[Bytes]) -> Option<(Option<Bytes>, usize)> {
    let mut pattern = None;
    let mut count = 10usize;
    let mut iter = options.iter();
    while let Some(option) = iter.next() {
        let value = iter.next()?;
        if option.eq_ignore_ascii_case(b"MATCH") {
            pattern = Some(value.clone());
        } else if option.eq_ignore_ascii_case(b"COUNT") {
            count = parse_int(value).filter(|n| *n > 0)? as usize;
        } else {
            return None;
        }
    }
    Some((pattern, count))
}

/// Redis-style glob match: `*`, `?`, `[abc]`, `[^a-z]`, and `\` escapes
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some(b'?') => Some(1),
            Some(b'\\') if p + 1 < pattern.len() => (pattern[p + 1] == text[t]).then_some(2),
            Some(b'[') => match char_class(&pattern[p..], text[t]) {
                Some((true, width)) => Some(width),
                Some((false, _)) => None,
                // An unterminated class is matched literally.
                None => (text[t] == b'[').then_some(1),
            },
            Some(&c) => (c == text[t]).then_some(1),
            None => None,
        };

        match (step, backtrack) {
            (Some(width), _) => {
                p += width;
                t += 1;
            }
            (None, Some((star_p, star_t))) => {
                backtrack = Some((star_p, star_t + 1));
                p = star_p + 1;
                t = star_t + 1;
            }
            (None, None) => return false,
        }
    }

    pattern[p.min(pattern.len())..].iter().all(|&c| c == b'*')
}

/// Match `ch` against a `[...]` class at the start of `pattern`.
/// Returns `(matched, bytes consumed)`, or `None` if the class is unterminated.
fn char_class(pattern: &[u8], ch: u8) -> Option<(bool, usize)> {
    let mut i = 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != b']' {
        let c = if pattern[i] == b'\\' && i + 1 < pattern.len() {
            i += 1;
            pattern[i]
        } else {
            pattern[i]
        };
        if pattern.get(i + 1) == Some(&b'-') && pattern.get(i + 2).is_some_and(|&e| e != b']') {
            let (lo, hi) = (c.min(pattern[i + 2]), c.max(pattern[i + 2]));
            matched |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            matched |= c == ch;
            i += 1;
        }
    }

    (i < pattern.len()).then_some((matched != negate, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        let cases: &[(&str, &str, bool)] = &[
            ("*", "anything", true),
            ("*", "", true),
            ("user:*", "user:42", true),
            ("user:*", "session:42", false),
            ("h?llo", "hello", true),
            ("h?llo", "hllo", false),
            ("h[ae]llo", "hallo", true),
            ("h[ae]llo", "hillo", false),
            ("h[^e]llo", "hallo", true),
            ("h[^e]llo", "hello", false),
            ("k[0-9]", "k7", true),
            ("k[0-9]", "kx", false),
            ("a\\*b", "a*b", true),
            ("a\\*b", "axb", false),
            ("*:*:end", "a:b:c:end", true),
            ("*x", "abc", false),
        ];
        for (pattern, text, expected) in cases {
            assert_eq!(
                glob_match(pattern.as_bytes(), text.as_bytes()),
                *expected,
                "{pattern} ~ {text}"
            );
        }
    }

    #[tokio::test]
    async fn test_ttl_commands() {
        let server = MemoryServer::new("7.0.0");
        server.set(0, "p", "1");
        server.set_with_ttl(0, "e", "2", Duration::from_secs(10));
        let mut ep = server.connect(0);

        let replies = ep
            .pipeline(&[
                Command::new("PTTL").arg("p"),
                Command::new("PTTL").arg("e"),
                Command::new("PTTL").arg("missing"),
            ])
            .await
            .unwrap();
        assert_eq!(replies[0], Frame::Integer(-1));
        let left = replies[1].as_integer().unwrap();
        assert!(left > 9_000 && left <= 10_000, "{left}");
        assert_eq!(replies[2], Frame::Integer(-2));
    }

    #[tokio::test]
    async fn test_dump_restore_round_trip() {
        let server = MemoryServer::new("7.0.0");
        server.set(0, "k", "value");
        let mut ep = server.connect(0);

        let payload = ep.query(&Command::new("DUMP").arg("k")).await.unwrap();
        let payload = payload.into_bytes().unwrap();

        let busy = ep
            .query(&Command::new("RESTORE").arg("k").arg("0").arg(payload.clone()))
            .await
            .unwrap();
        assert!(busy.error_message().unwrap().starts_with("BUSYKEY"));

        let ok = ep
            .query(&Command::new("RESTORE").arg("k2").arg("1500").arg(payload))
            .await
            .unwrap();
        assert_eq!(ok, Frame::simple("OK"));
        assert_eq!(server.get(0, "k2").as_deref(), Some(&b"value"[..]));
        assert!(server.ttl(0, "k2").is_some());

        let bad = ep
            .query(&Command::new("RESTORE").arg("k3").arg("0").arg("junk"))
            .await
            .unwrap();
        assert!(bad.is_error());
    }

    #[tokio::test]
    async fn test_select_and_info() {
        let server = MemoryServer::new("5.0.7");
        server.set(3, "a", "1");
        server.set_with_ttl(3, "b", "1", Duration::from_secs(30));
        let mut ep = server.connect(0);

        let info = ep.info().await.unwrap();
        assert_eq!(info.version(), Some("5.0.7"));
        assert_eq!(info.keys_in(0), 0);
        assert_eq!(info.keyspace(3).map(|s| (s.keys, s.expires)), Some((2, 1)));

        ep.query(&Command::new("SELECT").arg("3")).await.unwrap();
        assert_eq!(ep.db(), 3);
        let size = ep.query(&Command::new("DBSIZE")).await.unwrap();
        assert_eq!(size, Frame::Integer(2));

        let err = ep.query(&Command::new("SELECT").arg("99")).await.unwrap();
        assert!(err.error_message().unwrap().contains("out of range"));
        assert_eq!(ep.db(), 3);
    }

    #[test]
    fn test_expired_keys_disappear() {
        let server = MemoryServer::new("7.0.0");
        server.set_with_ttl(0, "gone", "1", Duration::ZERO);
        assert!(server.get(0, "gone").is_none());
        assert_eq!(server.len(0), 0);
    }

    #[tokio::test]
    async fn test_migrate_without_copy_moves_keys() {
        let network = MemoryNetwork::new();
        let src = MemoryServer::new("7.0.0");
        let dst = MemoryServer::new("7.0.0");
        network.register("dst", 6379, dst.clone());
        src.set(0, "a", "1");

        let mut ep = network.attach(&src, 0);
        let reply = ep
            .query(
                &Command::new("MIGRATE")
                    .args(["dst", "6379", "", "0", "1000", "KEYS", "a"]),
            )
            .await
            .unwrap();
        assert_eq!(reply, Frame::simple("OK"));
        assert_eq!(src.len(0), 0);
        assert_eq!(dst.get(0, "a").as_deref(), Some(&b"1"[..]));
    }

    #[tokio::test]
    async fn test_migrate_forwards_auth() {
        let network = MemoryNetwork::new();
        let src = MemoryServer::new("7.0.0");
        let dst = MemoryServer::new("7.0.0");
        dst.require_password("secret");
        network.register("dst", 6379, dst.clone());
        src.set(0, "a", "1");
        let mut ep = network.attach(&src, 0);

        let denied = ep
            .query(&Command::new("MIGRATE").args(["dst", "6379", "", "0", "1000", "COPY", "KEYS", "a"]))
            .await
            .unwrap();
        assert!(denied.error_message().unwrap().contains("NOAUTH"));

        let ok = ep
            .query(&Command::new("MIGRATE").args([
                "dst", "6379", "", "0", "1000", "COPY", "AUTH", "secret", "KEYS", "a",
            ]))
            .await
            .unwrap();
        assert_eq!(ok, Frame::simple("OK"));
        assert_eq!(src.len(0), 1);
    }

    #[tokio::test]
    async fn test_offline_server_fails_round_trips() {
        let server = MemoryServer::new("7.0.0");
        server.set_offline(true);
        let err = server
            .connect(0)
            .query(&Command::new("PING"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(server.pipeline_count(), 0);
    }
}
