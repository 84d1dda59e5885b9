//! Runtime configuration: the backing dictionary for `CONFIG GET`/`CONFIG SET`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    NoEviction,
    AllKeysLru,
    AllKeysRandom,
    VolatileLru,
    VolatileRandom,
    VolatileTtl,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::NoEviction
    }
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::NoEviction => "noeviction",
            EvictionPolicy::AllKeysLru => "allkeys-lru",
            EvictionPolicy::AllKeysRandom => "allkeys-random",
            EvictionPolicy::VolatileLru => "volatile-lru",
            EvictionPolicy::VolatileRandom => "volatile-random",
            EvictionPolicy::VolatileTtl => "volatile-ttl",
        }
    }
}

/// The server's runtime configuration. Covers the `CONFIG GET`/`SET`
/// dictionary spec.md §6 requires plus the handful of safety knobs the
/// teacher carries for every build (`maxmemory`/`maxmemory-policy`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub server_version: String,
    pub protocol_version: u8,
    pub databases: usize,
    pub lua_modules: Vec<String>,
    pub notify_keyspace_events: String,
    pub maxmemory: u64,
    pub maxmemory_policy: EvictionPolicy,
    pub requirepass: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_version: "7.4.0".to_string(),
            protocol_version: 2,
            databases: 16,
            lua_modules: Vec::new(),
            notify_keyspace_events: String::new(),
            maxmemory: 0,
            maxmemory_policy: EvictionPolicy::NoEviction,
            requirepass: None,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, falling back to `Config::default`
    /// field values for anything the file omits.
    pub fn from_toml_str(s: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::from_str(s, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Looks up a `CONFIG GET` parameter by its kebab-case name.
    pub fn get_param(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "server-version" => Some(self.server_version.clone()),
            "databases" => Some(self.databases.to_string()),
            "notify-keyspace-events" => Some(self.notify_keyspace_events.clone()),
            "maxmemory" => Some(self.maxmemory.to_string()),
            "maxmemory-policy" => Some(self.maxmemory_policy.as_str().to_string()),
            "requirepass" => Some(self.requirepass.clone().unwrap_or_default()),
            _ => None,
        }
    }

    /// Applies a `CONFIG SET` for a known parameter. Returns `false` for an
    /// unrecognized name.
    pub fn set_param(&mut self, name: &str, value: &str) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "notify-keyspace-events" => {
                self.notify_keyspace_events = value.to_string();
                true
            }
            "maxmemory" => match value.parse() {
                Ok(v) => {
                    self.maxmemory = v;
                    true
                }
                Err(_) => false,
            },
            "maxmemory-policy" => {
                let policy = match value {
                    "noeviction" => EvictionPolicy::NoEviction,
                    "allkeys-lru" => EvictionPolicy::AllKeysLru,
                    "allkeys-random" => EvictionPolicy::AllKeysRandom,
                    "volatile-lru" => EvictionPolicy::VolatileLru,
                    "volatile-random" => EvictionPolicy::VolatileRandom,
                    "volatile-ttl" => EvictionPolicy::VolatileTtl,
                    _ => return false,
                };
                self.maxmemory_policy = policy;
                true
            }
            "requirepass" => {
                self.requirepass = if value.is_empty() { None } else { Some(value.to_string()) };
                true
            }
            _ => false,
        }
    }
}
