// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Separator between sections in environment variable names.
///
/// `MERIDIAN_DISCOVERY__CONSUL_HOST` maps to the key `discovery.consul_host`.
pub const SECTION_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables as dotted configuration keys
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Map raw `(name, value)` pairs to configuration keys.
    ///
    /// With a prefix, only variables starting with `{prefix}_` are kept and the
    /// prefix is stripped.
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let name = match self.prefix {
                Some(ref prefix) => match key
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                {
                    Some(rest) => rest,
                    None => continue,
                },
                None => key.as_str(),
            };

            if name.is_empty() {
                continue;
            }

            config.insert(to_config_key(name), value);
        }

        config
    }

    /// Load a specific environment variable by configuration key
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::Env)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Environment variable name for a dotted configuration key.
    pub fn var_name(&self, key: &str) -> String {
        let name = key.replace('.', SECTION_SEPARATOR).to_uppercase();
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, name),
            None => name,
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

fn to_config_key(name: &str) -> String {
    name.to_lowercase().replace(SECTION_SEPARATOR, ".")
}
