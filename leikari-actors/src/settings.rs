/*
    Leikari
    Copyright (C) 2021 Quickwit Inc.

    Leikari is offered under the AGPL v3.0 and as commercial software.
    For commercial licensing, contact us at hello@quickwit.io.

    AGPL:
    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as
    published by the Free Software Foundation, either version 3 of the
    License, or (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

use std::path::Path;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::warn;

/// Hierarchical settings store.
///
/// Merged from an optional `config.json` discovered at `./`, `./conf`,
/// `./config` and `./configs` (first hit wins), overlaid with environment
/// variables prefixed `LEIKARI_` (lower-cased, `_` mapped to `.`). Keys are
/// dotted paths, matched case-insensitively; values set through the
/// environment are strings and the typed getters coerce them.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    root: Value,
}

const CONFIG_DIRS: [&str; 4] = [".", "conf", "config", "configs"];
const ENV_PREFIX: &str = "leikari_";

impl Settings {
    pub fn new() -> Settings {
        Settings {
            root: Value::Object(Map::new()),
        }
    }

    /// Settings from a literal value, mostly for tests. Object keys are
    /// normalized to lowercase.
    pub fn from_value(value: Value) -> Settings {
        Settings {
            root: normalize(value),
        }
    }

    /// Discovers the config file and merges the process environment over
    /// it.
    pub fn load() -> Settings {
        let mut settings = Settings::new();
        for dir in &CONFIG_DIRS {
            let path = Path::new(dir).join("config.json");
            if !path.exists() {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<Value>(&content) {
                    Ok(value) => {
                        settings.merge(value);
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "ignoring unparsable config file");
                    }
                },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring unreadable config file");
                }
            }
            break;
        }
        settings.apply_env(std::env::vars());
        settings
    }

    fn apply_env(&mut self, vars: impl Iterator<Item = (String, String)>) {
        for (name, value) in vars {
            let lower = name.to_lowercase();
            if !lower.starts_with(ENV_PREFIX) {
                continue;
            }
            let key = lower.replace('_', ".");
            self.set(&key, Value::String(value));
        }
    }

    pub fn merge(&mut self, other: Value) {
        merge_value(&mut self.root, normalize(other));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in key.to_lowercase().split('.') {
            match current {
                Value::Object(fields) => {
                    current = fields.get(segment)?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        let key = key.to_lowercase();
        let mut segments: Vec<&str> = key.split('.').collect();
        let last = match segments.pop() {
            Some(last) => last,
            None => return,
        };
        let mut current = &mut self.root;
        for segment in segments {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = match current.as_object_mut() {
                Some(fields) => fields
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
                None => return,
            };
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Some(fields) = current.as_object_mut() {
            fields.insert(last.to_string(), normalize(value));
        }
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The subtree under `key`, or empty settings.
    pub fn sub(&self, key: &str) -> Settings {
        match self.get(key) {
            Some(value) => Settings {
                root: value.clone(),
            },
            None => Settings::new(),
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get_i64(key).and_then(|n| {
            if n >= 0 {
                Some(n as usize)
            } else {
                None
            }
        })
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or_else(|| default.to_string())
    }
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key.to_lowercase(), normalize(value)))
                .collect(),
        ),
        other => other,
    }
}

fn merge_value(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Object(base_fields), Value::Object(other_fields)) => {
            for (key, value) in other_fields {
                match base_fields.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        base_fields.insert(key, value);
                    }
                }
            }
        }
        (base, other) => *base = other,
    }
}

/// Per-actor runtime settings, resolved from `leikari.actor.<name>.*`
/// merged with per-spawn options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorSettings {
    /// Worker count, at least 1.
    pub worker_pool: usize,
    /// Mailbox capacity, at least 1.
    pub message_queue: usize,
    /// Spawn-per-message dispatch.
    pub async_mode: bool,
}

impl Default for ActorSettings {
    fn default() -> Self {
        ActorSettings {
            worker_pool: 1,
            message_queue: 1000,
            async_mode: false,
        }
    }
}

/// Per-spawn overrides; unset fields fall back to the settings store, then
/// to defaults.
#[derive(Debug, Clone, Default)]
pub struct SpawnOpts {
    pub(crate) name: Option<String>,
    pub(crate) worker_pool: Option<usize>,
    pub(crate) message_queue: Option<usize>,
    pub(crate) async_mode: Option<bool>,
}

impl SpawnOpts {
    pub fn new() -> SpawnOpts {
        SpawnOpts::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> SpawnOpts {
        self.name = Some(name.into());
        self
    }

    pub fn worker_pool(mut self, size: usize) -> SpawnOpts {
        self.worker_pool = Some(size);
        self
    }

    pub fn message_queue(mut self, size: usize) -> SpawnOpts {
        self.message_queue = Some(size);
        self
    }

    /// Spawn-per-message dispatch. Receivers must then tolerate concurrent
    /// invocations.
    pub fn async_mode(mut self, async_mode: bool) -> SpawnOpts {
        self.async_mode = Some(async_mode);
        self
    }
}

/// System-wide settings, scoped to the `leikari` keyspace.
#[derive(Debug, Clone, Default)]
pub struct SystemSettings {
    settings: Settings,
}

const DEFAULT_SHUTDOWN_TIMEOUT_MS: i64 = 10_000;

impl SystemSettings {
    /// Wraps an already-scoped settings subtree.
    pub fn new(settings: Settings) -> SystemSettings {
        SystemSettings { settings }
    }

    /// Loads the config file and environment and scopes to `leikari.*`.
    pub fn load() -> SystemSettings {
        SystemSettings::new(Settings::load().sub("leikari"))
    }

    /// Scoped settings from a literal value, mostly for tests.
    pub fn from_value(value: Value) -> SystemSettings {
        SystemSettings::new(Settings::from_value(value))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn no_signature(&self) -> bool {
        self.settings.get_bool_or("nosignature", false)
    }

    pub fn loglevel(&self) -> String {
        self.settings.get_str_or("loglevel", "INFO")
    }

    /// Budget a closing handler waits for its children and workers before
    /// giving up, in milliseconds.
    pub fn shutdown_timeout(&self) -> Duration {
        let millis = self
            .settings
            .get_i64("shutdowntimeout")
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_MS);
        Duration::from_millis(millis as u64)
    }

    pub fn actor_settings(&self, name: &str, opts: &SpawnOpts) -> ActorSettings {
        let defaults = ActorSettings::default();
        let sub = self.settings.sub(&format!("actor.{}", name));
        let worker_pool = opts
            .worker_pool
            .or_else(|| sub.get_usize("workerpool"))
            .filter(|size| *size > 0)
            .unwrap_or(defaults.worker_pool);
        let message_queue = opts
            .message_queue
            .or_else(|| sub.get_usize("messagequeue"))
            .filter(|size| *size > 0)
            .unwrap_or(defaults.message_queue);
        let async_mode = opts
            .async_mode
            .or_else(|| sub.get_bool("async"))
            .unwrap_or(defaults.async_mode);
        ActorSettings {
            worker_pool,
            message_queue,
            async_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_dotted_get() {
        let settings = Settings::from_value(json!({
            "leikari": { "actor": { "countries": { "workerPool": 4 } } }
        }));
        assert_eq!(settings.get_usize("leikari.actor.countries.workerpool"), Some(4));
        // Key matching is case-insensitive.
        assert_eq!(settings.get_usize("leikari.actor.countries.workerPool"), Some(4));
        assert!(!settings.is_set("leikari.actor.cities"));
    }

    #[test]
    fn test_settings_env_overlay() {
        let mut settings = Settings::from_value(json!({
            "leikari": { "loglevel": "INFO" }
        }));
        settings.apply_env(
            vec![
                ("LEIKARI_LOGLEVEL".to_string(), "DEBUG".to_string()),
                ("LEIKARI_ACTOR_W_ASYNC".to_string(), "true".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(settings.get_str("leikari.loglevel"), Some("DEBUG".to_string()));
        assert_eq!(settings.get_bool("leikari.actor.w.async"), Some(true));
        assert!(!settings.is_set("path"));
    }

    #[test]
    fn test_settings_string_coercion() {
        let settings = Settings::from_value(json!({
            "a": "42", "b": "true", "c": "2.5"
        }));
        assert_eq!(settings.get_i64("a"), Some(42));
        assert_eq!(settings.get_bool("b"), Some(true));
        assert_eq!(settings.get_f64("c"), Some(2.5));
    }

    #[test]
    fn test_actor_settings_resolution_order() {
        let system = SystemSettings::from_value(json!({
            "actor": { "w": { "workerPool": 2, "messageQueue": 50 } }
        }));
        let settings = system.actor_settings("w", &SpawnOpts::new());
        assert_eq!(settings.worker_pool, 2);
        assert_eq!(settings.message_queue, 50);
        assert!(!settings.async_mode);

        // Per-spawn options win over the store.
        let settings = system.actor_settings("w", &SpawnOpts::new().worker_pool(8).async_mode(true));
        assert_eq!(settings.worker_pool, 8);
        assert_eq!(settings.message_queue, 50);
        assert!(settings.async_mode);

        // Unknown actors get the defaults.
        let settings = system.actor_settings("other", &SpawnOpts::new());
        assert_eq!(settings, ActorSettings::default());
    }

    #[test]
    fn test_zero_sizes_fall_back_to_defaults() {
        let system = SystemSettings::from_value(json!({
            "actor": { "w": { "workerPool": 0, "messageQueue": 0 } }
        }));
        let settings = system.actor_settings("w", &SpawnOpts::new());
        assert_eq!(settings.worker_pool, 1);
        assert_eq!(settings.message_queue, 1000);
    }

    #[test]
    fn test_shutdown_timeout() {
        let system = SystemSettings::from_value(json!({}));
        assert_eq!(system.shutdown_timeout(), Duration::from_secs(10));
        let system = SystemSettings::from_value(json!({ "shutdownTimeout": 250 }));
        assert_eq!(system.shutdown_timeout(), Duration::from_millis(250));
    }
}
