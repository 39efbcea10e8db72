//! Device inventory loading.
//!
//! The inventory is a YAML or JSON document listing devices either as a
//! sequence of mappings or as a mapping from a name to a device mapping.
//! Each device needs `hostname`, `username`, `password` and `device_type`;
//! anything else is kept for the template.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::error::InventoryError;

/// One device from the inventory. Identity is the hostname.
pub struct DeviceRecord {
    pub hostname: String,
    pub username: String,
    pub password: SecretString,
    pub device_type: String,
    /// Additional fields for the template, in inventory order.
    pub extra: IndexMap<String, Value>,
}

impl DeviceRecord {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            device_type: device_type.into(),
            extra: IndexMap::new(),
        }
    }

    /// Add a template field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// All fields as a template context: the fixed fields first, then extras.
    pub fn template_context(&self) -> serde_json::Map<String, Value> {
        let mut context = serde_json::Map::new();
        context.insert("hostname".into(), Value::from(self.hostname.clone()));
        context.insert("username".into(), Value::from(self.username.clone()));
        context.insert(
            "password".into(),
            Value::from(self.password.expose_secret().to_string()),
        );
        context.insert("device_type".into(), Value::from(self.device_type.clone()));
        for (key, value) in &self.extra {
            context.insert(key.clone(), value.clone());
        }
        context
    }
}

impl fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("device_type", &self.device_type)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Device entry as written in the file, before validation.
#[derive(Debug, Deserialize)]
struct RawDevice {
    hostname: Option<Value>,
    username: Option<Value>,
    password: Option<Value>,
    #[serde(alias = "deviceType")]
    device_type: Option<Value>,
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
}

/// Load and validate an inventory file. The format follows the extension.
pub fn load(path: &Path) -> Result<Vec<Arc<DeviceRecord>>, InventoryError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |message: String| InventoryError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let document: Value = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
        "json" => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
        other => {
            return Err(InventoryError::UnsupportedFormat {
                extension: other.to_string(),
            });
        }
    };

    validate(document)
}

/// Parse inventory YAML from a string.
pub fn from_yaml_str(text: &str) -> Result<Vec<Arc<DeviceRecord>>, InventoryError> {
    let document: Value = serde_yaml::from_str(text).map_err(|e| InventoryError::Parse {
        path: "<inline>".into(),
        message: e.to_string(),
    })?;
    validate(document)
}

fn validate(document: Value) -> Result<Vec<Arc<DeviceRecord>>, InventoryError> {
    let entries: Vec<(Option<String>, Value)> = match document {
        Value::Null => Vec::new(),
        Value::Array(devices) => devices.into_iter().map(|d| (None, d)).collect(),
        Value::Object(devices) => devices.into_iter().map(|(k, d)| (Some(k), d)).collect(),
        other => {
            return Err(InventoryError::UnexpectedShape {
                found: describe(&other),
            });
        }
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(entries.len());

    for (index, (key, entry)) in entries.into_iter().enumerate() {
        let label = key.clone().unwrap_or_else(|| format!("#{}", index + 1));

        if !entry.is_object() {
            return Err(InventoryError::InvalidDevice {
                device: label,
                message: format!("expected a mapping, found {}", describe(&entry)),
            });
        }
        let raw: RawDevice =
            serde_json::from_value(entry).map_err(|e| InventoryError::InvalidDevice {
                device: label.clone(),
                message: e.to_string(),
            })?;

        let hostname = scalar(raw.hostname, &label, "hostname")?
            .or(key)
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| InventoryError::MissingField {
                device: label.clone(),
                field: "hostname",
            })?;

        let required = |value: Option<Value>, field: &'static str| -> Result<String, InventoryError> {
            scalar(value, &hostname, field)?.ok_or_else(|| InventoryError::MissingField {
                device: hostname.clone(),
                field,
            })
        };
        let username = required(raw.username, "username")?;
        let password = required(raw.password, "password")?;
        let device_type = required(raw.device_type, "device_type")?;

        if !seen.insert(hostname.clone()) {
            return Err(InventoryError::DuplicateHostname { hostname });
        }

        records.push(Arc::new(DeviceRecord {
            hostname,
            username,
            password: SecretString::from(password),
            device_type,
            extra: raw.extra,
        }));
    }

    Ok(records)
}

/// Read a fixed field as text. Numbers and booleans are taken literally,
/// so `password: 12345` works unquoted.
fn scalar(
    value: Option<Value>,
    device: &str,
    field: &'static str,
) -> Result<Option<String>, InventoryError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(InventoryError::InvalidDevice {
            device: device.to_string(),
            message: format!("field '{field}' must be a scalar, found {}", describe(&other)),
        }),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
