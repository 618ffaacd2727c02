//! Form Data Store
//!
//! Holds the migration settings the operator is building. Fields are
//! addressed by a typed [`FieldKey`]; the value shape ([`FieldValue`]) must
//! match the field kind, so checkbox fields can only ever hold booleans and
//! every other field holds the raw string it was given.

use crate::config::{FormDefaults, SecretString};
use crate::error::{MigratorError, Result};
use serde::Serialize;
use std::str::FromStr;

/// Region code preselected in a fresh form (US - East)
pub const DEFAULT_LOCATION: u32 = 21;

/// A Rocket.net data-center region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub code: u32,
    pub label: &'static str,
}

/// Regions offered by the destination step, in display order
pub const LOCATIONS: &[Location] = &[
    Location { code: 12, label: "US - Central" },
    Location { code: 21, label: "US - East" },
    Location { code: 25, label: "CA - Toronto" },
    Location { code: 4, label: "GB - London" },
    Location { code: 7, label: "DE - Frankfurt" },
    Location { code: 16, label: "AU - Sydney" },
    Location { code: 20, label: "SG - Singapore" },
];

/// Look up a region by code
pub fn location(code: u32) -> Option<&'static Location> {
    LOCATIONS.iter().find(|loc| loc.code == code)
}

/// Display label for a region code
pub fn location_label(code: u32) -> &'static str {
    location(code).map(|loc| loc.label).unwrap_or("Unknown region")
}

/// Settings sent to the migration service when a job is launched
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationConfig {
    pub admin_url: String,
    pub username: String,
    pub password: SecretString,
    pub rocket_token: SecretString,
    pub rocket_name: String,
    pub rocket_location: u32,
    pub rocket_label: String,
    pub visual: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::with_defaults(&FormDefaults::default())
    }
}

impl MigrationConfig {
    pub fn with_defaults(defaults: &FormDefaults) -> Self {
        Self {
            admin_url: String::new(),
            username: String::new(),
            password: SecretString::default(),
            rocket_token: SecretString::default(),
            rocket_name: String::new(),
            rocket_location: defaults.rocket_location,
            rocket_label: String::new(),
            visual: defaults.visual,
        }
    }
}

/// How a field is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text that is masked when displayed
    Secret,
    /// One of the fixed region codes
    Select,
    Checkbox,
}

/// Wizard pane a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Source,
    Destination,
}

/// Every field of [`MigrationConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    AdminUrl,
    Username,
    Password,
    RocketToken,
    RocketName,
    RocketLocation,
    RocketLabel,
    Visual,
}

impl FieldKey {
    pub const ALL: [FieldKey; 8] = [
        FieldKey::AdminUrl,
        FieldKey::Username,
        FieldKey::Password,
        FieldKey::RocketToken,
        FieldKey::RocketName,
        FieldKey::RocketLocation,
        FieldKey::RocketLabel,
        FieldKey::Visual,
    ];

    /// Wire name, as used in the launch request body
    pub fn name(&self) -> &'static str {
        match self {
            Self::AdminUrl => "adminUrl",
            Self::Username => "username",
            Self::Password => "password",
            Self::RocketToken => "rocketToken",
            Self::RocketName => "rocketName",
            Self::RocketLocation => "rocketLocation",
            Self::RocketLabel => "rocketLabel",
            Self::Visual => "visual",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AdminUrl => "WP Admin URL",
            Self::Username => "Username",
            Self::Password => "Password",
            Self::RocketToken => "Rocket.net API Token",
            Self::RocketName => "Site Slug",
            Self::RocketLocation => "Location",
            Self::RocketLabel => "Site Label",
            Self::Visual => "Visual browser mode",
        }
    }

    /// Example input shown while the field is empty
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::AdminUrl => Some("https://example.com/wp-admin/"),
            Self::RocketName => Some("my-new-site"),
            Self::RocketLabel => Some("Production Migration"),
            _ => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Password | Self::RocketToken => FieldKind::Secret,
            Self::RocketLocation => FieldKind::Select,
            Self::Visual => FieldKind::Checkbox,
            _ => FieldKind::Text,
        }
    }

    pub fn group(&self) -> FieldGroup {
        match self {
            Self::AdminUrl | Self::Username | Self::Password => FieldGroup::Source,
            _ => FieldGroup::Destination,
        }
    }

    /// Fields of one wizard pane, in display order
    pub fn in_group(group: FieldGroup) -> Vec<FieldKey> {
        Self::ALL.into_iter().filter(|k| k.group() == group).collect()
    }
}

impl FromStr for FieldKey {
    type Err = MigratorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| MigratorError::UnknownField(s.to_string()))
    }
}

/// A value coming from an input widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Raw text from a text, password or select input
    Text(String),
    /// State of a checkbox
    Checked(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Checked(value)
    }
}

/// Mutable store behind the wizard panes
#[derive(Debug, Clone)]
pub struct FormStore {
    config: MigrationConfig,
    defaults: FormDefaults,
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new(FormDefaults::default())
    }
}

impl FormStore {
    pub fn new(defaults: FormDefaults) -> Self {
        Self {
            config: MigrationConfig::with_defaults(&defaults),
            defaults,
        }
    }

    /// Apply one field edit. The store is left untouched on error.
    pub fn update(&mut self, key: FieldKey, value: FieldValue) -> Result<()> {
        match (key, value) {
            (FieldKey::Visual, FieldValue::Checked(checked)) => {
                self.config.visual = checked;
            }
            (FieldKey::Visual, FieldValue::Text(_)) => {
                return Err(MigratorError::TypeMismatch {
                    field: key.name(),
                    expected: "a checkbox state",
                });
            }
            (_, FieldValue::Checked(_)) => {
                return Err(MigratorError::TypeMismatch {
                    field: key.name(),
                    expected: "text",
                });
            }
            (FieldKey::RocketLocation, FieldValue::Text(raw)) => {
                let code: u32 = raw.trim().parse().map_err(|_| MigratorError::InvalidValue {
                    field: key.name(),
                    reason: format!("'{}' is not a region code", raw),
                })?;
                if location(code).is_none() {
                    return Err(MigratorError::InvalidValue {
                        field: key.name(),
                        reason: format!("unknown region code {}", code),
                    });
                }
                self.config.rocket_location = code;
            }
            (FieldKey::AdminUrl, FieldValue::Text(raw)) => self.config.admin_url = raw,
            (FieldKey::Username, FieldValue::Text(raw)) => self.config.username = raw,
            (FieldKey::Password, FieldValue::Text(raw)) => self.config.password.replace(raw),
            (FieldKey::RocketToken, FieldValue::Text(raw)) => self.config.rocket_token.replace(raw),
            (FieldKey::RocketName, FieldValue::Text(raw)) => self.config.rocket_name = raw,
            (FieldKey::RocketLabel, FieldValue::Text(raw)) => self.config.rocket_label = raw,
        }

        tracing::trace!(field = key.name(), "form field updated");
        Ok(())
    }

    /// Stringly-typed entry point; unknown names are always rejected
    pub fn update_by_name(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let key = FieldKey::from_str(name)?;
        self.update(key, value)
    }

    /// Current value of a field as display text (secrets unmasked)
    pub fn value_of(&self, key: FieldKey) -> String {
        match key {
            FieldKey::AdminUrl => self.config.admin_url.clone(),
            FieldKey::Username => self.config.username.clone(),
            FieldKey::Password => self.config.password.expose_secret().to_string(),
            FieldKey::RocketToken => self.config.rocket_token.expose_secret().to_string(),
            FieldKey::RocketName => self.config.rocket_name.clone(),
            FieldKey::RocketLocation => self.config.rocket_location.to_string(),
            FieldKey::RocketLabel => self.config.rocket_label.clone(),
            FieldKey::Visual => self.config.visual.to_string(),
        }
    }

    /// Character count of a field's current value
    pub fn value_len(&self, key: FieldKey) -> usize {
        match key {
            FieldKey::Password => self.config.password.len(),
            FieldKey::RocketToken => self.config.rocket_token.len(),
            _ => self.value_of(key).chars().count(),
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Owned copy handed to a launch
    pub fn snapshot(&self) -> MigrationConfig {
        self.config.clone()
    }

    /// Restore the configured defaults, wiping any typed credentials
    pub fn reset(&mut self) {
        self.config = MigrationConfig::with_defaults(&self.defaults);
    }

    /// Text fields that are still empty. Advisory only: launches are never
    /// blocked on this.
    pub fn missing_fields(&self) -> Vec<FieldKey> {
        FieldKey::ALL
            .into_iter()
            .filter(|k| matches!(k.kind(), FieldKind::Text | FieldKind::Secret))
            .filter(|k| *k != FieldKey::RocketLabel)
            .filter(|k| self.value_len(*k) == 0)
            .collect()
    }

    /// Step to the next (or previous) region in display order
    pub fn cycle_location(&mut self, forward: bool) {
        let current = LOCATIONS
            .iter()
            .position(|loc| loc.code == self.config.rocket_location)
            .unwrap_or(0);
        let len = LOCATIONS.len();
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.config.rocket_location = LOCATIONS[next].code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_form_defaults() {
        let form = FormStore::default();
        let config = form.snapshot();
        assert!(config.admin_url.is_empty());
        assert!(config.username.is_empty());
        assert!(config.password.is_empty());
        assert!(config.rocket_token.is_empty());
        assert!(config.rocket_name.is_empty());
        assert!(config.rocket_label.is_empty());
        assert_eq!(config.rocket_location, 21);
        assert!(!config.visual);
    }

    #[test]
    fn test_text_fields_store_raw_value() {
        let mut form = FormStore::default();
        form.update(FieldKey::AdminUrl, "  https://example.com/wp-admin/ ".into())
            .unwrap();
        assert_eq!(form.config().admin_url, "  https://example.com/wp-admin/ ");

        form.update(FieldKey::Password, "s3cret".into()).unwrap();
        assert_eq!(form.config().password.expose_secret(), "s3cret");
    }

    #[test]
    fn test_repeated_empty_updates_stay_strings() {
        let mut form = FormStore::default();
        form.update(FieldKey::RocketName, "site".into()).unwrap();
        for _ in 0..3 {
            form.update(FieldKey::RocketName, "".into()).unwrap();
            assert_eq!(form.config().rocket_name, "");
        }
    }

    #[test]
    fn test_checkbox_stores_boolean() {
        let mut form = FormStore::default();
        form.update(FieldKey::Visual, true.into()).unwrap();
        assert!(form.config().visual);
        form.update(FieldKey::Visual, false.into()).unwrap();
        assert!(!form.config().visual);
    }

    #[test]
    fn test_checkbox_rejects_text() {
        let mut form = FormStore::default();
        let err = form.update(FieldKey::Visual, "true".into()).unwrap_err();
        assert!(matches!(err, MigratorError::TypeMismatch { field: "visual", .. }));
        assert!(!form.config().visual);
    }

    #[test]
    fn test_text_rejects_checked() {
        let mut form = FormStore::default();
        let err = form.update(FieldKey::Username, true.into()).unwrap_err();
        assert!(matches!(err, MigratorError::TypeMismatch { .. }));
        assert_eq!(form.config().username, "");
    }

    #[test]
    fn test_select_parses_region_code() {
        let mut form = FormStore::default();
        form.update(FieldKey::RocketLocation, "4".into()).unwrap();
        assert_eq!(form.config().rocket_location, 4);
    }

    #[test]
    fn test_select_rejects_unknown_region() {
        let mut form = FormStore::default();
        assert!(form.update(FieldKey::RocketLocation, "99".into()).is_err());
        assert!(form.update(FieldKey::RocketLocation, "east".into()).is_err());
        assert_eq!(form.config().rocket_location, 21);
    }

    #[test]
    fn test_update_by_name() {
        let mut form = FormStore::default();
        form.update_by_name("rocketToken", "tok".into()).unwrap();
        assert_eq!(form.config().rocket_token.expose_secret(), "tok");
        form.update_by_name("visual", true.into()).unwrap();
        assert!(form.config().visual);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut form = FormStore::default();
        let err = form.update_by_name("adminURL", "x".into()).unwrap_err();
        assert!(matches!(err, MigratorError::UnknownField(ref n) if n == "adminURL"));
    }

    #[test]
    fn test_field_key_round_trip_names() {
        for key in FieldKey::ALL {
            assert_eq!(key.name().parse::<FieldKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut form = FormStore::default();
        form.update(FieldKey::Username, "admin".into()).unwrap();
        let snapshot = form.snapshot();
        form.update(FieldKey::Username, "other".into()).unwrap();
        assert_eq!(snapshot.username, "admin");
    }

    #[test]
    fn test_reset_restores_configured_defaults() {
        let mut form = FormStore::new(FormDefaults {
            rocket_location: 7,
            visual: true,
        });
        form.update(FieldKey::AdminUrl, "https://a.example".into()).unwrap();
        form.update(FieldKey::RocketLocation, "20".into()).unwrap();
        form.update(FieldKey::Visual, false.into()).unwrap();

        form.reset();
        let config = form.snapshot();
        assert!(config.admin_url.is_empty());
        assert_eq!(config.rocket_location, 7);
        assert!(config.visual);
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let mut form = FormStore::default();
        form.update(FieldKey::AdminUrl, "https://a.example/wp-admin/".into()).unwrap();
        form.update(FieldKey::Password, "pw".into()).unwrap();
        form.update(FieldKey::RocketToken, "tok".into()).unwrap();

        let json = serde_json::to_value(form.snapshot()).unwrap();
        assert_eq!(json["adminUrl"], "https://a.example/wp-admin/");
        assert_eq!(json["password"], "pw");
        assert_eq!(json["rocketToken"], "tok");
        assert_eq!(json["rocketLocation"], 21);
        assert_eq!(json["visual"], false);
        assert_eq!(json.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_missing_fields_is_advisory() {
        let mut form = FormStore::default();
        assert_eq!(form.missing_fields().len(), 5);
        form.update(FieldKey::AdminUrl, "https://a.example".into()).unwrap();
        assert!(!form.missing_fields().contains(&FieldKey::AdminUrl));
        assert!(!form.missing_fields().contains(&FieldKey::RocketLabel));
    }

    #[test]
    fn test_cycle_location_wraps() {
        let mut form = FormStore::default();
        form.update(FieldKey::RocketLocation, "12".into()).unwrap();
        form.cycle_location(false);
        assert_eq!(form.config().rocket_location, 20);
        form.cycle_location(true);
        assert_eq!(form.config().rocket_location, 12);
        form.cycle_location(true);
        assert_eq!(form.config().rocket_location, 21);
    }

    #[test]
    fn test_field_groups() {
        assert_eq!(
            FieldKey::in_group(FieldGroup::Source),
            vec![FieldKey::AdminUrl, FieldKey::Username, FieldKey::Password]
        );
        assert_eq!(FieldKey::in_group(FieldGroup::Destination).len(), 5);
        assert_eq!(location_label(16), "AU - Sydney");
        assert_eq!(location_label(1), "Unknown region");
    }
}
