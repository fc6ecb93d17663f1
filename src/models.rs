use serde::{Deserialize, Serialize};

pub type Timestamp = i64;

/// Version tag written into every persisted JSON envelope.
pub const SCHEMA_VERSION: u32 = 1;

/// A single to-do entry.
///
/// `id` is opaque and store-assigned; optimistic copies carry a temporary
/// client-side id until the store confirms. `created_at` is store-assigned
/// as well and is `None` on optimistic copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// View filter over the task collection. Never mutates the collection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// A signed-in identity as supplied by the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// The owner whose task collection is currently visible: either the
/// local-only pseudo-owner or a signed-in identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Owner {
    Local,
    User(Identity),
}

pub const LOCAL_OWNER_ID: &str = "local";

impl Owner {
    pub fn id(&self) -> &str {
        match self {
            Owner::Local => LOCAL_OWNER_ID,
            Owner::User(identity) => identity.uid.as_str(),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Owner::Local => None,
            Owner::User(identity) => identity.display_name.as_deref(),
        }
    }
}

/// Time-of-day bucket boundaries for the fallback greeting. These were
/// magic numbers scattered across the UI variants; here they are explicit
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GreetingBuckets {
    pub morning_end: u32,
    pub afternoon_end: u32,
    pub evening_end: u32,
}

impl Default for GreetingBuckets {
    fn default() -> Self {
        Self {
            morning_end: 12,
            afternoon_end: 18,
            evening_end: 22,
        }
    }
}

/// Fallback greeting sentences, one per bucket. `{name}` is replaced with
/// the resolved display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GreetingTemplates {
    pub morning: String,
    pub afternoon: String,
    pub evening: String,
    pub late: String,
}

impl Default for GreetingTemplates {
    fn default() -> Self {
        Self {
            morning: "Good morning, {name}! Let's make today count.".to_string(),
            afternoon: "Good afternoon, {name}! Keep the momentum going.".to_string(),
            evening: "Good evening, {name}! A little progress still counts.".to_string(),
            late: "Burning the midnight oil, {name}? One small task, then rest.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GreetingSettings {
    /// Welcome endpoint URL. When absent the local template is used directly.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// How long the greeting overlay stays up before auto-dismissing.
    #[serde(default = "default_greeting_display_ms")]
    pub display_ms: u64,
    #[serde(default)]
    pub buckets: GreetingBuckets,
    #[serde(default)]
    pub templates: GreetingTemplates,
}

impl Default for GreetingSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            display_ms: default_greeting_display_ms(),
            buckets: GreetingBuckets::default(),
            templates: GreetingTemplates::default(),
        }
    }
}

fn default_greeting_display_ms() -> u64 {
    3_000
}

/// Remote task store configuration. Absent means local-only persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SyncSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Locally stored display name; takes precedence over the identity's.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub greeting: GreetingSettings,
    #[serde(default)]
    pub sync: Option<SyncSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            display_name: None,
            greeting: GreetingSettings::default(),
            sync: None,
        }
    }
}

fn default_theme() -> String {
    "light".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TasksFile {
    pub schema_version: u32,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionFile {
    pub schema_version: u32,
    #[serde(default)]
    pub identity: Option<Identity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.display_name, None);
        assert_eq!(settings.greeting.endpoint, None);
        assert_eq!(settings.greeting.display_ms, 3_000);
        assert_eq!(settings.greeting.buckets.morning_end, 12);
        assert_eq!(settings.greeting.buckets.afternoon_end, 18);
        assert_eq!(settings.greeting.buckets.evening_end, 22);
        assert!(settings.greeting.templates.morning.contains("{name}"));
        assert!(settings.sync.is_none());
    }

    #[test]
    fn settings_serde_applies_defaults_for_missing_optional_fields() {
        let json = r#"{ "theme": "dark" }"#;

        let settings: Settings = serde_json::from_str(json).expect("settings should deserialize");
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.display_name, None);
        assert_eq!(settings.greeting, GreetingSettings::default());
        assert!(settings.sync.is_none());

        // A fully empty object must also yield defaults.
        let settings: Settings = serde_json::from_str("{}").expect("empty settings object");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn task_created_at_defaults_to_none_when_missing() {
        let json = r#"{ "id": "t1", "text": "buy milk", "completed": false }"#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.created_at, None);
    }

    #[test]
    fn filter_parses_and_round_trips() {
        for (input, expected) in [
            ("all", Filter::All),
            ("Active", Filter::Active),
            (" completed ", Filter::Completed),
        ] {
            let parsed: Filter = input.parse().expect("filter should parse");
            assert_eq!(parsed, expected);
            assert_eq!(parsed.as_str().parse::<Filter>().unwrap(), parsed);
        }
        assert!("done".parse::<Filter>().is_err());
    }

    #[test]
    fn filter_matches_by_completion() {
        let active = Task {
            id: "a".to_string(),
            text: "x".to_string(),
            completed: false,
            created_at: Some(1),
        };
        let done = Task {
            completed: true,
            ..active.clone()
        };
        assert!(Filter::All.matches(&active) && Filter::All.matches(&done));
        assert!(Filter::Active.matches(&active) && !Filter::Active.matches(&done));
        assert!(!Filter::Completed.matches(&active) && Filter::Completed.matches(&done));
    }

    #[test]
    fn owner_id_scopes_collections() {
        assert_eq!(Owner::Local.id(), LOCAL_OWNER_ID);
        let owner = Owner::User(Identity {
            uid: "uid-1".to_string(),
            display_name: Some("Sam".to_string()),
        });
        assert_eq!(owner.id(), "uid-1");
        assert_eq!(owner.display_name(), Some("Sam"));
        assert_eq!(Owner::Local.display_name(), None);
    }
}
