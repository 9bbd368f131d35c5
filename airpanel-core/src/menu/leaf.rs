//! Leaf actions

use log::{error, info};

use crate::config::{parse_positive, ConfigSection};

/// Mark appended to the label of a ticked [`Toggle`]
pub const TICK: &str = "✓";

/// Action behind a menu leaf
///
/// Both methods get the leaf's label to rewrite. The engine redraws the row
/// when [`activate`](Self::activate) changed the label.
pub trait LeafAction: Send {
    /// Run when the leaf is confirmed
    fn activate(&mut self, label: &mut String);

    /// Run before the containing list is drawn, so the label can follow
    /// state that changed elsewhere
    fn refresh(&mut self, label: &mut String) {
        let _ = label;
    }
}

impl<F> LeafAction for F
where
    F: FnMut(&mut String) + Send,
{
    fn activate(&mut self, label: &mut String) {
        self(label)
    }
}

/// Check-box leaf
pub struct Toggle {
    name: String,
    ticked: bool,
}

impl Toggle {
    /// Create a new toggle
    pub fn new(name: impl Into<String>, ticked: bool) -> Self {
        Self {
            name: name.into(),
            ticked,
        }
    }

    /// Current state
    pub fn is_ticked(&self) -> bool {
        self.ticked
    }

    /// Label for the current state
    pub fn label(&self) -> String {
        if self.ticked {
            format!("{} {}", self.name, TICK)
        } else {
            self.name.clone()
        }
    }
}

impl LeafAction for Toggle {
    fn activate(&mut self, label: &mut String) {
        self.ticked = !self.ticked;
        *label = self.label();
    }

    fn refresh(&mut self, label: &mut String) {
        *label = self.label();
    }
}

/// Toggle persisted as "1"/"0" under one settings key
pub struct OnOffSetting {
    toggle: Toggle,
    config: ConfigSection,
    key: String,
}

impl OnOffSetting {
    /// Create a new setting; its state is read from `config`
    pub fn new(name: impl Into<String>, config: ConfigSection, key: &str) -> Self {
        let ticked = config.get_flag(key);
        Self {
            toggle: Toggle::new(name, ticked),
            config,
            key: key.to_string(),
        }
    }

    /// Current state
    pub fn is_on(&self) -> bool {
        self.toggle.is_ticked()
    }
}

impl LeafAction for OnOffSetting {
    fn activate(&mut self, label: &mut String) {
        let on = !self.toggle.is_ticked();
        match self.config.set(&self.key, if on { "1" } else { "0" }) {
            Ok(()) => {
                self.toggle.ticked = on;
                *label = self.toggle.label();
                info!("{} = {}", self.key, on);
            }
            Err(e) => error!("{} not saved: {}", self.key, e),
        }
    }

    fn refresh(&mut self, label: &mut String) {
        self.toggle.ticked = self.config.get_flag(&self.key);
        *label = self.toggle.label();
    }
}

/// Leaf cycling a period through a fixed list of choices, in seconds
pub struct FrequencyChoice {
    name: String,
    choices: Vec<u64>,
    config: ConfigSection,
    key: String,
    default: u64,
}

impl FrequencyChoice {
    /// Create a new choice; `default` is shown while the key is unset
    pub fn new(
        name: impl Into<String>,
        config: ConfigSection,
        key: &str,
        choices: Vec<u64>,
        default: u64,
    ) -> Self {
        Self {
            name: name.into(),
            choices,
            config,
            key: key.to_string(),
            default,
        }
    }

    /// Stored value, or the default
    pub fn current(&self) -> u64 {
        self.config.get_u64(&self.key, self.default)
    }

    /// Value the next activation stores
    ///
    /// The choice after the current one, wrapping around; the first choice
    /// when the current value is not in the list.
    pub fn next(&self) -> Option<u64> {
        let stored = parse_positive(self.config.get(&self.key).as_deref());
        let position = stored.and_then(|value| self.choices.iter().position(|&c| c == value));
        match position {
            Some(i) => self.choices.get((i + 1) % self.choices.len()).copied(),
            None => self.choices.first().copied(),
        }
    }

    fn label_for(&self, value: u64) -> String {
        format!("{}: {}s", self.name, value)
    }
}

impl LeafAction for FrequencyChoice {
    fn activate(&mut self, label: &mut String) {
        let Some(value) = self.next() else {
            return;
        };
        match self.config.set(&self.key, &value.to_string()) {
            Ok(()) => {
                *label = self.label_for(value);
                info!("{} = {}s", self.key, value);
            }
            Err(e) => error!("{} not saved: {}", self.key, e),
        }
    }

    fn refresh(&mut self, label: &mut String) {
        *label = self.label_for(self.current());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use std::sync::Arc;

    fn section(dir: &tempfile::TempDir) -> ConfigSection {
        ConfigSection::new(
            Arc::new(ConfigStore::new()),
            dir.path().join("settings.toml"),
            "display_config",
        )
    }

    #[test]
    fn test_toggle_ticks() {
        let mut toggle = Toggle::new("Sensors", false);
        let mut label = String::from("Sensors");
        toggle.activate(&mut label);
        assert_eq!(label, "Sensors ✓");
        toggle.activate(&mut label);
        assert_eq!(label, "Sensors");
        assert!(!toggle.is_ticked());
    }

    #[test]
    fn test_closure_leaf() {
        let mut count = 0;
        let mut action = move |label: &mut String| {
            count += 1;
            *label = format!("pressed {}", count);
        };
        let mut label = String::new();
        LeafAction::activate(&mut action, &mut label);
        LeafAction::activate(&mut action, &mut label);
        assert_eq!(label, "pressed 2");
    }

    #[test]
    fn test_on_off_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = section(&dir);
        let mut setting = OnOffSetting::new("PM1", config.clone(), "PM1");
        assert!(setting.is_on());

        let mut label = String::new();
        setting.refresh(&mut label);
        assert_eq!(label, "PM1 ✓");

        setting.activate(&mut label);
        assert_eq!(label, "PM1");
        assert_eq!(config.get("PM1").as_deref(), Some("0"));

        config.set("PM1", "1").unwrap();
        setting.refresh(&mut label);
        assert!(setting.is_on());
        assert_eq!(label, "PM1 ✓");
    }

    #[test]
    fn test_frequency_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let config = section(&dir);
        let mut choice = FrequencyChoice::new("View Period", config.clone(), "view_period", vec![4, 5, 10, 20], 5);

        let mut label = String::new();
        choice.refresh(&mut label);
        assert_eq!(label, "View Period: 5s");

        // Unset is not in the list: start over from the first choice
        choice.activate(&mut label);
        assert_eq!(label, "View Period: 4s");
        choice.activate(&mut label);
        assert_eq!(label, "View Period: 5s");

        config.set("view_period", "20").unwrap();
        choice.activate(&mut label);
        assert_eq!(label, "View Period: 4s");
        assert_eq!(config.get("view_period").as_deref(), Some("4"));

        config.set("view_period", "7").unwrap();
        assert_eq!(choice.next(), Some(4));
        assert_eq!(choice.current(), 7);
    }
}
