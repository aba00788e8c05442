//! Verification scenarios: a URL, an optional colour scheme, and a linear
//! list of steps.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PagecheckError, Result};
use crate::locator::{AriaRole, Locator};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Emulated `prefers-color-scheme` media feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Light,
    Dark,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// One step of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to the scenario URL.
    Goto,
    /// Wait until exactly one element matches and is visible.
    ExpectVisible { locator: Locator },
    /// Capture the viewport to a PNG file relative to the output directory.
    Screenshot { path: PathBuf },
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Goto => "goto",
            Self::ExpectVisible { .. } => "expect_visible",
            Self::Screenshot { .. } => "screenshot",
        }
    }

    /// Human-readable description used in logs and reports.
    pub fn label(&self, scenario_url: &str) -> String {
        match self {
            Self::Goto => format!("goto {scenario_url}"),
            Self::ExpectVisible { locator } => format!("expect {locator} visible"),
            Self::Screenshot { path } => format!("screenshot {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,

    pub steps: Vec<Step>,
}

impl Scenario {
    /// Home page shows the "Get Started" link and the "Knowledge Base"
    /// navigation heading.
    pub fn verify_changes() -> Self {
        Self {
            name: "verify-changes".into(),
            description: "Home page shows the Get Started link and the Knowledge Base group"
                .into(),
            url: DEFAULT_BASE_URL.into(),
            color_scheme: None,
            steps: vec![
                Step::Goto,
                Step::ExpectVisible {
                    locator: Locator::by_role(AriaRole::Link, "Get Started"),
                },
                Step::ExpectVisible {
                    locator: Locator::by_role(AriaRole::Heading, "Knowledge Base"),
                },
                Step::Screenshot {
                    path: PathBuf::from("jules-scratch/verification/verification.png"),
                },
            ],
        }
    }

    /// Changelog page captured with a light colour scheme. No assertions.
    pub fn changelog_light() -> Self {
        Self {
            name: "changelog-light".into(),
            description: "Changelog page rendered in light mode".into(),
            url: format!("{DEFAULT_BASE_URL}/changelog"),
            color_scheme: Some(ColorScheme::Light),
            steps: vec![
                Step::Goto,
                Step::Screenshot {
                    path: PathBuf::from("verification-light.png"),
                },
            ],
        }
    }

    pub fn builtins() -> Vec<Self> {
        vec![Self::verify_changes(), Self::changelog_light()]
    }

    /// Re-root the scenario URL on another origin, keeping path and query.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        Url::parse(base)
            .map_err(|e| PagecheckError::Config(format!("Invalid base URL '{base}': {e}")))?;
        let current = Url::parse(&self.url).map_err(|e| {
            PagecheckError::Scenario(format!("Scenario '{}' has invalid URL: {e}", self.name))
        })?;

        let mut rebased = base.trim_end_matches('/').to_string();
        if current.path() != "/" {
            rebased.push_str(current.path());
        }
        if let Some(query) = current.query() {
            rebased.push('?');
            rebased.push_str(query);
        }
        if let Some(fragment) = current.fragment() {
            rebased.push('#');
            rebased.push_str(fragment);
        }

        self.url = rebased;
        Ok(self)
    }

    /// Check the scenario is runnable.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PagecheckError::Scenario("Scenario name is empty".into()));
        }
        Url::parse(&self.url).map_err(|e| {
            PagecheckError::Scenario(format!("Scenario '{}' has invalid URL: {e}", self.name))
        })?;
        if !matches!(self.steps.first(), Some(Step::Goto)) {
            return Err(PagecheckError::Scenario(format!(
                "Scenario '{}' must start with a goto step",
                self.name
            )));
        }
        for step in &self.steps {
            if let Step::Screenshot { path } = step {
                if path.as_os_str().is_empty() || path.is_absolute() {
                    return Err(PagecheckError::Scenario(format!(
                        "Scenario '{}' has an invalid screenshot path: '{}'",
                        self.name,
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Screenshot paths this scenario writes, relative to the output directory.
    pub fn screenshot_paths(&self) -> Vec<&PathBuf> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Screenshot { path } => Some(path),
                _ => None,
            })
            .collect()
    }
}

/// Built-in scenarios plus any loaded from config.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
}

impl Default for ScenarioSet {
    fn default() -> Self {
        Self {
            scenarios: Scenario::builtins(),
        }
    }
}

impl ScenarioSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add scenarios, replacing any existing scenario with the same name.
    pub fn extend(&mut self, extra: impl IntoIterator<Item = Scenario>) -> Result<()> {
        for scenario in extra {
            scenario.validate()?;
            match self.scenarios.iter_mut().find(|s| s.name == scenario.name) {
                Some(existing) => *existing = scenario,
                None => self.scenarios.push(scenario),
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn list(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_changes_builtin() {
        let s = Scenario::verify_changes();
        assert_eq!(s.url, "http://localhost:3000");
        assert!(s.color_scheme.is_none());
        assert_eq!(
            s.steps[1],
            Step::ExpectVisible {
                locator: Locator::by_role(AriaRole::Link, "Get Started")
            }
        );
        assert_eq!(
            s.steps[2],
            Step::ExpectVisible {
                locator: Locator::by_role(AriaRole::Heading, "Knowledge Base")
            }
        );
        assert_eq!(
            s.screenshot_paths(),
            vec![&PathBuf::from("jules-scratch/verification/verification.png")]
        );
        s.validate().unwrap();
    }

    #[test]
    fn test_changelog_light_builtin() {
        let s = Scenario::changelog_light();
        assert_eq!(s.url, "http://localhost:3000/changelog");
        assert_eq!(s.color_scheme, Some(ColorScheme::Light));
        assert!(s.steps.iter().all(|st| !matches!(st, Step::ExpectVisible { .. })));
        assert_eq!(
            s.screenshot_paths(),
            vec![&PathBuf::from("verification-light.png")]
        );
        s.validate().unwrap();
    }

    #[test]
    fn test_with_base_url_keeps_path() {
        let s = Scenario::changelog_light()
            .with_base_url("http://127.0.0.1:8080")
            .unwrap();
        assert_eq!(s.url, "http://127.0.0.1:8080/changelog");
    }

    #[test]
    fn test_with_base_url_root() {
        let s = Scenario::verify_changes()
            .with_base_url("http://127.0.0.1:8080")
            .unwrap();
        assert_eq!(s.url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_with_base_url_prefix() {
        let s = Scenario::changelog_light()
            .with_base_url("https://staging.example.com/docs/")
            .unwrap();
        assert_eq!(s.url, "https://staging.example.com/docs/changelog");
    }

    #[test]
    fn test_with_base_url_invalid() {
        assert!(Scenario::verify_changes().with_base_url("not a url").is_err());
    }

    #[test]
    fn test_validate_requires_leading_goto() {
        let mut s = Scenario::changelog_light();
        s.steps.remove(0);
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("goto"));
    }

    #[test]
    fn test_validate_rejects_absolute_screenshot() {
        let mut s = Scenario::changelog_light();
        s.steps[1] = Step::Screenshot {
            path: PathBuf::from("/tmp/out.png"),
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_step_deserialize_tagged() {
        let steps: Vec<Step> = json5::from_str(
            r#"[
                { action: "goto" },
                { action: "expect_visible", locator: { role: "button", name: "Save", exact: true } },
                { action: "screenshot", path: "out/save.png" },
            ]"#,
        )
        .unwrap();
        assert_eq!(steps[0], Step::Goto);
        assert_eq!(
            steps[1],
            Step::ExpectVisible {
                locator: Locator::by_role(AriaRole::Button, "Save").exact()
            }
        );
        assert_eq!(steps[2].kind(), "screenshot");
    }

    #[test]
    fn test_scenario_set_defaults_and_override() {
        let mut set = ScenarioSet::new();
        assert_eq!(set.names(), vec!["verify-changes", "changelog-light"]);

        let mut dark = Scenario::changelog_light();
        dark.name = "changelog-dark".into();
        dark.color_scheme = Some(ColorScheme::Dark);
        let mut light = Scenario::changelog_light();
        light.description = "overridden".into();
        set.extend(vec![dark, light]).unwrap();

        assert_eq!(set.list().len(), 3);
        assert_eq!(set.get("changelog-light").unwrap().description, "overridden");
        assert_eq!(
            set.get("changelog-dark").unwrap().color_scheme,
            Some(ColorScheme::Dark)
        );
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn test_scenario_set_rejects_invalid() {
        let mut set = ScenarioSet::new();
        let mut bad = Scenario::verify_changes();
        bad.name = "bad".into();
        bad.url = "::".into();
        assert!(set.extend(vec![bad]).is_err());
        assert_eq!(set.list().len(), 2);
    }
}
