/// Microsoft Clarity analytics tag
///
/// Renders the Clarity loader script from configuration. The snippet is
/// suppressed when tracking is disabled or no project is configured.
/// Callers may override both settings per request. Project ids are
/// restricted to ASCII letters and digits, since they are interpolated
/// into a script.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Origin the Clarity loader and its beacons use
pub const CLARITY_ORIGIN: &str = "https://www.clarity.ms";

/// Longest project id accepted
pub const MAX_PROJECT_ID_LENGTH: usize = 50;

/// Clarity settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarityOptions {
    /// Clarity project id
    pub project_id: Option<String>,

    /// Whether tracking is on
    pub enabled: bool,
}

impl Default for ClarityOptions {
    fn default() -> Self {
        Self {
            project_id: None,
            enabled: true,
        }
    }
}

/// Analytics configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsOptions {
    pub clarity: ClarityOptions,
}

impl AnalyticsOptions {
    /// Whether pages will carry the Clarity tag with no overrides applied
    pub fn clarity_active(&self) -> bool {
        render_clarity_snippet(self, &ClarityOverrides::default()).is_some()
    }
}

/// Per-request replacements for the configured values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClarityOverrides {
    pub project_id: Option<String>,
    pub enabled: Option<bool>,
}

/// Builds the Clarity loader script
///
/// Returns `None` when disabled, when no project id is set, or when the
/// project id is not a plain alphanumeric string.
pub fn render_clarity_snippet(
    options: &AnalyticsOptions,
    overrides: &ClarityOverrides,
) -> Option<String> {
    let enabled = overrides.enabled.unwrap_or(options.clarity.enabled);
    let project_id = overrides
        .project_id
        .as_deref()
        .or(options.clarity.project_id.as_deref())?;

    if !enabled || !is_valid_project_id(project_id) {
        return None;
    }

    Some(format!(
        r#"<script type="text/javascript">
    (function(c,l,a,r,i,t,y){{
        c[a]=c[a]||function(){{(c[a].q=c[a].q||[]).push(arguments)}};
        t=l.createElement(r);t.async=1;t.src="{origin}/tag/"+i;
        y=l.getElementsByTagName(r)[0];y.parentNode.insertBefore(t,y);
    }})(window, document, "clarity", "script", "{project_id}");
</script>"#,
        origin = CLARITY_ORIGIN,
        project_id = project_id,
    ))
}

fn is_valid_project_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_PROJECT_ID_LENGTH
        && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Current analytics settings, as shown to administrators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AnalyticsSettings {
    #[validate(length(max = 50, message = "Project ID cannot exceed 50 characters"))]
    pub clarity_project_id: String,

    pub clarity_enabled: bool,

    /// Enabled with a project id
    pub is_configured: bool,
}

impl AnalyticsSettings {
    pub fn new(clarity_project_id: String, clarity_enabled: bool) -> Self {
        let is_configured = clarity_enabled && !clarity_project_id.is_empty();
        Self {
            clarity_project_id,
            clarity_enabled,
            is_configured,
        }
    }
}

impl From<&AnalyticsOptions> for AnalyticsSettings {
    fn from(options: &AnalyticsOptions) -> Self {
        Self::new(
            options.clarity.project_id.clone().unwrap_or_default(),
            options.clarity.enabled,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(project_id: &str, enabled: bool) -> AnalyticsOptions {
        AnalyticsOptions {
            clarity: ClarityOptions {
                project_id: Some(project_id.to_string()),
                enabled,
            },
        }
    }

    #[test]
    fn test_snippet_contains_project_id() {
        let snippet =
            render_clarity_snippet(&configured("abc123", true), &ClarityOverrides::default())
                .unwrap();

        assert!(snippet.starts_with("<script"));
        assert!(snippet.contains(r#""clarity", "script", "abc123""#));
        assert!(snippet.contains("https://www.clarity.ms/tag/"));
    }

    #[test]
    fn test_snippet_suppressed() {
        let none = ClarityOverrides::default();

        assert!(render_clarity_snippet(&configured("abc123", false), &none).is_none());
        assert!(render_clarity_snippet(&configured("", true), &none).is_none());
        assert!(render_clarity_snippet(&AnalyticsOptions::default(), &none).is_none());
        assert!(render_clarity_snippet(&configured("ab\"c); alert(1", true), &none).is_none());
        assert!(render_clarity_snippet(&configured(&"a".repeat(51), true), &none).is_none());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let options = configured("abc123", false);

        let snippet = render_clarity_snippet(
            &options,
            &ClarityOverrides {
                project_id: Some("zzz999".to_string()),
                enabled: Some(true),
            },
        )
        .unwrap();
        assert!(snippet.contains("zzz999"));
        assert!(!snippet.contains("abc123"));

        let suppressed = render_clarity_snippet(
            &configured("abc123", true),
            &ClarityOverrides {
                project_id: None,
                enabled: Some(false),
            },
        );
        assert!(suppressed.is_none());
    }

    #[test]
    fn test_settings() {
        let settings = AnalyticsSettings::from(&configured("abc123", true));
        assert!(settings.is_configured);
        assert!(settings.validate().is_ok());

        assert!(!AnalyticsSettings::new(String::new(), true).is_configured);
        assert!(!AnalyticsSettings::new("abc".to_string(), false).is_configured);
        assert!(AnalyticsSettings::new("a".repeat(51), true).validate().is_err());
    }

    #[test]
    fn test_clarity_active() {
        assert!(configured("abc123", true).clarity_active());
        assert!(!AnalyticsOptions::default().clarity_active());
    }
}
