/// Analytics endpoints
///
/// - `GET /analytics/clarity` - Clarity loader script for page layouts,
///   `204 No Content` when tracking is off
/// - `GET /analytics/settings` - Current analytics settings (session)

use crate::{
    analytics::{render_clarity_snippet, AnalyticsSettings, ClarityOverrides},
    app::AppState,
    session::AuthSession,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

/// Query accepted by the public snippet endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ClarityQuery {
    /// `false` suppresses the tag for this page
    pub enabled: Option<bool>,
}

impl ClarityQuery {
    /// Overrides a caller may apply: it can switch tracking off, never
    /// on, and never choose the project
    fn overrides(&self) -> ClarityOverrides {
        ClarityOverrides {
            project_id: None,
            enabled: (self.enabled == Some(false)).then_some(false),
        }
    }
}

/// Clarity snippet handler
///
/// Renders the configured project only. Full overrides are available to
/// server-side callers through [`render_clarity_snippet`].
pub async fn clarity_snippet(
    State(state): State<AppState>,
    Query(query): Query<ClarityQuery>,
) -> Response {
    match render_clarity_snippet(&state.config.analytics, &query.overrides()) {
        Some(snippet) => Html(snippet).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Analytics settings handler
pub async fn settings(
    State(state): State<AppState>,
    Extension(_session): Extension<AuthSession>,
) -> Json<AnalyticsSettings> {
    Json(AnalyticsSettings::from(&state.config.analytics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_can_only_suppress() {
        let off = ClarityQuery { enabled: Some(false) }.overrides();
        assert_eq!(off.enabled, Some(false));
        assert!(off.project_id.is_none());

        let on = ClarityQuery { enabled: Some(true) }.overrides();
        assert_eq!(on.enabled, None);

        assert_eq!(ClarityQuery::default().overrides().enabled, None);
    }
}
