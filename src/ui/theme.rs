use crate::config::THEME_KEY;
use crate::error::AppResult;
use crate::storage::Store;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Stored preference; anything unreadable falls back to light.
    pub async fn load(store: &dyn Store) -> AppResult<Self> {
        match store.get(THEME_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value.clone()).unwrap_or_else(|_| {
                debug!(%value, "unknown theme preference, using default");
                Theme::default()
            })),
            None => Ok(Theme::default()),
        }
    }

    pub async fn save(self, store: &dyn Store) -> AppResult<()> {
        store.set(THEME_KEY, Value::from(self.as_str())).await
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Flip and persist the theme, returning the new one.
pub async fn toggle_theme(store: &dyn Store) -> AppResult<Theme> {
    let theme = Theme::load(store).await?.toggled();
    theme.save(store).await?;
    Ok(theme)
}
