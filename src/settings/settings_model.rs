use diesel::prelude::*;
use diesel::Queryable;
use serde::{Deserialize, Serialize};

const HTTPS_SUBSCRIPTION_WARNING: &str = "HTTPS requires a CurrencyLayer subscription with the \
    HTTPS feature enabled. Ensure this has been configured before enabling HTTPS here.";

/// Provider credentials and transport preferences, read fresh at the
/// start of every rate resolution.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ForexSettings {
    pub api_key: String,
    pub use_https: bool,
    pub user_id: String,
    pub password: String,
}

impl Default for ForexSettings {
    fn default() -> Self {
        Self {
            api_key: "".to_string(),
            use_https: false,
            user_id: "".to_string(),
            password: "".to_string(),
        }
    }
}

impl ForexSettings {
    pub fn has_legacy_credentials(&self) -> bool {
        !self.user_id.is_empty() && !self.password.is_empty()
    }

    /// Advisory notices the host can surface next to the settings form.
    /// These never block resolution.
    pub fn validation_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.use_https {
            warnings.push(HTTPS_SUBSCRIPTION_WARNING.to_string());
        }

        warnings
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForexSettingsUpdate {
    pub api_key: Option<String>,
    pub use_https: Option<bool>,
    pub user_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Queryable, Insertable, Serialize, Deserialize, Debug)]
#[diesel(table_name = crate::schema::fx_settings)]
#[serde(rename_all = "camelCase")]
pub struct FxSetting {
    pub setting_key: String,
    pub setting_value: String,
}
