use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::fx_settings::dsl::*;
use crate::settings::{ForexSettings, ForexSettingsUpdate, FxSetting};
use diesel::prelude::*;
use diesel::sql_query;
use log::{info, warn};
use std::sync::Arc;

/// Name of the (misspelled) settings table created by early deployments.
const LEGACY_SETTINGS_TABLE: &str = "foriegn_exchange_settings";

// Define the trait for SettingsRepository
pub trait SettingsRepositoryTrait: Send + Sync {
    fn get_settings(&self) -> Result<ForexSettings>;
    fn update_settings(&self, new_settings: &ForexSettingsUpdate) -> Result<()>;
    fn get_setting(&self, setting_key_param: &str) -> Result<String>;
    fn update_setting(&self, setting_key_param: &str, setting_value_param: &str) -> Result<()>;
    fn migrate_legacy_settings(&self) -> Result<bool>;
}

pub struct SettingsRepository {
    pool: Arc<DbPool>,
}

impl SettingsRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        SettingsRepository { pool }
    }
}

#[derive(QueryableByName)]
struct TableCount {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    present: i32,
}

#[derive(QueryableByName)]
struct LegacySettingsRow {
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    user_id: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    password: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    api_key: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Bool>)]
    use_https: Option<bool>,
}

impl SettingsRepositoryTrait for SettingsRepository {
    fn get_settings(&self) -> Result<ForexSettings> {
        let mut conn = get_connection(&self.pool)?;
        let all_settings: Vec<(String, String)> = fx_settings
            .select((setting_key, setting_value))
            .load::<(String, String)>(&mut conn)
            .map_err(Error::from)?;

        let mut settings = ForexSettings::default();

        for (key, value) in all_settings {
            match key.as_str() {
                "api_key" => settings.api_key = value,
                "use_https" => settings.use_https = value.parse().unwrap_or(false),
                "user_id" => settings.user_id = value,
                "password" => settings.password = value,
                _ => {} // Ignore unknown settings
            }
        }

        Ok(settings)
    }

    fn update_settings(&self, new_settings: &ForexSettingsUpdate) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;

        conn.transaction::<_, Error, _>(|conn| {
            if let Some(ref api_key_val) = new_settings.api_key {
                diesel::replace_into(fx_settings)
                    .values(&FxSetting {
                        setting_key: "api_key".to_string(),
                        setting_value: api_key_val.clone(),
                    })
                    .execute(conn)?;
            }

            if let Some(use_https_val) = new_settings.use_https {
                diesel::replace_into(fx_settings)
                    .values(&FxSetting {
                        setting_key: "use_https".to_string(),
                        setting_value: use_https_val.to_string(),
                    })
                    .execute(conn)?;
            }

            if let Some(ref user_id_val) = new_settings.user_id {
                diesel::replace_into(fx_settings)
                    .values(&FxSetting {
                        setting_key: "user_id".to_string(),
                        setting_value: user_id_val.clone(),
                    })
                    .execute(conn)?;
            }

            if let Some(ref password_val) = new_settings.password {
                diesel::replace_into(fx_settings)
                    .values(&FxSetting {
                        setting_key: "password".to_string(),
                        setting_value: password_val.clone(),
                    })
                    .execute(conn)?;
            }

            Ok(())
        })
    }

    fn get_setting(&self, setting_key_param: &str) -> Result<String> {
        let mut conn = get_connection(&self.pool)?;
        let result = fx_settings
            .filter(setting_key.eq(setting_key_param))
            .select(setting_value)
            .first(&mut conn);

        match result {
            Ok(value) => Ok(value),
            Err(diesel::result::Error::NotFound) => Ok("".to_string()),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn update_setting(&self, setting_key_param: &str, setting_value_param: &str) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        diesel::replace_into(fx_settings)
            .values(FxSetting {
                setting_key: setting_key_param.to_string(),
                setting_value: setting_value_param.to_string(),
            })
            .execute(&mut conn)
            .map_err(Error::from)?;
        Ok(())
    }

    /// One-shot carry-over from the misspelled settings table shipped by
    /// early deployments. Copies the first row's credentials into the
    /// key/value store and drops the old table. A no-op when the table
    /// is absent.
    fn migrate_legacy_settings(&self) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;

        let count: TableCount = sql_query(
            "SELECT COUNT(*) AS present FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind::<diesel::sql_types::Text, _>(LEGACY_SETTINGS_TABLE)
        .get_result(&mut conn)?;

        if count.present == 0 {
            return Ok(false);
        }

        warn!(
            "Found legacy settings table '{}', migrating its contents",
            LEGACY_SETTINGS_TABLE
        );

        let rows: Vec<LegacySettingsRow> = sql_query(format!(
            "SELECT user_id, password, api_key, use_https FROM {} LIMIT 1",
            LEGACY_SETTINGS_TABLE
        ))
        .load(&mut conn)?;

        conn.transaction::<_, Error, _>(|conn| {
            if let Some(row) = rows.into_iter().next() {
                let carried = [
                    ("user_id", row.user_id),
                    ("password", row.password),
                    ("api_key", row.api_key),
                    ("use_https", row.use_https.map(|v| v.to_string())),
                ];

                for (key, value) in carried {
                    if let Some(value) = value {
                        diesel::replace_into(fx_settings)
                            .values(&FxSetting {
                                setting_key: key.to_string(),
                                setting_value: value,
                            })
                            .execute(conn)?;
                    }
                }
            }

            sql_query(format!("DROP TABLE {}", LEGACY_SETTINGS_TABLE)).execute(conn)?;

            Ok(())
        })?;

        info!("Legacy settings table migrated and dropped");
        Ok(true)
    }
}
