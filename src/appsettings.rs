use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct TelegramSettings {
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct CountdownSettings {
    pub target_date: NaiveDate,
    pub fire_time: NaiveTime,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl CountdownSettings {
    pub fn timezone(&self) -> anyhow::Result<Option<Tz>> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|e| anyhow::anyhow!("Unknown timezone {name}: {e}"))
            })
            .transpose()
    }
}

#[derive(Deserialize, Debug)]
pub struct AppSettings {
    pub telegram: TelegramSettings,
    pub countdown: CountdownSettings,
}

impl AppSettings {
    pub fn load() -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("appsettings").required(true))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("telegram.token", std::env::var("TELEGRAM_BOT_TOKEN").ok())?
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let settings: Self = config
            .try_deserialize()
            .context("Invalid application settings")?;

        anyhow::ensure!(
            !settings.telegram.token.trim().is_empty(),
            "Telegram token is not configured. Set APP_TELEGRAM__TOKEN or TELEGRAM_BOT_TOKEN."
        );
        settings.countdown.timezone()?;

        Ok(settings)
    }
}
