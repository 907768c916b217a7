mod appsettings;
mod clock;
mod countdown;
mod scheduling;
mod telegram;

use std::sync::Arc;

use appsettings::AppSettings;
use clock::{Clock, SystemClock};
use scheduling::{CountdownScheduler, DailyFireTime, NotificationDispatcher};
use teloxide::Bot;
use telegram::{TelegramDeliveryChannel, TelegramInteractionInterface};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let settings = AppSettings::load()?;
    let countdown = &settings.countdown;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(countdown.timezone()?));
    let bot = Bot::new(settings.telegram.token.clone());

    let delivery_channel = Arc::new(TelegramDeliveryChannel::new(bot.clone()));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        countdown.target_date,
        Arc::clone(&clock),
        delivery_channel,
    ));
    let scheduler = Arc::new(CountdownScheduler::new(
        DailyFireTime::new(countdown.fire_time),
        clock,
        dispatcher,
    ));

    log::info!(
        "Countdown configured. [target_date = {}, fire_time = {}, timezone = {}]",
        countdown.target_date,
        countdown.fire_time,
        countdown.timezone.as_deref().unwrap_or("local")
    );

    TelegramInteractionInterface::start(bot, Arc::clone(&scheduler)).await;

    scheduler.shutdown().await;
    Ok(())
}
