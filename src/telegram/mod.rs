mod delivery;
mod util;

pub use delivery::TelegramDeliveryChannel;

use std::sync::Arc;

use chrono::NaiveDateTime;
use teloxide::{
    dptree::case,
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
    utils::command::BotCommands,
};

use crate::scheduling::{CountdownScheduler, DailyFireTime};
use util::try_get_message_from_query;

type HandlerResult = anyhow::Result<()>;
type HandlerScheduler = Arc<CountdownScheduler<ChatId>>;

const START_BUTTON_DATA: &str = "start";
const STOP_BUTTON_DATA: &str = "stop";

pub struct TelegramInteractionInterface;

impl TelegramInteractionInterface {
    pub async fn start(bot: Bot, scheduler: HandlerScheduler) {
        log::info!("Starting Telegram UI.");

        let command_handler = Update::filter_message().branch(
            teloxide::filter_command::<GlobalCommand, _>()
                .branch(case![GlobalCommand::Start].endpoint(start))
                .branch(case![GlobalCommand::Stop].endpoint(stop))
                .branch(case![GlobalCommand::Status].endpoint(status))
                .branch(case![GlobalCommand::Help].endpoint(help)),
        );

        let button_handler = Update::filter_callback_query().endpoint(button);

        let invalid_message_handler =
            Update::filter_message().branch(dptree::endpoint(invalid_message));

        let schema = dptree::entry()
            .branch(command_handler)
            .branch(button_handler)
            .branch(invalid_message_handler);

        Dispatcher::builder(bot, schema)
            .dependencies(dptree::deps![scheduler])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await
    }
}

async fn start(bot: Bot, msg: Message, scheduler: HandlerScheduler) -> HandlerResult {
    let text = subscribe(&scheduler, msg.chat.id).await;
    reply(&bot, msg.chat.id, text).await
}

async fn stop(bot: Bot, msg: Message, scheduler: HandlerScheduler) -> HandlerResult {
    let text = unsubscribe(&scheduler, msg.chat.id).await;
    reply(&bot, msg.chat.id, text).await
}

async fn status(bot: Bot, msg: Message, scheduler: HandlerScheduler) -> HandlerResult {
    let next_fire_at = scheduler.job(&msg.chat.id).await.map(|job| job.next_fire_at);
    reply(&bot, msg.chat.id, status_text(next_fire_at)).await
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    reply(&bot, msg.chat.id, GlobalCommand::descriptions().to_string()).await
}

async fn button(bot: Bot, query: CallbackQuery, scheduler: HandlerScheduler) -> HandlerResult {
    bot.answer_callback_query(query.id.clone()).await?;

    let Some(chat_id) = try_get_message_from_query(&query).map(|msg| msg.chat.id) else {
        log::warn!(
            "Callback query without an accessible message. [query_id = {:?}]",
            query.id
        );
        return Ok(());
    };

    let text = match query.data.as_deref() {
        Some(START_BUTTON_DATA) => subscribe(&scheduler, chat_id).await,
        Some(STOP_BUTTON_DATA) => unsubscribe(&scheduler, chat_id).await,
        data => {
            log::warn!(
                "Unknown button pressed. [chat_id = {}, data = {:?}]",
                chat_id,
                data
            );
            "Unknown action.".to_owned()
        }
    };

    reply(&bot, chat_id, text).await
}

async fn invalid_message(bot: Bot, msg: Message) -> HandlerResult {
    reply(
        &bot,
        msg.chat.id,
        "Unable to handle the message. Use /start or /stop.".to_owned(),
    )
    .await
}

async fn subscribe(scheduler: &CountdownScheduler<ChatId>, chat_id: ChatId) -> String {
    let outcome = scheduler.start(chat_id).await;
    log::info!(
        "Chat subscribed. [chat_id = {}, kind = {:?}, first_fire_at = {}]",
        chat_id,
        outcome.kind,
        outcome.first_fire_at
    );
    started_text(scheduler.fire_time(), outcome.replaced)
}

async fn unsubscribe(scheduler: &CountdownScheduler<ChatId>, chat_id: ChatId) -> String {
    let removed = scheduler.stop(&chat_id).await;
    stopped_text(removed).to_owned()
}

async fn reply(bot: &Bot, chat_id: ChatId, text: String) -> HandlerResult {
    bot.send_message(chat_id, text)
        .reply_markup(keyboard())
        .await?;
    Ok(())
}

fn started_text(fire_time: &DailyFireTime, replaced: bool) -> String {
    let mut text = format!(
        "Subscription started! Every day at {} I will tell you how many days are left until the event.",
        fire_time.time().format("%H:%M:%S")
    );
    if replaced {
        text.push_str(" The previous subscription was removed.");
    }
    text
}

fn stopped_text(removed: bool) -> &'static str {
    if removed {
        "Subscription stopped."
    } else {
        "Subscription is not active."
    }
}

fn status_text(next_fire_at: Option<NaiveDateTime>) -> String {
    match next_fire_at {
        Some(at) => format!(
            "Subscription is active. Next notification at {}.",
            at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => "Subscription is not active.".to_owned(),
    }
}

fn keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("Start", START_BUTTON_DATA)],
        vec![InlineKeyboardButton::callback("Stop", STOP_BUTTON_DATA)],
    ])
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum GlobalCommand {
    #[command(description = "start the daily countdown.")]
    Start,
    #[command(description = "stop the daily countdown.")]
    Stop,
    #[command(description = "show when the next countdown arrives.")]
    Status,
    #[command(description = "show this text.")]
    Help,
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    fn fire_time() -> DailyFireTime {
        DailyFireTime::new(NaiveTime::from_hms_opt(20, 4, 40).unwrap())
    }

    #[test]
    pub fn started_text_mentions_fire_time() {
        let text = started_text(&fire_time(), false);

        assert!(text.contains("20:04:40"), "text = {text}");
        assert!(!text.contains("previous subscription"));
    }

    #[test]
    pub fn started_text_mentions_replacement() {
        let text = started_text(&fire_time(), true);

        assert!(text.ends_with("The previous subscription was removed."));
    }

    #[test]
    pub fn stopped_text_depends_on_removal() {
        assert_eq!(stopped_text(true), "Subscription stopped.");
        assert_eq!(stopped_text(false), "Subscription is not active.");
    }

    #[test]
    pub fn status_text_shows_next_fire() {
        let next = NaiveDate::from_ymd_opt(2027, 3, 2)
            .unwrap()
            .and_time(*fire_time().time());

        assert_eq!(
            status_text(Some(next)),
            "Subscription is active. Next notification at 2027-03-02 20:04:40."
        );
        assert_eq!(status_text(None), "Subscription is not active.");
    }

    #[test]
    pub fn keyboard_has_start_and_stop_buttons() {
        let data: Vec<_> = keyboard()
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(data, vec![START_BUTTON_DATA, STOP_BUTTON_DATA]);
    }

    #[test]
    pub fn commands_parse_in_lowercase() {
        assert!(matches!(
            GlobalCommand::parse("/start", "countdown_bot"),
            Ok(GlobalCommand::Start)
        ));
        assert!(matches!(
            GlobalCommand::parse("/stop", "countdown_bot"),
            Ok(GlobalCommand::Stop)
        ));
        assert!(matches!(
            GlobalCommand::parse("/status", "countdown_bot"),
            Ok(GlobalCommand::Status)
        ));
    }
}
