use std::error::Error;
use std::sync::Arc;

use log::{info, warn};
use rand::thread_rng;
use teloxide::{
    dispatching::{dialogue::ErasedStorage, UpdateHandler},
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, ParseMode},
    utils::command::BotCommands,
    utils::html::escape,
};

use crate::catalog::Catalog;
use crate::coach::Coach;
use crate::flow::quiz::QuizPhase;
use crate::flow::reward::RewardModal;
use crate::flow::sequencer::{BackOutcome, Stage, Step};
use crate::flow::{DropFlow, FlowView, NoticeKind, Notifier, REWARD_COMPLETION_BONUS};
use crate::session::{Delays, SessionHandle, SessionHooks, SessionRegistry};

pub type DropDialogue = Dialogue<State, ErasedStorage<State>>;
pub type DialogueStorage = Arc<ErasedStorage<State>>;
pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveName,
    BrowseDrops {
        name: String,
    },
    InDrop {
        name: String,
        drop_id: String,
    },
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show this text.")]
    Help,
    #[command(description = "start over.")]
    Start,
    #[command(description = "leave the current drop and browse all drops.")]
    Drops,
}

/// Shared by every handler.
pub struct App {
    pub catalog: Arc<Catalog>,
    pub coach: Coach,
    pub sessions: SessionRegistry,
    pub delays: Delays,
}

const START_BUTTON: &str = "▶️ Start";
const WATCHED_BUTTON: &str = "✅ I watched it";
const SHOWED_BUTTON: &str = "📸 I showed it";
const NEXT_BUTTON: &str = "Next ➡️";
const BACK_BUTTON: &str = "⬅️ Back";
const REVIEW_BUTTON: &str = "🔁 Review missed questions";
const CLAIM_BUTTON: &str = "🎁 Claim reward";
const SHARE_BUTTON: &str = "📣 Share";
const CLOSE_BUTTON: &str = "👌 Close";
const BROWSE_BUTTON: &str = "🏠 Browse drops";

pub fn schema() -> UpdateHandler<Box<dyn Error + Send + Sync + 'static>> {
    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command),
        )
        .branch(dptree::case![State::Start].endpoint(start))
        .branch(dptree::case![State::ReceiveName].endpoint(receive_name))
        .branch(dptree::case![State::BrowseDrops { name }].endpoint(browse_drops))
        .branch(dptree::case![State::InDrop { name, drop_id }].endpoint(in_drop))
}

async fn command(
    bot: Bot,
    dialogue: DropDialogue,
    app: Arc<App>,
    cmd: Command,
    msg: Message,
) -> HandlerResult {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Start => {
            app.sessions.close(msg.chat.id.0);
            start(bot, dialogue, msg).await?;
        }
        Command::Drops => {
            let name = match dialogue.get().await? {
                Some(State::BrowseDrops { name }) | Some(State::InDrop { name, .. }) => name,
                _ => return start(bot, dialogue, msg).await,
            };
            app.sessions.close(msg.chat.id.0);
            dialogue.update(State::BrowseDrops { name }).await?;
            show_drops(&bot, msg.chat.id, &app.catalog).await?;
        }
    }
    Ok(())
}

const GREETING_TEXT: &str = "Hey! I'm the G3MS Drops bot 💎 Drops are quick challenges: watch, show what you made, ace the quiz and grab a reward. What's your name?";
async fn start(bot: Bot, dialogue: DropDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;

    dialogue.update(State::ReceiveName).await?;
    Ok(())
}

async fn receive_name(
    bot: Bot,
    dialogue: DropDialogue,
    app: Arc<App>,
    msg: Message,
) -> HandlerResult {
    let Some(name) = msg.text().map(str::trim).filter(|n| !n.is_empty()) else {
        bot.send_message(msg.chat.id, "Please type your name (as text)")
            .await?;
        return Ok(());
    };

    bot.send_message(msg.chat.id, format!("Nice to meet you, {}!", name))
        .await?;
    dialogue
        .update(State::BrowseDrops {
            name: name.to_string(),
        })
        .await?;
    show_drops(&bot, msg.chat.id, &app.catalog).await?;
    Ok(())
}

async fn browse_drops(
    bot: Bot,
    dialogue: DropDialogue,
    name: String,
    app: Arc<App>,
    storage: DialogueStorage,
    msg: Message,
) -> HandlerResult {
    let Some(drop_info) = msg.text().and_then(|t| app.catalog.find_by_title(t)) else {
        bot.send_message(msg.chat.id, "Please pick one of the drops below")
            .await?;
        show_drops(&bot, msg.chat.id, &app.catalog).await?;
        return Ok(());
    };

    let Some(offer) = app.catalog.draw_reward(&mut thread_rng()) else {
        warn!("Reward catalog is empty, cannot open drop '{}'", drop_info.id);
        bot.send_message(msg.chat.id, "Rewards are restocking, please try again later!")
            .await?;
        return Ok(());
    };

    let chat_id = msg.chat.id;
    let notifier = ChatNotifier {
        bot: bot.clone(),
        chat_id,
    };
    let hooks = ChatHooks {
        bot: bot.clone(),
        chat_id,
        name: name.clone(),
        catalog: app.catalog.clone(),
        sessions: app.sessions.clone(),
        storage,
    };
    let flow = DropFlow::new(Arc::new(drop_info.clone()), offer, Box::new(notifier));
    let session = SessionHandle::open(flow, Arc::new(hooks), app.delays);
    app.sessions.open(chat_id.0, session.clone());
    info!("Chat {} opened drop '{}'", chat_id.0, drop_info.id);

    dialogue
        .update(State::InDrop {
            name,
            drop_id: drop_info.id.clone(),
        })
        .await?;
    render(&bot, chat_id, &session.view()).await?;
    Ok(())
}

async fn in_drop(
    bot: Bot,
    dialogue: DropDialogue,
    (name, _drop_id): (String, String),
    app: Arc<App>,
    msg: Message,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(session) = app.sessions.get(chat_id.0) else {
        // The bot restarted or the session ended; flow state is never persisted
        bot.send_message(chat_id, "That drop has ended. Pick a drop to keep going!")
            .await?;
        dialogue.update(State::BrowseDrops { name }).await?;
        show_drops(&bot, chat_id, &app.catalog).await?;
        return Ok(());
    };
    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "Please use the buttons below").await?;
        return Ok(());
    };

    match text {
        START_BUTTON => {
            session.start();
        }
        WATCHED_BUTTON => {
            session.complete_watch();
        }
        SHOWED_BUTTON => {
            session.complete_show();
        }
        NEXT_BUTTON => {
            session.forward();
        }
        BACK_BUTTON => {
            if session.go_back() == Some(BackOutcome::Exited) {
                return Ok(());
            }
        }
        BROWSE_BUTTON => {
            if session.exit() {
                return Ok(());
            }
        }
        REVIEW_BUTTON => {
            if session.review_missed().is_some() {
                let view = session.view();
                let missed = view
                    .quiz
                    .missed
                    .iter()
                    .filter_map(|&i| view.drop_info.questions.get(i).cloned())
                    .collect::<Vec<_>>();
                let review = app
                    .coach
                    .explain_missed(&view.drop_info.title, &missed)
                    .await;
                bot.send_message(chat_id, review).await?;
            }
        }
        CLAIM_BUTTON => {
            session.claim_reward();
        }
        SHARE_BUTTON => {
            if session.share().is_some() {
                let view = session.view();
                bot.send_message(
                    chat_id,
                    format!(
                        "Forward this to a friend:\n\nI just earned {} tokens on the \"{}\" drop at G3MS! 💎",
                        view.tokens, view.drop_info.title
                    ),
                )
                .await?;
            }
        }
        CLOSE_BUTTON => {
            if session.close_reward_modal() {
                // The completion hook takes it from here
                return Ok(());
            }
        }
        answer => {
            if session.submit_option_text(answer).is_some() {
                // Feedback is on its way; the next question follows the delay
                return Ok(());
            }
            bot.send_message(chat_id, "Please use the buttons below").await?;
        }
    }

    render(&bot, chat_id, &session.view()).await?;
    Ok(())
}

async fn show_drops(bot: &Bot, chat_id: ChatId, catalog: &Catalog) -> HandlerResult {
    let mut text = String::from("Here are today's drops:\n");
    for drop_info in &catalog.drops {
        text.push_str(&format!(
            "\n💎 <b>{}</b> · {}",
            escape(&drop_info.title),
            escape(&drop_info.subject)
        ));
    }
    let rows = catalog
        .drops
        .iter()
        .map(|d| vec![KeyboardButton::new(d.title.clone())])
        .collect::<Vec<_>>();

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(KeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

async fn render(bot: &Bot, chat_id: ChatId, view: &FlowView) -> HandlerResult {
    let (text, keyboard) = screen(view);
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

fn keyboard(rows: Vec<Vec<&str>>) -> KeyboardMarkup {
    KeyboardMarkup::new(
        rows.into_iter()
            .filter(|row| !row.is_empty())
            .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
    )
}

/// What the learner sees for a given flow state.
pub fn screen(view: &FlowView) -> (String, KeyboardMarkup) {
    let drop_info = &view.drop_info;
    let done = |step: Step| view.completed.contains(&step);
    let header = |step: Step| {
        format!(
            "<b>Step {}/4 · {}</b> — {}\n💎 {} tokens\n\n",
            step.number(),
            step,
            escape(&drop_info.title),
            view.tokens
        )
    };

    match view.stage {
        Stage::NotStarted => {
            let mut text = format!(
                "💎 <b>{}</b>\n{}",
                escape(&drop_info.title),
                escape(&drop_info.subject)
            );
            if let Some(brand) = &drop_info.brand {
                text.push_str(&format!(" · presented by {}", escape(brand)));
            }
            text.push_str("\n\nWatch → Show → Quiz → Reward. Finish every step to unlock a reward!");
            (text, keyboard(vec![vec![START_BUTTON], vec![BROWSE_BUTTON]]))
        }
        Stage::Active(Step::Watch) => {
            let text = format!(
                "{}Watch the video, then come back here:\n{}",
                header(Step::Watch),
                escape(&drop_info.video_url)
            );
            let action = if done(Step::Watch) { NEXT_BUTTON } else { WATCHED_BUTTON };
            (text, keyboard(vec![vec![action], vec![BACK_BUTTON, BROWSE_BUTTON]]))
        }
        Stage::Active(Step::Show) => {
            let text = format!("{}{}", header(Step::Show), escape(&drop_info.show_prompt));
            let action = if done(Step::Show) { NEXT_BUTTON } else { SHOWED_BUTTON };
            (text, keyboard(vec![vec![action], vec![BACK_BUTTON, BROWSE_BUTTON]]))
        }
        Stage::Active(Step::Quiz) => quiz_screen(view, header(Step::Quiz)),
        Stage::Active(Step::Reward) => {
            let mut text = header(Step::Reward);
            if let Some(score) = view.quiz.score() {
                text.push_str(&format!(
                    "Quiz: {}/{} correct ({}%)\n",
                    score.correct, score.total, score.percentage
                ));
            }
            text.push_str(&format!(
                "🎉 Every step done! Claim your reward for +{} more tokens.",
                REWARD_COMPLETION_BONUS
            ));
            let review = if view.quiz.missed.is_empty() { vec![] } else { vec![REVIEW_BUTTON] };
            (
                text,
                keyboard(vec![
                    vec![CLAIM_BUTTON],
                    vec![SHARE_BUTTON],
                    review,
                    vec![BACK_BUTTON],
                ]),
            )
        }
        Stage::Claimed => {
            let offer = &view.offer;
            if view.modal == RewardModal::Shown {
                let mut text = format!(
                    "🎁 <b>{}</b>\n\n{}\n",
                    escape(&offer.title),
                    escape(&offer.message)
                );
                if let Some(amount) = &offer.amount {
                    text.push_str(&format!("\nAmount: {}", escape(amount)));
                }
                if let Some(contact) = &offer.contact {
                    text.push_str(&format!("\nContact: {}", escape(contact)));
                }
                text.push_str(&format!("\n{}", escape(&offer.image)));
                (text, keyboard(vec![vec![CLOSE_BUTTON], vec![SHARE_BUTTON]]))
            } else {
                (
                    format!("💎 {} tokens. Wrapping up your drop…", view.tokens),
                    keyboard(vec![vec![SHARE_BUTTON]]),
                )
            }
        }
    }
}

fn quiz_screen(view: &FlowView, mut text: String) -> (String, KeyboardMarkup) {
    let quiz = &view.quiz;
    match (quiz.phase, &quiz.question) {
        (QuizPhase::Finished(score), _) => {
            text.push_str(&format!(
                "Quiz done: {}/{} correct ({}%), +{} bonus tokens",
                score.correct, score.total, score.percentage, score.bonus_tokens
            ));
            let review = if quiz.missed.is_empty() { vec![] } else { vec![REVIEW_BUTTON] };
            (text, keyboard(vec![vec![NEXT_BUTTON], review, vec![BACK_BUTTON]]))
        }
        (QuizPhase::ShowingFeedback, _) => {
            text.push_str("Checking your answer…");
            (text, keyboard(vec![vec![BACK_BUTTON]]))
        }
        (QuizPhase::Answering, Some(question)) => {
            text.push_str(&format!(
                "Question {}/{}\n{}",
                quiz.index + 1,
                quiz.total,
                escape(&question.prompt)
            ));
            let mut rows = question
                .options
                .iter()
                .map(|o| vec![o.as_str()])
                .collect::<Vec<_>>();
            rows.push(vec![BACK_BUTTON]);
            (text, keyboard(rows))
        }
        (QuizPhase::Answering, None) => (text, keyboard(vec![vec![BACK_BUTTON]])),
    }
}

fn summary(view: &FlowView) -> String {
    let mut text = format!(
        "🏁 <b>{}</b> complete!\n\n💎 Tokens earned: {}",
        escape(&view.drop_info.title),
        view.tokens
    );
    if let Some(score) = view.quiz.score() {
        text.push_str(&format!(
            "\n🧠 Quiz: {}/{} ({}%)",
            score.correct, score.total, score.percentage
        ));
    }
    text.push_str(&format!("\n🎁 Reward: {}", escape(&view.offer.title)));
    text
}

/// Sends flow notices as chat messages without waiting for Telegram.
struct ChatNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl Notifier for ChatNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        let icon = match kind {
            NoticeKind::Success => "✅",
            NoticeKind::Error => "⚠️",
        };
        let bot = self.bot.clone();
        let chat_id = self.chat_id;
        let text = format!("{icon} {message}");
        tokio::spawn(async move {
            if let Err(err) = bot.send_message(chat_id, text).await {
                warn!("Failed to send notice to chat {}: {}", chat_id.0, err);
            }
        });
    }
}

struct ChatHooks {
    bot: Bot,
    chat_id: ChatId,
    name: String,
    catalog: Arc<Catalog>,
    sessions: SessionRegistry,
    storage: DialogueStorage,
}

impl ChatHooks {
    /// Hands the chat back to the drop list once the session is gone.
    fn back_to_drops(&self, farewell: String) {
        let bot = self.bot.clone();
        let chat_id = self.chat_id;
        let name = self.name.clone();
        let catalog = self.catalog.clone();
        let sessions = self.sessions.clone();
        let storage = self.storage.clone();

        tokio::spawn(async move {
            sessions.remove_closed(chat_id.0);
            let dialogue = DropDialogue::new(storage, chat_id);
            if let Err(err) = return_to_drops(&bot, dialogue, name, &catalog, farewell).await {
                warn!("Failed to return chat {} to the drop list: {}", chat_id.0, err);
            }
        });
    }
}

async fn return_to_drops(
    bot: &Bot,
    dialogue: DropDialogue,
    name: String,
    catalog: &Catalog,
    farewell: String,
) -> HandlerResult {
    bot.send_message(dialogue.chat_id(), farewell)
        .parse_mode(ParseMode::Html)
        .await?;
    dialogue.update(State::BrowseDrops { name }).await?;
    show_drops(bot, dialogue.chat_id(), catalog).await
}

impl SessionHooks for ChatHooks {
    fn question_ready(&self, view: FlowView) {
        let bot = self.bot.clone();
        let chat_id = self.chat_id;
        tokio::spawn(async move {
            if let Err(err) = render(&bot, chat_id, &view).await {
                warn!("Failed to send the next question to chat {}: {}", chat_id.0, err);
            }
        });
    }

    fn completed(&self, view: FlowView) {
        self.back_to_drops(summary(&view));
    }

    fn exited(&self, view: FlowView) {
        info!("Chat {} left drop '{}'", self.chat_id.0, view.drop_info.id);
        self.back_to_drops(format!(
            "No worries, {}! Your {} tokens from this drop are safe here while you look around.",
            escape(&self.name),
            view.tokens
        ));
    }
}
