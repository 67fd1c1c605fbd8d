use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use crate::joke::JokeSource;
use crate::platform::{ChannelInfo, ChatTransport, MessageEvent, SessionEvent, UserInfo};
use crate::store::RunStore;

const TRIGGER_PHRASE: &str = "chuck norris";

const APOLOGY_MESSAGE: &str =
    "I wanted to tell you a joke, but the joke archive is not answering. Try me again in a bit.";

fn welcome_message(name: &str) -> String {
    format!(
        "Hi guys, roundhouse-kick anyone? \n I can tell jokes, but very honest ones. \
         Just say 'Chuck Norris' or {} to invoke me!",
        name
    )
}

/// Workspace snapshot captured from the session `Started` event.
#[derive(Default)]
struct SessionSnapshot {
    me: Option<UserInfo>,
    channels: Vec<ChannelInfo>,
}

/// The bot orchestrator.
///
/// Composes the run-record store, the joke source and the chat transport;
/// consumes session events and replies with jokes to messages that pass
/// the filter chain.
pub struct Bot {
    name: String,
    store: RunStore,
    jokes: Arc<dyn JokeSource>,
    transport: Arc<dyn ChatTransport>,
    snapshot: RwLock<SessionSnapshot>,
}

impl Bot {
    pub fn new(
        name: String,
        store: RunStore,
        jokes: Arc<dyn JokeSource>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            name,
            store,
            jokes,
            transport,
            snapshot: RwLock::new(SessionSnapshot::default()),
        }
    }

    /// Session start: capture the workspace snapshot, resolve the bot's own
    /// identity, then run the first-run check against the store.
    pub async fn on_start(&self, channels: Vec<ChannelInfo>, users: Vec<UserInfo>) -> Result<()> {
        let me = self.resolve_self(&users);
        {
            let mut snapshot = self.snapshot.write().await;
            snapshot.me = me;
            snapshot.channels = channels;
        }
        self.first_run_check().await
    }

    /// The element of the user list whose name matches the configured bot
    /// name. `None` when the bot cannot see itself; replies then stay off
    /// for the whole session, otherwise the bot could answer its own
    /// messages in a loop.
    fn resolve_self(&self, users: &[UserInfo]) -> Option<UserInfo> {
        let me = users.iter().find(|user| user.name == self.name).cloned();
        match &me {
            Some(user) => info!("Resolved own identity: {} ({})", user.name, user.id),
            None => warn!(
                "No user named '{}' in the workspace; replies are disabled for this session",
                self.name
            ),
        }
        me
    }

    /// A missing record means this bot name has never run before: greet the
    /// workspace once. Either way, stamp `last_run` with the current time.
    async fn first_run_check(&self) -> Result<()> {
        let existing = self
            .store
            .find_by_name(&self.name)
            .await
            .context("First-run lookup failed")?;

        if existing.is_none() {
            self.send_welcome().await;
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.store
            .upsert_last_run(&self.name, &now)
            .await
            .context("Failed to record last run")?;
        Ok(())
    }

    /// Post the welcome message to the chronologically last channel in the
    /// list. Welcome failures are contained so the run record still gets
    /// created.
    async fn send_welcome(&self) {
        let channel_name = {
            let snapshot = self.snapshot.read().await;
            match snapshot.channels.last() {
                Some(channel) => channel.name.clone(),
                None => {
                    warn!("First run, but no channel is visible; skipping the welcome message");
                    return;
                }
            }
        };

        info!("First run: greeting #{}", channel_name);
        if let Err(e) = self
            .transport
            .post_message(&channel_name, &welcome_message(&self.name))
            .await
        {
            error!("Failed to post the welcome message: {:#}", e);
        }
    }

    /// Handle one inbound message end to end. Runs as its own task per
    /// message; every outcome is handled here and nothing propagates.
    pub async fn on_message(&self, message: MessageEvent) {
        let Some(channel_name) = self.reply_target(&message).await else {
            return;
        };

        let reply = match self.jokes.random_joke().await {
            Ok(joke) => joke,
            Err(e) => {
                warn!("Joke fetch failed: {:#}", e);
                APOLOGY_MESSAGE.to_string()
            }
        };

        if let Err(e) = self.transport.post_message(&channel_name, &reply).await {
            error!("Failed to post reply to #{}: {:#}", channel_name, e);
        }
    }

    /// The reply filter chain. Returns the name of the channel to reply in
    /// only when every condition holds: the message carries text, was said
    /// in a channel (not a DM or group), did not come from the bot itself,
    /// and mentions a trigger phrase.
    async fn reply_target(&self, message: &MessageEvent) -> Option<String> {
        let text = message.text.as_deref().filter(|text| !text.is_empty())?;
        let channel_id = message.channel.as_deref()?;
        if !channel_id.starts_with('C') {
            return None;
        }
        if !self.mentions_trigger(text) {
            return None;
        }

        let snapshot = self.snapshot.read().await;
        let me = snapshot.me.as_ref()?;
        if message.user.as_deref() == Some(me.id.as_str()) {
            return None;
        }
        let channel = snapshot
            .channels
            .iter()
            .find(|channel| channel.id == channel_id)?;
        Some(channel.name.clone())
    }

    /// Case-insensitive on both sides: the fixed phrase or the configured
    /// bot name anywhere in the text.
    fn mentions_trigger(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        text.contains(TRIGGER_PHRASE) || text.contains(&self.name.to_lowercase())
    }
}

/// Drive the bot from a session event stream.
///
/// `Started` is handled inline since it mutates the snapshot; each message
/// is dispatched as its own task, so a slow joke fetch never blocks later
/// messages (replies may complete out of arrival order).
pub async fn run(bot: Arc<Bot>, mut events: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Started { channels, users } => {
                if let Err(e) = bot.on_start(channels, users).await {
                    error!("Session start handling failed: {:#}", e);
                }
            }
            SessionEvent::Message(message) => {
                let bot = bot.clone();
                tokio::spawn(async move {
                    bot.on_message(message).await;
                });
            }
        }
    }
    info!("Session event stream closed, shutting down");
}
