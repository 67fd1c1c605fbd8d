use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use slack_morphism::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::platform::{ChannelInfo, ChatTransport, MessageEvent, SessionEvent, UserInfo};

/// State shared with socket mode callbacks via `SlackClientEventsUserState`.
struct SessionState {
    events_tx: mpsc::Sender<SessionEvent>,
}

/// Slack messaging session: Web API calls plus a Socket Mode event stream.
///
/// Reconnection and heartbeats belong to slack-morphism; this type only
/// translates between the Slack wire shapes and the session contract in
/// `platform::mod`.
pub struct SlackSession {
    /// Shared HTTP client, constructed once and reused across all API calls.
    client: Arc<SlackHyperClient>,
    /// Pre-built API token wrapping the bot token.
    token: SlackApiToken,
    /// App-level token consumed by the Socket Mode listener.
    app_token: SlackApiToken,
}

impl SlackSession {
    pub fn new(bot_token: &str, app_token: &str) -> Result<Self> {
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("Failed to create Slack HTTP connector")?,
        ));
        Ok(Self {
            client,
            token: SlackApiToken::new(SlackApiTokenValue(bot_token.to_string())),
            app_token: SlackApiToken::new(SlackApiTokenValue(app_token.to_string())),
        })
    }

    /// Open a session against the cached client using the bot token.
    fn session(&self) -> SlackClientSession<'_, SlackClientHyperHttpsConnector> {
        self.client.open_session(&self.token)
    }

    /// Fetch the channel and user lists handed to the orchestrator at start.
    async fn workspace_snapshot(&self) -> Result<(Vec<ChannelInfo>, Vec<UserInfo>)> {
        let session = self.session();

        let channels_resp = session
            .conversations_list(&SlackApiConversationsListRequest::new())
            .await
            .context("Failed to list Slack conversations")?;
        let channels = channels_resp
            .channels
            .into_iter()
            .filter_map(|channel| {
                // Unnamed conversations (e.g. DMs) are of no use to the bot
                let name = channel.name?;
                Some(ChannelInfo {
                    id: channel.id.0,
                    name,
                })
            })
            .collect();

        let users_resp = session
            .users_list(&SlackApiUsersListRequest::new())
            .await
            .context("Failed to list Slack users")?;
        let users = users_resp
            .members
            .into_iter()
            .filter_map(|user| {
                let name = user.name?;
                Some(UserInfo {
                    id: user.id.0,
                    name,
                })
            })
            .collect();

        Ok((channels, users))
    }

    /// Connect and drive the session: emit `Started` once the workspace
    /// snapshot is loaded, then forward inbound chat messages until the
    /// connection ends.
    pub async fn run(&self, events_tx: mpsc::Sender<SessionEvent>) -> Result<()> {
        let (channels, users) = self.workspace_snapshot().await?;
        info!(
            "Connected to Slack: {} channels, {} users visible",
            channels.len(),
            users.len()
        );
        events_tx
            .send(SessionEvent::Started { channels, users })
            .await
            .context("Event consumer went away before session start")?;

        let state = Arc::new(SessionState { events_tx });

        // The socket mode listener owns a persistent WebSocket connection and
        // needs its own client; the shared one stays dedicated to REST calls.
        let listener_client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new()
                .context("Failed to create Slack socket mode connector")?,
        ));

        let environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(listener_client)
                .with_error_handler(socket_error_handler)
                .with_user_state(state),
        );

        let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(on_push_event);

        let listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            environment,
            callbacks,
        );

        listener
            .listen_for(&self.app_token)
            .await
            .context("Failed to start Slack socket mode listener")?;

        info!("Slack socket mode connected");
        let exit_code = listener.serve().await;
        info!("Slack socket mode listener stopped (exit code {exit_code})");
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for SlackSession {
    async fn post_message(&self, channel_name: &str, text: &str) -> Result<()> {
        // chat.postMessage accepts a channel name in its channel field; a
        // bot token always posts as the bot identity.
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel_name.to_string()),
            SlackMessageContent::new().with_text(text.to_string()),
        );
        self.session()
            .chat_post_message(&request)
            .await
            .context("Failed to post Slack message")?;
        Ok(())
    }
}

/// Forward chat messages into the session event stream.
async fn on_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let SlackEventCallbackBody::Message(message) = event.event else {
        return Ok(());
    };

    // Edits, deletes, joins and other subtypes are not chat messages
    if message.subtype.is_some() {
        return Ok(());
    }

    let incoming = MessageEvent {
        channel: message.origin.channel.map(|c| c.0),
        user: message.sender.user.map(|u| u.0),
        text: message.content.and_then(|c| c.text),
    };

    let state_guard = states.read().await;
    let Some(state) = state_guard.get_user_state::<Arc<SessionState>>() else {
        warn!("Slack push event arrived without session state");
        return Ok(());
    };
    if let Err(e) = state.events_tx.send(SessionEvent::Message(incoming)).await {
        warn!("Failed to forward Slack message event: {}", e);
    }

    Ok(())
}

fn socket_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    warn!("Slack socket mode error: {}", err);
    HttpStatusCode::OK
}
