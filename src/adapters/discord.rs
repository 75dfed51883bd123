//! Discord gateway and REST adapter
//!
//! Inbound messages from the gateway are handed to the dispatcher; replies go
//! back out through the REST client. serenity reconnects shards on its own,
//! and `run_gateway` restarts the whole client with backoff if it stops.

use async_trait::async_trait;
use serenity::all::{
    ChannelId, Client, ConnectionStage, Context, CreateEmbed, CreateEmbedFooter, CreateMessage,
    EventHandler, GatewayIntents, Http, Member, Message, MessageId, ReactionType, Ready,
    ShardStageUpdateEvent,
};
use serenity::gateway::GatewayError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::transport::{ChatTransport, Embed, InboundMessage, Reply};
use crate::error::{HashBotError, Result};
use crate::services::Dispatcher;

/// Base delay between client restarts
const RECONNECT_DELAY_SECS: u64 = 1;

/// Maximum reconnection delay
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

/// Sends replies through Discord's REST API
#[derive(Clone)]
pub struct DiscordTransport {
    http: Arc<Http>,
}

impl DiscordTransport {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }
}

fn channel(channel_id: u64) -> Result<ChannelId> {
    if channel_id == 0 {
        return Err(HashBotError::Transport("channel id 0 is invalid".to_string()));
    }
    Ok(ChannelId::new(channel_id))
}

fn render_embed(embed: &Embed) -> CreateEmbed {
    let mut out = CreateEmbed::new()
        .colour(embed.color)
        .footer(CreateEmbedFooter::new(embed.footer.clone()));
    if let Some(url) = &embed.thumbnail_url {
        out = out.thumbnail(url.clone());
    }
    for field in &embed.fields {
        out = out.field(field.name.clone(), field.value.clone(), false);
    }
    out
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    async fn send_message(&self, channel_id: u64, reply: &Reply) -> Result<()> {
        let builder = match reply {
            Reply::Text(text) => CreateMessage::new().content(text.clone()),
            Reply::Embed(embed) => CreateMessage::new().embed(render_embed(embed)),
        };
        channel(channel_id)?.send_message(&self.http, builder).await?;
        Ok(())
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, symbol: &str) -> Result<()> {
        if message_id == 0 {
            return Err(HashBotError::Transport("message id 0 is invalid".to_string()));
        }
        channel(channel_id)?
            .create_reaction(
                &self.http,
                MessageId::new(message_id),
                ReactionType::Unicode(symbol.to_string()),
            )
            .await?;
        Ok(())
    }
}

/// Greeting posted when a member joins
#[derive(Debug, Clone)]
pub struct Welcome {
    pub channel_id: u64,
    pub template: String,
}

impl Welcome {
    pub fn render(&self, member_id: u64) -> String {
        self.template.replace("{member}", &format!("<@{member_id}>"))
    }
}

/// Gateway event handler
#[derive(Clone)]
pub struct DiscordHandler {
    dispatcher: Arc<Dispatcher>,
    welcome: Option<Welcome>,
}

impl DiscordHandler {
    pub fn new(dispatcher: Arc<Dispatcher>, welcome: Option<Welcome>) -> Self {
        Self {
            dispatcher,
            welcome,
        }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Connected, logged in as {}-{} and listening for commands",
            ready.user.name, ready.user.id
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let inbound = InboundMessage {
            sender_id: msg.author.id.get(),
            channel_id: msg.channel_id.get(),
            message_id: msg.id.get(),
            text: msg.content,
        };
        let transport = DiscordTransport::new(Arc::clone(&ctx.http));
        self.dispatcher.dispatch(&transport, &inbound).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let Some(welcome) = &self.welcome else {
            return;
        };

        let transport = DiscordTransport::new(Arc::clone(&ctx.http));
        let text = welcome.render(new_member.user.id.get());
        match transport
            .send_message(welcome.channel_id, &Reply::Text(text))
            .await
        {
            Ok(()) => info!("New member joined server, welcome message sent"),
            Err(e) => warn!("Failed to send welcome message: {}", e),
        }
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        match event.new {
            ConnectionStage::Disconnected => {
                warn!("Bot disconnected (shard {}), reconnecting...", event.shard_id.0)
            }
            ConnectionStage::Connected => info!("Shard {} connected", event.shard_id.0),
            stage => debug!("Shard {} stage: {:?}", event.shard_id.0, stage),
        }
    }
}

fn intents(with_members: bool) -> GatewayIntents {
    let base = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    if with_members {
        base | GatewayIntents::GUILD_MEMBERS
    } else {
        base
    }
}

/// Delay before restart attempt `attempt` (1-based), with up to 25% jitter
pub fn reconnect_delay(attempt: u32) -> Duration {
    let base = Duration::from_secs(RECONNECT_DELAY_SECS) * attempt.clamp(1, 10);
    let delay = base.min(Duration::from_secs(MAX_RECONNECT_DELAY_SECS));

    let jitter_range = delay.as_millis() as u64 / 4;
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    delay + Duration::from_millis(seed % jitter_range.max(1))
}

/// Run the gateway until an unrecoverable error.
///
/// Transient disconnects are retried forever; a rejected token is returned
/// as an error.
pub async fn run_gateway(
    token: &str,
    dispatcher: Arc<Dispatcher>,
    welcome: Option<Welcome>,
) -> Result<()> {
    let handler = DiscordHandler::new(dispatcher, welcome);
    let mut attempt: u32 = 0;

    loop {
        let started = Client::builder(token, intents(handler.welcome.is_some()))
            .event_handler(handler.clone())
            .await;

        match started {
            Ok(mut client) => match client.start().await {
                Ok(()) => {
                    info!("Discord connection closed normally");
                    attempt = 0;
                }
                Err(serenity::Error::Gateway(GatewayError::InvalidAuthentication)) => {
                    error!("Discord rejected the bot token");
                    return Err(HashBotError::MissingSecret(
                        "discord.token was rejected".to_string(),
                    ));
                }
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    error!("Discord client error (attempt {}): {}", attempt, e);
                }
            },
            Err(e) => {
                attempt = attempt.saturating_add(1);
                error!("Failed to build Discord client (attempt {}): {}", attempt, e);
            }
        }

        let delay = reconnect_delay(attempt);
        info!("Reconnecting to Discord in {:?} (attempt {})", delay, attempt.saturating_add(1));
        tokio::time::sleep(delay).await;
    }
}
