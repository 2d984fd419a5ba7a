use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, error, info};

use serenity::all::{
    ChannelId, Client as SerenityClient, Context as SerenityContext, CreateMessage,
    EventHandler as SerenityEventHandler, GatewayIntents, GuildId, Http,
    Message as SerenityMessage, MessageId, Permissions, Ready, RoleId, UserId,
};

use crate::config::AuthConfig;
use crate::dispatch::{EventFilterChain, InboundEvent, RouteSenders};

/// Outbound side of the chat platform as seen by the handlers.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Replies to the event's message in its channel.
    async fn reply(&self, event: &InboundEvent, content: &str) -> Result<()>;

    /// Whether the event's author may manage the guild the event came from.
    async fn can_manage_guild(&self, event: &InboundEvent) -> Result<bool>;
}

#[derive(Clone)]
pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }

    pub async fn current_user_id(&self) -> Result<u64> {
        let user = self
            .http
            .get_current_user()
            .await
            .map_err(|err| anyhow!("failed to fetch bot user: {err}"))?;
        info!("authenticated as {} ({})", user.name, user.id);
        Ok(user.id.get())
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn reply(&self, event: &InboundEvent, content: &str) -> Result<()> {
        let channel = ChannelId::new(event.channel_id);
        let builder = CreateMessage::new()
            .content(content)
            .reference_message((channel, MessageId::new(event.message_id)));
        channel.send_message(&*self.http, builder).await?;
        Ok(())
    }

    async fn can_manage_guild(&self, event: &InboundEvent) -> Result<bool> {
        let Some(guild_id) = event.guild_id.map(GuildId::new) else {
            return Ok(false);
        };
        let user_id = UserId::new(event.author_id);

        let guild = guild_id.to_partial_guild(&*self.http).await?;
        if guild.owner_id == user_id {
            return Ok(true);
        }

        let member = guild_id.member(&*self.http, user_id).await?;
        let everyone = guild
            .roles
            .get(&RoleId::new(guild_id.get()))
            .map(|role| role.permissions)
            .unwrap_or_else(Permissions::empty);
        let granted = member
            .roles
            .iter()
            .filter_map(|role_id| guild.roles.get(role_id))
            .map(|role| role.permissions);

        Ok(allows_manage_guild(everyone, granted))
    }
}

fn allows_manage_guild(
    everyone: Permissions,
    roles: impl IntoIterator<Item = Permissions>,
) -> bool {
    let permissions = roles.into_iter().fold(everyone, |acc, role| acc | role);
    permissions.administrator() || permissions.manage_guild()
}

pub fn gateway_intents(auth: &AuthConfig) -> GatewayIntents {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::DIRECT_MESSAGES;
    if auth.use_privileged_intents {
        intents | GatewayIntents::MESSAGE_CONTENT
    } else {
        intents
    }
}

pub fn inbound_event(msg: &SerenityMessage) -> InboundEvent {
    InboundEvent {
        message_id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_is_bot: msg.author.bot,
        guild_id: msg.guild_id.map(GuildId::get),
        content: msg.content.clone(),
        sequence: 0,
    }
}

/// Feeds gateway messages through the filter chain onto the route channels.
struct MazeEventHandler {
    chain: Arc<EventFilterChain>,
    senders: RouteSenders,
}

#[serenity::async_trait]
impl SerenityEventHandler for MazeEventHandler {
    async fn ready(&self, _ctx: SerenityContext, ready: Ready) {
        info!(
            guilds = ready.guilds.len(),
            "discord gateway ready as {} ({})", ready.user.name, ready.user.id
        );
    }

    async fn message(&self, _ctx: SerenityContext, msg: SerenityMessage) {
        match self.chain.dispatch(inbound_event(&msg), &self.senders).await {
            Ok(Some(route)) => debug!(message_id = %msg.id, route = %route, "message queued"),
            Ok(None) => {}
            Err(err) => error!(message_id = %msg.id, "failed to queue message: {err}"),
        }
    }
}

pub async fn build_client(
    auth: &AuthConfig,
    chain: Arc<EventFilterChain>,
    senders: RouteSenders,
) -> Result<SerenityClient> {
    SerenityClient::builder(&auth.bot_token, gateway_intents(auth))
        .event_handler(MazeEventHandler { chain, senders })
        .await
        .map_err(|err| anyhow!("failed to build discord gateway client: {err}"))
}
