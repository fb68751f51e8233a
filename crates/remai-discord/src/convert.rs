//! Conversions between serenity's model and the transport-neutral one.

use serenity::builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};
use serenity::model::application::{CommandDataOptionValue, CommandInteraction};
use serenity::model::channel::{
    AutoArchiveDuration, Channel, ChannelType, Embed as SerenityEmbed, GuildChannel, Message,
    MessageType,
};
use serenity::model::id::{
    ChannelId as SerenityChannelId, GuildId as SerenityGuildId, MessageId as SerenityMessageId,
};
use serenity::model::user::User;

use remai_core::types::{
    ChannelId, ChannelInfo, ChannelKind, ChatMessage, CommandOption, Embed, EmbedAuthor,
    EmbedField, EmbedFooter, Interaction, MessageId, MessageKind, OptionValue, UserInfo,
};

use crate::error::DiscordError;

fn snowflake(what: &'static str, id: &str) -> Result<u64, DiscordError> {
    id.parse::<u64>()
        .ok()
        .filter(|v| *v != 0)
        .ok_or_else(|| DiscordError::InvalidId {
            what,
            id: id.to_string(),
        })
}

pub fn channel_id(id: &ChannelId) -> Result<SerenityChannelId, DiscordError> {
    snowflake("channel", id.as_str()).map(SerenityChannelId::new)
}

pub fn message_id(id: &MessageId) -> Result<SerenityMessageId, DiscordError> {
    snowflake("message", id.as_str()).map(SerenityMessageId::new)
}

pub fn guild_id(id: &str) -> Result<SerenityGuildId, DiscordError> {
    snowflake("guild", id).map(SerenityGuildId::new)
}

pub fn message_kind(kind: MessageType) -> MessageKind {
    match kind {
        MessageType::Regular => MessageKind::Regular,
        MessageType::InlineReply => MessageKind::Reply,
        MessageType::ThreadStarterMessage => MessageKind::ThreadStarter,
        _ => MessageKind::Other,
    }
}

pub fn user_info(user: &User) -> UserInfo {
    UserInfo {
        id: user.id.to_string().into(),
        name: user.name.clone(),
        avatar_url: user.avatar_url(),
        bot: user.bot,
    }
}

pub fn embed(embed: &SerenityEmbed) -> Embed {
    Embed {
        title: embed.title.clone(),
        description: embed.description.clone(),
        url: embed.url.clone(),
        image_url: embed.image.as_ref().map(|i| i.url.clone()),
        color: embed.colour.map(|c| c.0),
        author: embed.author.as_ref().map(|a| EmbedAuthor {
            name: a.name.clone(),
            icon_url: a.icon_url.clone(),
        }),
        fields: embed
            .fields
            .iter()
            .map(|f| EmbedField {
                name: f.name.clone(),
                value: f.value.clone(),
                inline: f.inline,
            })
            .collect(),
        footer: embed.footer.as_ref().map(|f| EmbedFooter {
            text: f.text.clone(),
            icon_url: f.icon_url.clone(),
        }),
    }
}

pub fn chat_message(msg: &Message) -> ChatMessage {
    ChatMessage {
        id: msg.id.to_string().into(),
        channel_id: msg.channel_id.to_string().into(),
        guild_id: msg.guild_id.map(|g| g.to_string().into()),
        author: user_info(&msg.author),
        kind: message_kind(msg.kind),
        content: msg.content.clone(),
        embeds: msg.embeds.iter().map(embed).collect(),
        referenced: msg
            .referenced_message
            .as_deref()
            .map(|r| Box::new(chat_message(r))),
    }
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread => {
            ChannelKind::Thread
        }
        ChannelType::Text | ChannelType::News => ChannelKind::Text,
        _ => ChannelKind::Other,
    }
}

pub fn guild_channel_info(gc: &GuildChannel) -> ChannelInfo {
    let (locked, archived) = gc
        .thread_metadata
        .as_ref()
        .map(|m| (m.locked, m.archived))
        .unwrap_or((false, false));
    ChannelInfo {
        id: gc.id.to_string().into(),
        name: gc.name.clone(),
        kind: channel_kind(gc.kind),
        parent_id: gc.parent_id.map(|p| p.to_string().into()),
        locked,
        archived,
    }
}

pub fn channel_info(channel: &Channel) -> ChannelInfo {
    match channel {
        Channel::Guild(gc) => guild_channel_info(gc),
        other => ChannelInfo {
            id: other.id().to_string().into(),
            name: String::new(),
            kind: ChannelKind::Other,
            parent_id: None,
            locked: false,
            archived: false,
        },
    }
}

pub fn create_embed(embed: &Embed) -> CreateEmbed {
    let mut out = CreateEmbed::new();
    if let Some(title) = &embed.title {
        out = out.title(title);
    }
    if let Some(description) = &embed.description {
        out = out.description(description);
    }
    if let Some(url) = &embed.url {
        out = out.url(url);
    }
    if let Some(image) = &embed.image_url {
        out = out.image(image);
    }
    if let Some(color) = embed.color {
        out = out.colour(color);
    }
    if let Some(author) = &embed.author {
        let mut a = CreateEmbedAuthor::new(&author.name);
        if let Some(icon) = &author.icon_url {
            a = a.icon_url(icon);
        }
        out = out.author(a);
    }
    for field in &embed.fields {
        out = out.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &embed.footer {
        let mut f = CreateEmbedFooter::new(&footer.text);
        if let Some(icon) = &footer.icon_url {
            f = f.icon_url(icon);
        }
        out = out.footer(f);
    }
    out
}

/// Threads only accept a fixed set of auto-archive durations; anything else
/// falls back to one hour.
pub fn auto_archive(minutes: u16) -> AutoArchiveDuration {
    match minutes {
        1440 => AutoArchiveDuration::OneDay,
        4320 => AutoArchiveDuration::ThreeDays,
        10080 => AutoArchiveDuration::OneWeek,
        _ => AutoArchiveDuration::OneHour,
    }
}

/// Flatten a slash-command invocation. Sub-commands and option kinds the
/// router does not know are dropped.
pub fn interaction(command: &CommandInteraction) -> Interaction {
    let options = command
        .data
        .options
        .iter()
        .filter_map(|opt| {
            let value = match &opt.value {
                CommandDataOptionValue::String(s) => OptionValue::String(s.clone()),
                CommandDataOptionValue::Integer(i) => OptionValue::Integer(*i),
                CommandDataOptionValue::Number(n) => OptionValue::Number(*n),
                CommandDataOptionValue::Boolean(b) => OptionValue::Boolean(*b),
                CommandDataOptionValue::Attachment(id) => {
                    let attachment = command.data.resolved.attachments.get(id)?;
                    OptionValue::Attachment {
                        id: id.to_string(),
                        url: attachment.url.clone(),
                    }
                }
                _ => return None,
            };
            Some(CommandOption {
                name: opt.name.clone(),
                value,
            })
        })
        .collect();

    Interaction {
        id: command.id.to_string().into(),
        command: command.data.name.clone(),
        guild_id: command.guild_id.map(|g| g.to_string().into()),
        channel_id: command.channel_id.to_string().into(),
        user: user_info(&command.user),
        options,
    }
}
