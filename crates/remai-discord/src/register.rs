//! Slash-command sync. Commands go to one guild when configured (instant
//! propagation, handy while developing) and globally otherwise.

use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::http::Http;
use serenity::model::application::{Command, CommandOptionType};
use serenity::model::id::GuildId;
use tracing::info;

use remai_router::{CommandSpec, OptionKind, OptionSpec};

use crate::error::DiscordError;

fn option_type(kind: OptionKind) -> CommandOptionType {
    match kind {
        OptionKind::String => CommandOptionType::String,
        OptionKind::Integer => CommandOptionType::Integer,
        OptionKind::Number => CommandOptionType::Number,
        OptionKind::Boolean => CommandOptionType::Boolean,
        OptionKind::Attachment => CommandOptionType::Attachment,
    }
}

fn create_option(spec: &OptionSpec) -> CreateCommandOption {
    let mut option = CreateCommandOption::new(option_type(spec.kind), &spec.name, &spec.description)
        .required(spec.required);
    for choice in &spec.choices {
        option = option.add_string_choice(&choice.name, &choice.value);
    }
    if let Some(min) = spec.min_value {
        option = option.min_number_value(min);
    }
    if let Some(max) = spec.max_value {
        option = option.max_number_value(max);
    }
    option
}

pub fn create_command(spec: &CommandSpec) -> CreateCommand {
    CreateCommand::new(&spec.name)
        .description(&spec.description)
        .dm_permission(spec.dm_permission)
        .set_options(spec.options.iter().map(create_option).collect())
}

/// Replace the registered command set with `specs`. Returns how many
/// commands Discord now knows.
pub async fn register(
    http: &Http,
    guild: Option<GuildId>,
    specs: &[CommandSpec],
) -> Result<usize, DiscordError> {
    let commands: Vec<CreateCommand> = specs.iter().map(create_command).collect();
    let registered = match guild {
        Some(gid) => gid.set_commands(http, commands).await?,
        None => Command::set_global_commands(http, commands).await?,
    };
    info!(
        guild = ?guild.map(|g| g.get()),
        count = registered.len(),
        "registered slash commands"
    );
    Ok(registered.len())
}

/// Remove every command registered by [`register`].
pub async fn clear(http: &Http, guild: Option<GuildId>) -> Result<(), DiscordError> {
    match guild {
        Some(gid) => gid.set_commands(http, Vec::new()).await?,
        None => Command::set_global_commands(http, Vec::new()).await?,
    };
    info!(guild = ?guild.map(|g| g.get()), "removed slash commands");
    Ok(())
}
