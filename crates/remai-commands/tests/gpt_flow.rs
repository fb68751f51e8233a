//! End-to-end runs of the `gpt`, `image` and `info` commands through the
//! router, over an in-memory transport and a scripted completion provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use remai_agent::{
    CompletionProvider, CompletionRequest, CompletionResponse, GeneratedImage, ImageRequest,
    ModerationVerdict, ProviderError, Usage,
};
use remai_commands::middleware::FLAGGED_PROMPT;
use remai_commands::split::EMPTY_REPLY;
use remai_commands::{gpt, image, info, GptState};
use remai_conversation::{ConversationEntry, HistorySource, TokenAccountant};
use remai_core::config::{MessageDispatch, GPT_3_5_TURBO};
use remai_core::types::*;
use remai_core::{RemaiConfig, TransportError};
use remai_router::{Router, Transport};

const BOT: &str = "bot";
const CHANNEL: &str = "c1";
const THREAD: &str = "t1";

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Sent(ChannelId, OutgoingMessage),
    Edited(ChannelId, MessageId, MessageEdit),
    Locked(ChannelId, bool),
    Renamed(ChannelId, String),
    ThreadStarted(ChannelId, String),
    ReactionAdded(MessageId, String),
    ReactionRemoved(MessageId, String),
    Typing(ChannelId),
    Deferred,
    Responded(OutgoingMessage),
    Followup(OutgoingMessage),
}

#[derive(Default)]
struct FakeDiscord {
    channels: Mutex<HashMap<ChannelId, ChannelInfo>>,
    /// Oldest first.
    history: Mutex<HashMap<ChannelId, Vec<ChatMessage>>>,
    events: Mutex<Vec<Event>>,
    history_fetches: AtomicUsize,
    channel_lookups: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeDiscord {
    fn new() -> Self {
        let fake = Self::default();
        fake.add_channel(CHANNEL, ChannelKind::Text, None, false);
        fake
    }

    fn add_channel(&self, id: &str, kind: ChannelKind, parent: Option<&str>, locked: bool) {
        self.channels.lock().unwrap().insert(
            id.into(),
            ChannelInfo {
                id: id.into(),
                name: id.to_string(),
                kind,
                parent_id: parent.map(ChannelId::from),
                locked,
                archived: false,
            },
        );
    }

    fn add_thread(&self, id: &str) {
        self.add_channel(id, ChannelKind::Thread, Some(CHANNEL), false);
    }

    fn set_history(&self, channel: &str, oldest_first: Vec<ChatMessage>) {
        self.history
            .lock()
            .unwrap()
            .insert(channel.into(), oldest_first);
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn fresh_id(&self) -> MessageId {
        MessageId::new(format!("sent-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn fetches(&self) -> usize {
        self.history_fetches.load(Ordering::SeqCst)
    }

    fn lookups(&self) -> usize {
        self.channel_lookups.load(Ordering::SeqCst)
    }

    fn locks(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Locked(_, locked) => Some(locked),
                _ => None,
            })
            .collect()
    }

    fn error_titles(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .flat_map(|e| match e {
                Event::Sent(_, m) | Event::Followup(m) | Event::Responded(m) => m.embeds,
                Event::Edited(_, _, edit) => edit.embeds.unwrap_or_default(),
                _ => Vec::new(),
            })
            .filter(|embed| embed.color == Some(0xff0000))
            .filter_map(|embed| embed.title)
            .collect()
    }
}

#[async_trait]
impl HistorySource for FakeDiscord {
    async fn fetch_history(
        &self,
        channel: &ChannelId,
        limit: u8,
        before: Option<&MessageId>,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        self.history_fetches.fetch_add(1, Ordering::SeqCst);
        let history = self.history.lock().unwrap();
        let mut newest_first: Vec<ChatMessage> =
            history.get(channel).cloned().unwrap_or_default();
        newest_first.reverse();
        let start = match before {
            Some(id) => newest_first
                .iter()
                .position(|m| &m.id == id)
                .map_or(newest_first.len(), |i| i + 1),
            None => 0,
        };
        Ok(newest_first
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl Transport for FakeDiscord {
    fn current_user_id(&self) -> Option<UserId> {
        Some(BOT.into())
    }

    async fn channel_info(&self, channel: &ChannelId) -> Result<ChannelInfo, TransportError> {
        self.channel_lookups.fetch_add(1, Ordering::SeqCst);
        self.channels
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .ok_or_else(|| TransportError::NotFound {
                what: "channel".into(),
                id: channel.to_string(),
            })
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError> {
        self.record(Event::Sent(channel.clone(), message));
        Ok(MessageRef {
            channel_id: channel.clone(),
            message_id: self.fresh_id(),
        })
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        edit: MessageEdit,
    ) -> Result<(), TransportError> {
        self.record(Event::Edited(channel.clone(), message.clone(), edit));
        Ok(())
    }

    async fn set_thread_locked(
        &self,
        thread: &ChannelId,
        locked: bool,
    ) -> Result<(), TransportError> {
        self.record(Event::Locked(thread.clone(), locked));
        Ok(())
    }

    async fn rename_thread(&self, thread: &ChannelId, name: &str) -> Result<(), TransportError> {
        self.record(Event::Renamed(thread.clone(), name.to_string()));
        Ok(())
    }

    async fn start_thread(
        &self,
        _channel: &ChannelId,
        _message: &MessageId,
        name: &str,
        _auto_archive_minutes: u16,
    ) -> Result<ChannelId, TransportError> {
        self.add_thread(THREAD);
        self.record(Event::ThreadStarted(THREAD.into(), name.to_string()));
        Ok(THREAD.into())
    }

    async fn add_reaction(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), TransportError> {
        self.record(Event::ReactionAdded(message.clone(), emoji.to_string()));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), TransportError> {
        self.record(Event::ReactionRemoved(message.clone(), emoji.to_string()));
        Ok(())
    }

    async fn broadcast_typing(&self, channel: &ChannelId) -> Result<(), TransportError> {
        self.record(Event::Typing(channel.clone()));
        Ok(())
    }

    async fn defer(&self, _interaction: &Interaction, _ephemeral: bool) -> Result<(), TransportError> {
        self.record(Event::Deferred);
        Ok(())
    }

    async fn respond(
        &self,
        _interaction: &Interaction,
        message: OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.record(Event::Responded(message));
        Ok(())
    }

    async fn followup(
        &self,
        interaction: &Interaction,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError> {
        self.record(Event::Followup(message));
        Ok(MessageRef {
            channel_id: interaction.channel_id.clone(),
            message_id: self.fresh_id(),
        })
    }

    async fn download_attachment(&self, url: &str) -> Result<String, TransportError> {
        Ok(format!("contents of {url}"))
    }
}

/// Answers `answer-N` (or nothing when `blank`), or fails while `failing`
/// is set. Title requests are recognised by their token cap and answered
/// with a fixed title.
#[derive(Default)]
struct ScriptedProvider {
    requests: Mutex<Vec<CompletionRequest>>,
    images: Mutex<Vec<ImageRequest>>,
    moderations: AtomicUsize,
    failing: AtomicBool,
    flagged: bool,
    blank: bool,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    fn completions(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.max_tokens.is_none())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(req.clone());
            requests.iter().filter(|r| r.max_tokens.is_none()).count()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if req.max_tokens.is_some() {
            return Ok(reply("\"A short title\"", &req.model));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("scripted outage".into()));
        }
        if self.blank {
            return Ok(reply("", &req.model));
        }
        Ok(reply(&format!("answer-{n}"), &req.model))
    }

    async fn generate_image(
        &self,
        req: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, ProviderError> {
        self.images.lock().unwrap().push(req.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("scripted outage".into()));
        }
        Ok(vec![GeneratedImage {
            url: "https://images.example/1.png".into(),
            revised_prompt: None,
        }])
    }

    async fn moderate(&self, _input: &str) -> Result<ModerationVerdict, ProviderError> {
        self.moderations.fetch_add(1, Ordering::SeqCst);
        Ok(ModerationVerdict {
            flagged: self.flagged,
            categories: if self.flagged {
                vec!["harassment".into()]
            } else {
                Vec::new()
            },
        })
    }
}

fn reply(content: &str, model: &str) -> CompletionResponse {
    CompletionResponse {
        content: content.to_string(),
        model: model.to_string(),
        usage: Usage {
            prompt_tokens: 40,
            completion_tokens: 10,
            total_tokens: 50,
        },
    }
}

/// Ten tokens per turn, every model supported.
struct FlatCost;

impl TokenAccountant for FlatCost {
    fn count_turn(&self, _turn: &Turn, _model: &str) -> Option<usize> {
        Some(10)
    }
}

struct Bot {
    discord: Arc<FakeDiscord>,
    provider: Arc<ScriptedProvider>,
    state: Arc<GptState>,
    router: Router,
}

impl Bot {
    fn new(provider: ScriptedProvider) -> Self {
        let mut config = RemaiConfig::default();
        config.openai.moderation = provider.flagged;
        config.conversation.history_retry_backoff_ms = 0;

        let provider = Arc::new(provider);
        let state = Arc::new(GptState::from_config(
            &config,
            Arc::clone(&provider) as Arc<dyn CompletionProvider>,
            Arc::new(FlatCost),
        ));
        let mut router = Router::new(MessageDispatch::All);
        router.register(info::command());
        router.register(gpt::command(Arc::clone(&state)));
        router.register(image::command(
            Arc::clone(&provider) as Arc<dyn CompletionProvider>
        ));

        Self {
            discord: Arc::new(FakeDiscord::new()),
            provider,
            state,
            router,
        }
    }

    async fn say(&self, channel: &str, id: &str, content: &str) -> bool {
        self.router
            .dispatch_message(
                Arc::clone(&self.discord) as Arc<dyn Transport>,
                user_message(channel, id, content),
            )
            .await
    }

    async fn invoke(&self, command: &str, options: Vec<CommandOption>) {
        self.router
            .dispatch_interaction(
                Arc::clone(&self.discord) as Arc<dyn Transport>,
                Interaction {
                    id: "i1".into(),
                    command: command.to_string(),
                    guild_id: Some("g1".into()),
                    channel_id: CHANNEL.into(),
                    user: user(),
                    options,
                },
            )
            .await
    }

    async fn cached_turns(&self, thread: &str) -> Vec<Turn> {
        match self.state.cache.get(&thread.into()) {
            Some(entry) => entry.lock().await.messages().to_vec(),
            None => Vec::new(),
        }
    }
}

fn user() -> UserInfo {
    UserInfo {
        id: "u1".into(),
        name: "alice".into(),
        avatar_url: None,
        bot: false,
    }
}

fn bot_user() -> UserInfo {
    UserInfo {
        id: BOT.into(),
        name: "remai".into(),
        avatar_url: None,
        bot: true,
    }
}

fn message(channel: &str, id: &str, author: UserInfo, kind: MessageKind, content: &str) -> ChatMessage {
    ChatMessage {
        id: id.into(),
        channel_id: channel.into(),
        guild_id: Some("g1".into()),
        author,
        kind,
        content: content.to_string(),
        embeds: Vec::new(),
        referenced: None,
    }
}

fn user_message(channel: &str, id: &str, content: &str) -> ChatMessage {
    message(channel, id, user(), MessageKind::Regular, content)
}

fn bot_message(channel: &str, id: &str, content: &str) -> ChatMessage {
    message(channel, id, bot_user(), MessageKind::Regular, content)
}

/// Thread starter pointing at a request embed posted by the bot.
fn starter(thread: &str, prompt: &str, model: &str) -> ChatMessage {
    let mut request = message(CHANNEL, "req", bot_user(), MessageKind::Regular, "");
    request.embeds.push(
        Embed {
            description: Some(prompt.to_string()),
            ..Embed::default()
        }
        .field("Model", model),
    );
    let mut starter = message(thread, "start", bot_user(), MessageKind::ThreadStarter, "");
    starter.referenced = Some(Box::new(request));
    starter
}

fn string_option(name: &str, value: &str) -> CommandOption {
    CommandOption {
        name: name.to_string(),
        value: OptionValue::String(value.to_string()),
    }
}

fn contents(turns: &[Turn]) -> Vec<(Role, &str)> {
    turns.iter().map(|t| (t.role, t.content.as_str())).collect()
}

#[tokio::test]
async fn gpt_interaction_opens_a_thread_and_answers_in_it() {
    let bot = Bot::new(ScriptedProvider::default());

    bot.invoke("gpt", vec![string_option("prompt", "What is Rust?")])
        .await;

    let events = bot.discord.events();
    assert_eq!(events[0], Event::Deferred);
    match &events[1] {
        Event::Followup(request) => {
            let embed = &request.embeds[0];
            assert_eq!(embed.description.as_deref(), Some("What is Rust?"));
            assert_eq!(
                embed.author.as_ref().map(|a| a.name.as_str()),
                Some("OpenAI chat request by alice")
            );
            assert!(!request.ephemeral);
        }
        other => panic!("expected the request message, got {other:?}"),
    }
    assert_eq!(
        events[2],
        Event::ThreadStarted(THREAD.into(), gpt::THREAD_NAME.to_string())
    );
    assert!(events.contains(&Event::Sent(
        THREAD.into(),
        OutgoingMessage::text(gpt::PENDING_MESSAGE)
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Edited(_, _, MessageEdit { content: Some(c), .. }) if c == "answer-1"
    )));
    assert_eq!(bot.discord.locks(), vec![true, false]);

    assert_eq!(
        contents(&bot.cached_turns(THREAD).await),
        vec![(Role::User, "What is Rust?"), (Role::Assistant, "answer-1")]
    );
    let entry = bot.state.cache.get(&THREAD.into()).unwrap();
    assert_eq!(entry.lock().await.token_count(), 50);

    // the title is generated in the background
    let mut renamed = false;
    for _ in 0..100 {
        if bot
            .discord
            .events()
            .contains(&Event::Renamed(THREAD.into(), "A short title".into()))
        {
            renamed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(renamed);
}

#[tokio::test]
async fn follow_up_message_continues_the_cached_conversation() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.invoke("gpt", vec![string_option("prompt", "What is Rust?")])
        .await;

    assert!(bot.say(THREAD, "m2", "And ownership?").await);

    let completions = bot.provider.completions();
    assert_eq!(completions.len(), 2);
    assert_eq!(
        contents(&completions[1].turns),
        vec![
            (Role::User, "What is Rust?"),
            (Role::Assistant, "answer-1"),
            (Role::User, "And ownership?"),
        ]
    );
    assert_eq!(bot.discord.fetches(), 0);

    let events = bot.discord.events();
    assert!(events.contains(&Event::ReactionAdded("m2".into(), "⌛".into())));
    assert!(events.contains(&Event::ReactionRemoved("m2".into(), "⌛".into())));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Sent(_, OutgoingMessage { content: Some(c), reply_to: Some(to), .. })
            if c == "answer-2" && to.as_str() == "m2"
    )));
}

#[tokio::test]
async fn cache_miss_rebuilds_the_conversation_from_history() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.discord.add_thread(THREAD);
    bot.discord.set_history(
        THREAD,
        vec![
            starter(THREAD, "What is Rust?", "gpt-3.5-turbo-16k"),
            bot_message(THREAD, "m1", "A systems language."),
            message(THREAD, "n1", user(), MessageKind::Other, "alice pinned a message"),
            user_message(THREAD, "m2", "Tell me more"),
        ],
    );

    assert!(bot.say(THREAD, "m2", "Tell me more").await);

    let completions = bot.provider.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].model, "gpt-3.5-turbo-16k");
    assert_eq!(
        contents(&completions[0].turns),
        vec![
            (Role::User, "What is Rust?"),
            (Role::Assistant, "A systems language."),
            (Role::User, "Tell me more"),
        ]
    );
    // one page, then the empty page that ends the walk
    assert_eq!(bot.discord.fetches(), 2);

    assert!(bot.say(THREAD, "m4", "Thanks").await);
    assert_eq!(bot.discord.fetches(), 2);
    assert_eq!(bot.cached_turns(THREAD).await.len(), 6);
}

#[tokio::test]
async fn locked_thread_is_ignored_without_reading_history() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.discord
        .add_channel(THREAD, ChannelKind::Thread, Some(CHANNEL), true);

    assert!(!bot.say(THREAD, "m1", "hello?").await);

    assert_eq!(bot.discord.fetches(), 0);
    assert!(bot.provider.completions().is_empty());
    assert!(bot.discord.events().is_empty());
}

#[tokio::test]
async fn ignored_channels_stay_ignored() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.discord.add_thread("t-foreign");
    bot.discord.set_history(
        "t-foreign",
        vec![
            message("t-foreign", "s", user(), MessageKind::ThreadStarter, ""),
            user_message("t-foreign", "m1", "hi"),
        ],
    );

    assert!(!bot.say(CHANNEL, "m0", "plain channel chatter").await);
    assert!(!bot.say("t-foreign", "m1", "hi").await);
    assert!(bot.state.ignored.contains(&CHANNEL.into()));
    assert!(bot.state.ignored.contains(&"t-foreign".into()));

    let (lookups, fetches) = (bot.discord.lookups(), bot.discord.fetches());
    assert!(!bot.say(CHANNEL, "m2", "more chatter").await);
    assert!(!bot.say("t-foreign", "m3", "hi again").await);
    assert_eq!(bot.discord.lookups(), lookups);
    assert_eq!(bot.discord.fetches(), fetches);
    assert!(bot.provider.completions().is_empty());
}

#[tokio::test]
async fn own_and_non_conversational_messages_are_skipped() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.discord.add_thread(THREAD);

    let own = bot_message(THREAD, "m1", "my own answer");
    let notice = message(THREAD, "m2", user(), MessageKind::Other, "joined");
    for msg in [own, notice] {
        assert!(
            !bot.router
                .dispatch_message(Arc::clone(&bot.discord) as Arc<dyn Transport>, msg)
                .await
        );
    }
    assert_eq!(bot.discord.lookups(), 0);
}

#[tokio::test]
async fn flagged_prompt_never_reaches_completion() {
    let bot = Bot::new(ScriptedProvider {
        flagged: true,
        ..ScriptedProvider::default()
    });

    bot.invoke("gpt", vec![string_option("prompt", "something nasty")])
        .await;

    assert_eq!(bot.provider.moderations.load(Ordering::SeqCst), 1);
    assert!(bot.provider.completions().is_empty());
    let events = bot.discord.events();
    assert!(events.iter().all(|e| !matches!(e, Event::ThreadStarted(..))));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Followup(m) if m.ephemeral
            && m.embeds.first().and_then(|e| e.description.as_deref()) == Some(FLAGGED_PROMPT)
    )));
}

#[tokio::test]
async fn gpt_inside_a_thread_is_refused() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.discord.add_thread(THREAD);

    bot.router
        .dispatch_interaction(
            Arc::clone(&bot.discord) as Arc<dyn Transport>,
            Interaction {
                id: "i2".into(),
                command: gpt::NAME.to_string(),
                guild_id: Some("g1".into()),
                channel_id: THREAD.into(),
                user: user(),
                options: vec![string_option("prompt", "hi")],
            },
        )
        .await;

    assert!(bot.provider.completions().is_empty());
    assert_eq!(bot.discord.error_titles(), vec!["❌ Error".to_string()]);
}

#[tokio::test]
async fn failed_completion_keeps_the_user_turn() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.discord.add_thread(THREAD);
    bot.state
        .cache
        .add(THREAD.into(), ConversationEntry::new(GPT_3_5_TURBO));

    bot.provider.failing.store(true, Ordering::SeqCst);
    assert!(bot.say(THREAD, "m1", "first try").await);

    assert_eq!(
        contents(&bot.cached_turns(THREAD).await),
        vec![(Role::User, "first try")]
    );
    assert_eq!(bot.discord.error_titles(), vec!["❌ OpenAI API failed".to_string()]);
    assert!(bot
        .discord
        .events()
        .contains(&Event::ReactionAdded("m1".into(), "❌".into())));
    assert_eq!(bot.discord.locks(), vec![true, false]);

    bot.provider.failing.store(false, Ordering::SeqCst);
    assert!(bot.say(THREAD, "m2", "second try").await);
    assert_eq!(
        contents(&bot.cached_turns(THREAD).await),
        vec![
            (Role::User, "first try"),
            (Role::User, "second try"),
            (Role::Assistant, "answer-2"),
        ]
    );
}

#[tokio::test]
async fn messages_in_one_thread_are_answered_in_order() {
    let bot = Bot::new(ScriptedProvider {
        delay: Some(Duration::from_millis(20)),
        ..ScriptedProvider::default()
    });
    bot.discord.add_thread(THREAD);
    bot.state
        .cache
        .add(THREAD.into(), ConversationEntry::new(GPT_3_5_TURBO));

    let (a, b) = tokio::join!(
        bot.say(THREAD, "m1", "first"),
        bot.say(THREAD, "m2", "second")
    );
    assert!(a && b);

    let completions = bot.provider.completions();
    assert_eq!(completions.len(), 2);
    assert_eq!(
        contents(&completions[1].turns),
        vec![
            (Role::User, "first"),
            (Role::Assistant, "answer-1"),
            (Role::User, "second"),
        ]
    );
    assert_eq!(bot.discord.locks(), vec![true, false, true, false]);
    assert_eq!(bot.state.gate.active(), 0);
}

#[tokio::test]
async fn info_reports_the_version_privately() {
    let bot = Bot::new(ScriptedProvider::default());

    bot.invoke(info::NAME, Vec::new()).await;

    let events = bot.discord.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Responded(m) => {
            assert!(m.ephemeral);
            let embed = &m.embeds[0];
            assert_eq!(embed.title.as_deref(), Some("Bot Version"));
            assert_eq!(
                embed.description.as_deref(),
                Some(format!("Version: {}", remai_commands::VERSION).as_str())
            );
        }
        other => panic!("expected a response, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_completion_still_fills_the_placeholder() {
    let bot = Bot::new(ScriptedProvider {
        blank: true,
        ..ScriptedProvider::default()
    });

    bot.invoke("gpt", vec![string_option("prompt", "Say nothing")])
        .await;

    assert!(bot.discord.events().iter().any(|e| matches!(
        e,
        Event::Edited(_, _, MessageEdit { content: Some(c), .. }) if c == EMPTY_REPLY
    )));
    assert_eq!(bot.discord.locks(), vec![true, false]);
}

#[tokio::test]
async fn image_command_posts_a_gallery() {
    let bot = Bot::new(ScriptedProvider::default());

    bot.invoke(
        "image",
        vec![
            string_option("prompt", "a red fox in the snow"),
            string_option("quality", "hd"),
        ],
    )
    .await;

    let events = bot.discord.events();
    assert_eq!(events[0], Event::Deferred);
    let Event::Followup(gallery) = &events[1] else {
        panic!("expected the gallery, got {:?}", events[1]);
    };
    assert_eq!(gallery.embeds.len(), 2);
    assert_eq!(
        gallery.embeds[0].author.as_ref().map(|a| a.name.as_str()),
        Some("a red fox in the snow")
    );
    assert_eq!(
        gallery.embeds[0].footer.as_ref().map(|f| f.text.as_str()),
        Some("Size: 1024x1024\nGeneration Cost: $0.080")
    );
    assert_eq!(
        gallery.embeds[1].image_url.as_deref(),
        Some("https://images.example/1.png")
    );

    let requests = bot.provider.images.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "dall-e-3");
    assert_eq!(requests[0].quality.as_deref(), Some("hd"));
    assert_eq!(requests[0].user.as_deref(), Some("u1"));
    // image prompts are always moderated
    assert_eq!(bot.provider.moderations.load(Ordering::SeqCst), 1);
    assert!(bot.discord.error_titles().is_empty());
}

#[tokio::test]
async fn flagged_image_prompt_is_never_drawn() {
    let bot = Bot::new(ScriptedProvider {
        flagged: true,
        ..ScriptedProvider::default()
    });

    bot.invoke("image", vec![string_option("prompt", "something nasty")])
        .await;

    assert!(bot.provider.images.lock().unwrap().is_empty());
    assert!(bot.discord.events().iter().any(|e| matches!(
        e,
        Event::Followup(m) if m.ephemeral
            && m.embeds[0].description.as_deref() == Some(FLAGGED_PROMPT)
    )));
}

#[tokio::test]
async fn image_api_failure_is_reported() {
    let bot = Bot::new(ScriptedProvider::default());
    bot.provider.failing.store(true, Ordering::SeqCst);

    bot.invoke("image", vec![string_option("prompt", "a red fox")])
        .await;

    assert_eq!(bot.discord.error_titles(), vec!["❌ OpenAI API failed"]);
}

#[tokio::test]
async fn image_size_the_model_cannot_draw_is_rejected_up_front() {
    let bot = Bot::new(ScriptedProvider::default());

    bot.invoke(
        "image",
        vec![
            string_option("prompt", "a red fox"),
            string_option("model", "dall-e-3"),
            string_option("size", "256x256"),
        ],
    )
    .await;

    assert!(bot.provider.images.lock().unwrap().is_empty());
    assert!(!bot.discord.events().contains(&Event::Deferred));
    assert_eq!(bot.discord.error_titles(), vec!["❌ Invalid options"]);
}
