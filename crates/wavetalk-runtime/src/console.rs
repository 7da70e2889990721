//! Text front end over an [`EngineHandle`].
//!
//! Executes parsed [`Command`]s and renders the results as plain lines. The
//! binary writes them to stdout; tests inspect them directly.

use wavetalk_core::{
    Chat, ChatEngine, ChatId, Credentials, DirectoryView, EngineError, EngineEvent, Environment, Message,
    SessionStorage, User, UserDraft, UserId,
};

use crate::{
    actor::{EngineHandle, RuntimeError},
    command::{Command, HELP},
};

/// Result of executing one command.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reply {
    /// Lines to show, in order.
    pub lines: Vec<String>,
    /// True if the front end should exit.
    pub quit: bool,
}

impl Reply {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

/// Execute `command` against the engine.
///
/// Engine errors become reply lines; only a stopped engine task is an error.
///
/// # Errors
///
/// Returns `RuntimeError::EngineGone` if the engine task has stopped.
pub async fn execute<E, S>(handle: &EngineHandle<E, S>, command: Command) -> Result<Reply, RuntimeError>
where
    E: Environment,
    S: SessionStorage,
{
    let reply = match command {
        Command::Help => Reply::lines(HELP.lines().map(str::to_owned).collect()),
        Command::Quit => Reply { lines: Vec::new(), quit: true },
        Command::Unknown { input } => Reply::line(format!("unknown command: {input} (try /help)")),
        Command::InvalidArgs { command, error } => Reply::line(format!("/{command}: {error}")),
        command => handle.call(move |engine| apply(engine, command)).await?,
    };
    Ok(reply)
}

/// Run an engine-bound command on the engine task.
fn apply<E: Environment, S: SessionStorage>(engine: &mut ChatEngine<E, S>, command: Command) -> Reply {
    match run(engine, command) {
        Ok(reply) => reply,
        Err(error) if error.requires_login() => Reply::line(format!("{error} (use /login)")),
        Err(error) => Reply::line(format!("error: {error}")),
    }
}

fn run<E: Environment, S: SessionStorage>(
    engine: &mut ChatEngine<E, S>,
    command: Command,
) -> Result<Reply, EngineError> {
    let reply = match command {
        Command::Login { identifier } => {
            let user = engine.login(&Credentials::identifier(identifier))?;
            let mut lines = vec![format!("logged in as {} ({})", user.display_name, user.id)];
            lines.extend(render_selected(engine));
            Reply::lines(lines)
        },
        Command::Logout => {
            engine.logout();
            Reply::line("logged out")
        },
        Command::List { view, term } => {
            let mut lines: Vec<String> =
                engine.filter_chats(&term, view).into_iter().map(|chat| render_chat_line(engine, chat)).collect();
            if view == DirectoryView::Contacts {
                lines.extend(engine.filter_users(&term, view).into_iter().map(render_user_line));
            }
            if lines.is_empty() {
                lines.push("nothing matches".to_owned());
            }
            Reply::lines(lines)
        },
        Command::Open { chat_id } => {
            engine.select_chat(&chat_id)?;
            Reply::lines(render_selected(engine))
        },
        Command::Direct { user_id } => {
            engine.open_direct(&user_id)?;
            Reply::lines(render_selected(engine))
        },
        Command::Group { name, members } => {
            engine.create_group(&name, None, &members)?;
            Reply::lines(render_selected(engine))
        },
        Command::Close => {
            engine.clear_selection();
            Reply::line("no chat selected")
        },
        Command::Show => Reply::lines(render_selected(engine)),
        Command::Send { body } => {
            let (chat_id, me) = selection(engine)?;
            let message = engine.send(&chat_id, &me, &body)?;
            Reply::line(render_message(engine, &message))
        },
        Command::Status { label } => {
            let (chat_id, me) = selection(engine)?;
            let message = engine.send_quick_status(&chat_id, &me, &label)?;
            Reply::line(render_message(engine, &message))
        },
        Command::React { message_id, emoji } => {
            let (chat_id, me) = selection(engine)?;
            let change = engine.toggle_reaction(&chat_id, &message_id, &emoji, &me)?;
            Reply::line(format!("{emoji} on {message_id}: {change:?}"))
        },
        Command::Delete { message_id } => {
            let (chat_id, _) = selection(engine)?;
            if engine.soft_delete(&chat_id, &message_id)? {
                Reply::line(format!("deleted {message_id}"))
            } else {
                Reply::line(format!("{message_id} was already deleted"))
            }
        },
        Command::RemoveChat => {
            let (chat_id, _) = selection(engine)?;
            engine.delete_chat(&chat_id)?;
            Reply::line(format!("removed {chat_id}"))
        },
        Command::Search { term } => match engine.search_all(&term) {
            None => Reply::line("enter a search term"),
            Some(hits) if hits.is_empty() => Reply::line("no messages found"),
            Some(hits) => {
                let mut lines = Vec::new();
                for hit in hits {
                    lines.push(format!("[{}]", hit.chat_id));
                    lines.extend(hit.messages.iter().map(|m| format!("  {}", render_message(engine, m))));
                }
                Reply::lines(lines)
            },
        },
        Command::Presence { presence } => {
            engine.update_presence(presence)?;
            Reply::line(format!("presence: {}", presence.as_str()))
        },
        Command::Contact { user_id, is_contact } => {
            engine.set_contact(&user_id, is_contact)?;
            Reply::line(format!("{user_id} contact: {is_contact}"))
        },
        Command::NewContact { name } => {
            let user_id = engine.create_contact(UserDraft { display_name: name, ..UserDraft::default() })?;
            Reply::line(format!("created contact {user_id}"))
        },
        Command::Help | Command::Quit | Command::Unknown { .. } | Command::InvalidArgs { .. } => Reply::default(),
    };
    Ok(reply)
}

/// Selected chat and session user.
fn selection<E: Environment, S: SessionStorage>(
    engine: &ChatEngine<E, S>,
) -> Result<(ChatId, UserId), EngineError> {
    let me = engine.current_user_id().cloned().ok_or(EngineError::Unauthenticated)?;
    let chat_id = engine
        .selected_chat()
        .map(|chat| chat.id.clone())
        .ok_or_else(|| EngineError::InvalidState { reason: "no chat selected (use /open)".to_owned() })?;
    Ok((chat_id, me))
}

fn display_name<E: Environment, S: SessionStorage>(engine: &ChatEngine<E, S>, user_id: &UserId) -> String {
    engine.find_user(user_id).map_or_else(|| user_id.to_string(), |user| user.display_name.clone())
}

/// Group name, or the counterpart's name for direct chats.
fn chat_title<E: Environment, S: SessionStorage>(engine: &ChatEngine<E, S>, chat: &Chat) -> String {
    if let Some(name) = chat.group_name() {
        return name.to_owned();
    }
    let me = engine.current_user_id();
    chat.participants
        .iter()
        .find(|p| Some(*p) != me)
        .map_or_else(|| chat.id.to_string(), |other| display_name(engine, other))
}

fn render_chat_line<E: Environment, S: SessionStorage>(engine: &ChatEngine<E, S>, chat: &Chat) -> String {
    let preview = chat.last_message().map(|m| m.body.as_str()).unwrap_or_default();
    let unread = if chat.unread_count > 0 { format!(" ({} unread)", chat.unread_count) } else { String::new() };
    format!("{:<8} {}{unread}: {preview}", chat.id, chat_title(engine, chat))
}

fn render_user_line(user: &User) -> String {
    let contact = if user.is_contact { " *" } else { "" };
    format!("{:<8} {} [{}]{contact}", user.id, user.display_name, user.presence.as_str())
}

fn render_message<E: Environment, S: SessionStorage>(engine: &ChatEngine<E, S>, message: &Message) -> String {
    let reactions: Vec<String> =
        message.reactions.iter().map(|(emoji, users)| format!("{emoji}{}", users.len())).collect();
    let reactions = if reactions.is_empty() { String::new() } else { format!("  {}", reactions.join(" ")) };
    format!(
        "{} {} {}: {}{reactions}",
        message.created_at,
        message.id,
        display_name(engine, &message.sender_id),
        message.body
    )
}

fn render_selected<E: Environment, S: SessionStorage>(engine: &ChatEngine<E, S>) -> Vec<String> {
    let Some(chat) = engine.selected_chat() else {
        return vec!["no chat selected".to_owned()];
    };
    let mut lines = vec![format!("== {} ({}) ==", chat_title(engine, chat), chat.id)];
    lines.extend(chat.messages.iter().map(|m| render_message(engine, m)));
    lines
}

/// One-line notice for events worth interrupting the prompt for.
///
/// Only events that arrive without a command (simulated activity) are
/// described.
pub fn describe_event(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::TypingChanged { chat_id, user_id, typing: true } => {
            Some(format!("[{chat_id}] user {user_id} is typing..."))
        },
        EngineEvent::MessageAppended { chat_id, message_id, inbound: true } => {
            Some(format!("[{chat_id}] new message {message_id} (/show)"))
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use wavetalk_core::{Dataset, EngineConfig, MemoryStorage};

    use super::*;
    use crate::{SystemEnv, actor, command::parse};

    async fn run_lines(handle: &EngineHandle<SystemEnv, MemoryStorage>, line: &str) -> Reply {
        execute(handle, parse(line)).await.unwrap()
    }

    fn spawn_demo() -> EngineHandle<SystemEnv, MemoryStorage> {
        let engine = ChatEngine::new(SystemEnv::new(), MemoryStorage::new(), EngineConfig::default(), Dataset::demo());
        actor::spawn(engine).0
    }

    #[tokio::test]
    async fn commands_need_login() {
        let handle = spawn_demo();

        let reply = run_lines(&handle, "/open chat2").await;

        assert_eq!(reply.lines, vec!["must log in (use /login)".to_owned()]);
    }

    #[tokio::test]
    async fn login_shows_first_chat() {
        let handle = spawn_demo();

        let reply = run_lines(&handle, "/login").await;

        assert_eq!(reply.lines[0], "logged in as Noah Smith (6)");
        assert!(reply.lines[1].starts_with("== "));
        assert!(reply.lines[1].ends_with("(chat1) =="));
        assert_eq!(reply.lines.len(), 2 + 3);
    }

    #[tokio::test]
    async fn plain_text_goes_to_selected_chat() {
        let handle = spawn_demo();
        run_lines(&handle, "/login").await;
        run_lines(&handle, "/open chat2").await;

        let reply = run_lines(&handle, "see you at five").await;

        assert!(reply.lines[0].ends_with("Noah Smith: see you at five"));
        let last = handle
            .call(|e| e.find_chat(&ChatId::from("chat2")).and_then(Chat::last_message).map(|m| m.body.clone()))
            .await
            .unwrap();
        assert_eq!(last.as_deref(), Some("see you at five"));
    }

    #[tokio::test]
    async fn send_without_selection_is_reported() {
        let handle = spawn_demo();
        run_lines(&handle, "/login").await;
        run_lines(&handle, "/close").await;

        let reply = run_lines(&handle, "hello").await;

        assert_eq!(reply.lines, vec!["error: invalid state: no chat selected (use /open)".to_owned()]);
    }

    #[tokio::test]
    async fn search_distinguishes_blank_and_empty() {
        let handle = spawn_demo();

        assert_eq!(run_lines(&handle, "/search   ").await.lines, vec!["enter a search term".to_owned()]);
        assert_eq!(run_lines(&handle, "/search zzzz").await.lines, vec!["no messages found".to_owned()]);
    }

    #[tokio::test]
    async fn list_groups_shows_project_alpha() {
        let handle = spawn_demo();
        run_lines(&handle, "/login").await;

        let reply = run_lines(&handle, "/list groups alpha").await;

        assert_eq!(reply.lines.len(), 1);
        assert!(reply.lines[0].contains("Project Alpha Team"));
    }

    #[tokio::test]
    async fn quit_and_help_stay_local() {
        let handle = spawn_demo();

        assert!(run_lines(&handle, "/quit").await.quit);
        assert!(run_lines(&handle, "/help").await.lines.len() > 10);
    }

    #[test]
    fn describes_simulated_activity_only() {
        let typing = EngineEvent::TypingChanged {
            chat_id: ChatId::from("chat1"),
            user_id: UserId::from("1"),
            typing: true,
        };
        let own = EngineEvent::MessageAppended {
            chat_id: ChatId::from("chat1"),
            message_id: wavetalk_core::MessageId::from("m"),
            inbound: false,
        };

        assert!(describe_event(&typing).is_some());
        assert!(describe_event(&own).is_none());
    }
}
