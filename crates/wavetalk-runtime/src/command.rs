//! Line commands for the terminal front end.
//!
//! Lines starting with `/` are commands; anything else is a message for the
//! selected chat. Parsing never fails: bad input becomes
//! [`Command::Unknown`] or [`Command::InvalidArgs`] so the caller can report
//! it.

use wavetalk_core::{ChatId, DirectoryView, MessageId, Presence, UserId};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/login [identifier]`
    Login {
        /// Email or empty, depending on the login rule
        identifier: String,
    },
    /// `/logout`
    Logout,
    /// `/list [chats|contacts|groups] [term]`
    List {
        /// Sidebar tab
        view: DirectoryView,
        /// Name filter, possibly empty
        term: String,
    },
    /// `/open <chat_id>`
    Open {
        /// Chat to select
        chat_id: ChatId,
    },
    /// `/dm <user_id>`
    Direct {
        /// Counterpart
        user_id: UserId,
    },
    /// `/group <name> <user_id>...`
    Group {
        /// Group name
        name: String,
        /// Members besides the session user
        members: Vec<UserId>,
    },
    /// `/close`
    Close,
    /// `/show`
    Show,
    /// Plain text.
    Send {
        /// Message body
        body: String,
    },
    /// `/status <label>`
    Status {
        /// Quick status label
        label: String,
    },
    /// `/react <message_id> <emoji>`
    React {
        /// Target message in the selected chat
        message_id: MessageId,
        /// Emoji to toggle
        emoji: String,
    },
    /// `/delete <message_id>`
    Delete {
        /// Target message in the selected chat
        message_id: MessageId,
    },
    /// `/remove`
    RemoveChat,
    /// `/search <term>`
    Search {
        /// Search term
        term: String,
    },
    /// `/presence <online|away|busy|offline>`
    Presence {
        /// New presence
        presence: Presence,
    },
    /// `/contact <user_id>` or `/uncontact <user_id>`
    Contact {
        /// Target user
        user_id: UserId,
        /// New flag value
        is_contact: bool,
    },
    /// `/newcontact <name>`
    NewContact {
        /// Display name
        name: String,
    },
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Unrecognized command word.
    Unknown {
        /// The line as typed
        input: String,
    },
    /// Recognized command with unusable arguments.
    InvalidArgs {
        /// Command word
        command: String,
        /// What was wrong
        error: String,
    },
}

/// Usage lines shown by `/help`.
pub const HELP: &str = "\
/login [email]              log in
/logout                     log out
/list [chats|contacts|groups] [term]
/open <chat_id>             select a chat
/dm <user_id>               open a direct chat
/group <name> <user_id>...  create a group
/close                      clear the selection
/show                       print the selected chat
/status <label>             send a quick status
/react <message_id> <emoji> toggle a reaction
/delete <message_id>        delete a message
/remove                     delete the selected chat
/search <term>              search every chat
/presence <state>           online, away, busy or offline
/contact <user_id>          add to contacts (/uncontact removes)
/newcontact <name>          create a contact
/quit                       exit
anything else               send to the selected chat";

fn invalid(command: &str, error: impl Into<String>) -> Command {
    Command::InvalidArgs { command: command.to_owned(), error: error.into() }
}

/// Parse one input line.
pub fn parse(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send { body: line.to_owned() };
    };

    let (command, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    let parts: Vec<&str> = args.split_whitespace().collect();

    match command {
        "login" => Command::Login { identifier: args.to_owned() },
        "logout" => Command::Logout,
        "list" | "ls" => match parts.first() {
            None => Command::List { view: DirectoryView::default(), term: String::new() },
            Some(first) => match DirectoryView::parse(first) {
                Some(view) => Command::List { view, term: parts[1..].join(" ") },
                None => Command::List { view: DirectoryView::default(), term: args.to_owned() },
            },
        },
        "open" => match parts.as_slice() {
            [chat_id] => Command::Open { chat_id: ChatId::from(*chat_id) },
            _ => invalid(command, "usage: /open <chat_id>"),
        },
        "dm" => match parts.as_slice() {
            [user_id] => Command::Direct { user_id: UserId::from(*user_id) },
            _ => invalid(command, "usage: /dm <user_id>"),
        },
        "group" => match parts.as_slice() {
            [name, members @ ..] if !members.is_empty() => Command::Group {
                name: (*name).to_owned(),
                members: members.iter().map(|m| UserId::from(*m)).collect(),
            },
            _ => invalid(command, "usage: /group <name> <user_id>..."),
        },
        "close" => Command::Close,
        "show" => Command::Show,
        "status" if !args.is_empty() => Command::Status { label: args.to_owned() },
        "status" => invalid(command, "usage: /status <label>"),
        "react" => match parts.as_slice() {
            [message_id, emoji] => {
                Command::React { message_id: MessageId::from(*message_id), emoji: (*emoji).to_owned() }
            },
            _ => invalid(command, "usage: /react <message_id> <emoji>"),
        },
        "delete" => match parts.as_slice() {
            [message_id] => Command::Delete { message_id: MessageId::from(*message_id) },
            _ => invalid(command, "usage: /delete <message_id>"),
        },
        "remove" => Command::RemoveChat,
        "search" => Command::Search { term: args.to_owned() },
        "presence" => match Presence::parse(args) {
            Some(presence) => Command::Presence { presence },
            None => invalid(command, "expected online, away, busy or offline"),
        },
        "contact" | "uncontact" => match parts.as_slice() {
            [user_id] => Command::Contact { user_id: UserId::from(*user_id), is_contact: command == "contact" },
            _ => invalid(command, format!("usage: /{command} <user_id>")),
        },
        "newcontact" if !args.is_empty() => Command::NewContact { name: args.to_owned() },
        "newcontact" => invalid(command, "usage: /newcontact <name>"),
        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => Command::Unknown { input: line.to_owned() },
    }
}
