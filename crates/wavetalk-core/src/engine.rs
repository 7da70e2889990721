//! Chat engine: the composition root.
//!
//! [`ChatEngine`] owns the identity store, the conversation store, the
//! session and the presence simulator. Every mutating entry point checks the
//! session first and fails with [`EngineError::Unauthenticated`] without one.
//!
//! # Driving
//!
//! The engine is sans-IO. A driver loop looks like:
//!
//! ```text
//! loop {
//!     match engine.next_deadline() {
//!         Some(deadline) => sleep_until(deadline) or handle a command,
//!         None => wait for a command,
//!     }
//!     engine.tick();
//!     publish(engine.take_events());
//! }
//! ```
//!
//! Every operation that changes what the presence simulator should be doing
//! (login, logout, selecting or deleting chats) re-arms or disarms it before
//! returning, so the next call to [`ChatEngine::next_deadline`] already
//! reflects the new schedule.

use crate::{
    config::{EngineConfig, LoginRule},
    conversation::{Chat, ConversationStore},
    dataset::Dataset,
    directory::{self, DirectoryView},
    env::{Environment, clock_label},
    error::{EngineError, EntityKind, StorageError},
    identity::{IdentityStore, Presence, User, UserDraft},
    ids::{ChatId, MessageId, UserId},
    message::{Message, ReactionChange},
    operations,
    presence::{PresenceAction, PresenceSimulator},
    search::{self, SearchHit},
    session::{Credentials, Session, SessionRecord},
    storage::SessionStorage,
};

/// Number of stock group avatars to pick from.
const GROUP_AVATAR_COUNT: usize = 9;

/// Notification that engine state changed.
///
/// Drained with [`ChatEngine::take_events`]. Rendering layers use these to
/// know what to redraw; they carry ids only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Login or logout happened.
    SessionChanged {
        /// Whether a user is now logged in
        authenticated: bool,
    },
    /// A user's presence changed.
    PresenceChanged {
        /// Affected user
        user_id: UserId,
        /// New presence
        presence: Presence,
    },
    /// The selected chat changed.
    ChatSelected {
        /// New selection. `None` when cleared.
        chat_id: Option<ChatId>,
    },
    /// A chat was created.
    ChatCreated {
        /// New chat
        chat_id: ChatId,
    },
    /// A chat was removed.
    ChatDeleted {
        /// Removed chat
        chat_id: ChatId,
    },
    /// A chat's messages were all marked read.
    ChatRead {
        /// Affected chat
        chat_id: ChatId,
    },
    /// A message was appended.
    MessageAppended {
        /// Target chat
        chat_id: ChatId,
        /// New message
        message_id: MessageId,
        /// True for simulated inbound messages
        inbound: bool,
    },
    /// A message was tombstoned.
    MessageDeleted {
        /// Containing chat
        chat_id: ChatId,
        /// Tombstoned message
        message_id: MessageId,
    },
    /// A reaction was added or removed.
    ReactionChanged {
        /// Containing chat
        chat_id: ChatId,
        /// Target message
        message_id: MessageId,
        /// Emoji toggled
        emoji: String,
        /// Whether it was added or removed
        change: ReactionChange,
    },
    /// A participant's typing flag changed.
    TypingChanged {
        /// Chat the flag was raised in
        chat_id: ChatId,
        /// Affected user
        user_id: UserId,
        /// New flag value
        typing: bool,
    },
    /// The local composer typing indicator changed.
    ComposingChanged {
        /// New indicator value
        typing: bool,
    },
    /// A user was added or had their contact flag changed.
    ContactChanged {
        /// Affected user
        user_id: UserId,
    },
}

/// Authoritative in-memory chat state.
pub struct ChatEngine<E: Environment, S: SessionStorage> {
    env: E,
    storage: S,
    config: EngineConfig,
    identity: IdentityStore,
    conversations: ConversationStore,
    session: Session,
    presence: PresenceSimulator<E::Instant>,
    /// When the local composer indicator clears. `None` if not composing.
    composing_until: Option<E::Instant>,
    events: Vec<EngineEvent>,
}

impl<E: Environment, S: SessionStorage> ChatEngine<E, S> {
    /// Create an engine over `dataset` and restore any persisted session.
    ///
    /// A persisted record that cannot be read, or that names a user missing
    /// from the dataset, is removed and the engine starts anonymous. A
    /// restored session selects no chat.
    pub fn new(env: E, storage: S, config: EngineConfig, dataset: Dataset) -> Self {
        let presence = PresenceSimulator::new(config.presence.clone());
        let mut engine = Self {
            env,
            storage,
            config,
            identity: IdentityStore::from_users(dataset.users),
            conversations: ConversationStore::from_chats(dataset.chats),
            session: Session::Anonymous,
            presence,
            composing_until: None,
            events: Vec::new(),
        };
        engine.restore_session();
        engine
    }

    fn restore_session(&mut self) {
        let key = &self.config.storage_key;
        let raw = match self.storage.load(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(%error, "Failed to read session record");
                return;
            },
        };

        let session = match SessionRecord::decode(&raw) {
            Ok(record) => record.into_session(),
            Err(error) => {
                tracing::warn!(%error, "Discarding malformed session record");
                self.discard_record();
                return;
            },
        };

        let Session::Authenticated { mut user } = session else {
            return;
        };
        let Some(known) = self.identity.find_by_id(&user.id) else {
            tracing::warn!(user = %user.id, "Discarding session record for unknown user");
            self.discard_record();
            return;
        };

        user.presence = known.presence;
        tracing::info!(user = %user.id, "Restored session");
        self.session = Session::Authenticated { user };
    }

    fn discard_record(&self) {
        if let Err(error) = self.storage.remove(&self.config.storage_key) {
            tracing::warn!(%error, "Failed to remove session record");
        }
    }

    /// Write the session record, or remove it when anonymous.
    ///
    /// Failures are logged; the in-memory session stays authoritative.
    fn persist_session(&self) {
        let key = &self.config.storage_key;
        let result = if self.session.is_authenticated() {
            self.session
                .to_record()
                .encode()
                .map_err(|e| StorageError::Serialization(e.to_string()))
                .and_then(|raw| self.storage.store(key, &raw))
        } else {
            self.storage.remove(key)
        };

        if let Err(error) = result {
            tracing::warn!(%error, "Failed to persist session record");
        }
    }

    fn require_user(&self) -> Result<UserId, EngineError> {
        self.session.user_id().cloned().ok_or(EngineError::Unauthenticated)
    }

    fn now_label(&self) -> String {
        clock_label(self.env.wall_clock_secs())
    }

    fn push(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    // Session

    /// Log in.
    ///
    /// Resolves the credentials with the configured [`LoginRule`], sets the
    /// session with the user's current presence, persists it and selects the
    /// first chat. Logging in while logged in replaces the session.
    ///
    /// # Errors
    ///
    /// - `AuthFailed` if the rule finds no user
    pub fn login(&mut self, credentials: &Credentials) -> Result<User, EngineError> {
        let found = match &self.config.login_rule {
            LoginRule::Fixed { display_name } => self.identity.find_by_name(display_name),
            LoginRule::Email => self.identity.find_by_email(&credentials.identifier),
        };
        let Some(user) = found.cloned() else {
            tracing::warn!(identifier = %credentials.identifier, "Login failed");
            return Err(EngineError::AuthFailed);
        };

        self.stop_simulation();
        self.composing_until = None;

        tracing::info!(user = %user.id, name = %user.display_name, "Logged in");
        self.session = Session::Authenticated { user: user.clone() };
        self.persist_session();
        self.push(EngineEvent::SessionChanged { authenticated: true });

        if let Some(first) = self.conversations.list_chats().first().map(|c| c.id.clone()) {
            self.select_chat(&first)?;
        }
        Ok(user)
    }

    /// Log out.
    ///
    /// Cancels the simulator, clears the selection and removes the persisted
    /// record. Logging out while anonymous does nothing.
    pub fn logout(&mut self) {
        let Some(user) = self.session.user_id().cloned() else {
            return;
        };

        self.stop_simulation();
        if self.composing_until.take().is_some() {
            self.push(EngineEvent::ComposingChanged { typing: false });
        }
        if self.conversations.selected().is_some() {
            self.conversations.clear_selection();
            self.push(EngineEvent::ChatSelected { chat_id: None });
        }

        tracing::info!(%user, "Logged out");
        self.session = Session::Anonymous;
        self.persist_session();
        self.push(EngineEvent::SessionChanged { authenticated: false });
    }

    /// Change the session user's presence and persist it.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    pub fn update_presence(&mut self, presence: Presence) -> Result<(), EngineError> {
        let me = self.require_user()?;
        self.identity.update_status(&me, presence);
        self.session.set_presence(presence);
        self.persist_session();
        tracing::debug!(user = %me, presence = presence.as_str(), "Presence updated");
        self.push(EngineEvent::PresenceChanged { user_id: me, presence });
        Ok(())
    }

    /// Note a keystroke in the composer.
    ///
    /// Raises the local typing indicator, which clears itself once the
    /// composing timeout passes without another keystroke.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    pub fn notify_composing(&mut self) -> Result<(), EngineError> {
        self.require_user()?;
        let until = self.env.now() + self.config.composing_timeout;
        if self.composing_until.replace(until).is_none() {
            self.push(EngineEvent::ComposingChanged { typing: true });
        }
        Ok(())
    }

    // Selection

    /// Select a chat.
    ///
    /// Marks every message in it read, then points the presence simulator at
    /// it, cancelling the previous chat's tickers.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `NotFound` if the chat does not exist
    pub fn select_chat(&mut self, chat_id: &ChatId) -> Result<(), EngineError> {
        let me = self.require_user()?;
        let counterparts: Vec<UserId> = self
            .conversations
            .find_chat(chat_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Chat, chat_id))?
            .others(&me)
            .cloned()
            .collect();

        operations::mark_all_read(&mut self.conversations, chat_id)?;
        self.push(EngineEvent::ChatRead { chat_id: chat_id.clone() });
        self.conversations.select(chat_id);
        self.push(EngineEvent::ChatSelected { chat_id: Some(chat_id.clone()) });

        let actions = self.presence.arm(chat_id.clone(), counterparts, self.env.now());
        self.apply_presence(actions);
        Ok(())
    }

    /// Clear the selection and cancel the simulator.
    pub fn clear_selection(&mut self) {
        self.stop_simulation();
        if self.conversations.selected().is_some() {
            self.conversations.clear_selection();
            self.push(EngineEvent::ChatSelected { chat_id: None });
        }
    }

    fn stop_simulation(&mut self) {
        let actions = self.presence.disarm();
        self.apply_presence(actions);
    }

    // Messages

    /// Append a message from `sender_id`.
    ///
    /// The message is labelled with the current wall-clock time. The chat's
    /// unread count is left alone.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `NotFound` if the chat does not exist
    /// - `InvalidState` for a blank body or a sender outside the chat
    pub fn send(&mut self, chat_id: &ChatId, sender_id: &UserId, body: &str) -> Result<Message, EngineError> {
        self.require_user()?;
        let label = self.now_label();
        let message = operations::send(&mut self.conversations, chat_id, sender_id, body, label)?.clone();
        self.push(EngineEvent::MessageAppended {
            chat_id: chat_id.clone(),
            message_id: message.id.clone(),
            inbound: false,
        });
        Ok(message)
    }

    /// Append a message from another participant and count it unread.
    ///
    /// This is the path simulated messages take.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), with `InvalidState` when the sender is
    /// the session user.
    pub fn deliver_inbound(
        &mut self,
        chat_id: &ChatId,
        sender_id: &UserId,
        body: &str,
    ) -> Result<Message, EngineError> {
        if self.require_user()? == *sender_id {
            return Err(EngineError::invalid("inbound messages come from other participants"));
        }
        let label = self.now_label();
        let message =
            operations::deliver_inbound(&mut self.conversations, chat_id, sender_id, body, label)?.clone();
        self.push(EngineEvent::MessageAppended {
            chat_id: chat_id.clone(),
            message_id: message.id.clone(),
            inbound: true,
        });
        Ok(message)
    }

    /// Send a status line such as `"[Be right back]"`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), with `InvalidState` for a blank label.
    pub fn send_quick_status(
        &mut self,
        chat_id: &ChatId,
        sender_id: &UserId,
        label: &str,
    ) -> Result<Message, EngineError> {
        self.require_user()?;
        let created_at = self.now_label();
        let message =
            operations::send_quick_status(&mut self.conversations, chat_id, sender_id, label, created_at)?
                .clone();
        self.push(EngineEvent::MessageAppended {
            chat_id: chat_id.clone(),
            message_id: message.id.clone(),
            inbound: false,
        });
        Ok(message)
    }

    /// Toggle `actor_id`'s `emoji` reaction on a message.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `NotFound` if the chat or message does not exist
    /// - `InvalidState` for a blank emoji
    pub fn toggle_reaction(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        emoji: &str,
        actor_id: &UserId,
    ) -> Result<ReactionChange, EngineError> {
        self.require_user()?;
        let change = operations::toggle_reaction(&mut self.conversations, chat_id, message_id, emoji, actor_id)?;
        if change != ReactionChange::Unchanged {
            self.push(EngineEvent::ReactionChanged {
                chat_id: chat_id.clone(),
                message_id: message_id.clone(),
                emoji: emoji.to_owned(),
                change,
            });
        }
        Ok(change)
    }

    /// Tombstone a message. Returns false if it was already deleted.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `NotFound` if the chat or message does not exist
    pub fn soft_delete(&mut self, chat_id: &ChatId, message_id: &MessageId) -> Result<bool, EngineError> {
        self.require_user()?;
        let deleted = operations::soft_delete(&mut self.conversations, chat_id, message_id)?;
        if deleted {
            self.push(EngineEvent::MessageDeleted { chat_id: chat_id.clone(), message_id: message_id.clone() });
        }
        Ok(deleted)
    }

    /// Mark every message in a chat read and reset its unread count.
    ///
    /// Returns how many messages flipped to read.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `NotFound` if the chat does not exist
    pub fn mark_all_read(&mut self, chat_id: &ChatId) -> Result<usize, EngineError> {
        self.require_user()?;
        let flipped = operations::mark_all_read(&mut self.conversations, chat_id)?;
        self.push(EngineEvent::ChatRead { chat_id: chat_id.clone() });
        Ok(flipped)
    }

    // Chats

    /// Direct chat between `a` and `b`, created if none exists.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `InvalidState` if `a == b`
    /// - `NotFound` if either user is unknown
    pub fn create_direct(&mut self, a: &UserId, b: &UserId) -> Result<ChatId, EngineError> {
        self.require_user()?;
        if a == b {
            return Err(EngineError::invalid("direct chat needs two distinct users"));
        }
        for user in [a, b] {
            if !self.identity.contains(user) {
                return Err(EngineError::not_found(EntityKind::User, user));
            }
        }

        let before = self.conversations.list_chats().len();
        let chat_id = self.conversations.create_direct(a.clone(), b.clone()).id.clone();
        if self.conversations.list_chats().len() > before {
            self.push(EngineEvent::ChatCreated { chat_id: chat_id.clone() });
        }
        Ok(chat_id)
    }

    /// Open the session user's direct chat with `user_id`, creating it if
    /// needed, and select it.
    ///
    /// # Errors
    ///
    /// Same as [`create_direct`](Self::create_direct).
    pub fn open_direct(&mut self, user_id: &UserId) -> Result<ChatId, EngineError> {
        let me = self.require_user()?;
        let chat_id = self.create_direct(&me, user_id)?;
        self.select_chat(&chat_id)?;
        Ok(chat_id)
    }

    /// Create a group with the session user and `members`, then select it.
    ///
    /// Without an avatar, one of the stock group avatars is picked at random.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `InvalidState` for a blank name or no members besides the session user
    /// - `NotFound` if a member is unknown
    pub fn create_group(
        &mut self,
        name: &str,
        avatar: Option<String>,
        members: &[UserId],
    ) -> Result<ChatId, EngineError> {
        let me = self.require_user()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::invalid("group name is empty"));
        }
        if !members.iter().any(|m| m != &me) {
            return Err(EngineError::invalid("group needs at least one other member"));
        }
        if let Some(unknown) = members.iter().find(|m| !self.identity.contains(m)) {
            return Err(EngineError::not_found(EntityKind::User, unknown));
        }

        let avatar = avatar.unwrap_or_else(|| {
            let pick = self.env.random_index(GROUP_AVATAR_COUNT) + 1;
            format!("https://randomuser.me/api/portraits/lego/{pick}.jpg")
        });
        let mut participants = members.to_vec();
        participants.push(me);

        let chat_id = self.conversations.create_group(name.to_owned(), avatar, participants).id.clone();
        self.push(EngineEvent::ChatCreated { chat_id: chat_id.clone() });
        self.select_chat(&chat_id)?;
        Ok(chat_id)
    }

    /// Remove a chat entirely.
    ///
    /// Deleting the selected chat clears the selection and cancels the
    /// simulator.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `NotFound` if the chat does not exist
    pub fn delete_chat(&mut self, chat_id: &ChatId) -> Result<(), EngineError> {
        self.require_user()?;
        let was_selected = self.conversations.selected() == Some(chat_id);
        if was_selected {
            self.stop_simulation();
        }

        self.conversations
            .delete_chat(chat_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Chat, chat_id))?;

        tracing::debug!(chat = %chat_id, "Deleted chat");
        self.push(EngineEvent::ChatDeleted { chat_id: chat_id.clone() });
        if was_selected {
            self.push(EngineEvent::ChatSelected { chat_id: None });
        }
        Ok(())
    }

    // Contacts

    /// Flag or unflag a user as a contact.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `NotFound` if the user is unknown
    pub fn set_contact(&mut self, user_id: &UserId, is_contact: bool) -> Result<(), EngineError> {
        self.require_user()?;
        if !self.identity.set_contact(user_id, is_contact) {
            return Err(EngineError::not_found(EntityKind::User, user_id));
        }
        self.push(EngineEvent::ContactChanged { user_id: user_id.clone() });
        Ok(())
    }

    /// Create a new contact.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a session
    /// - `InvalidState` for a blank display name
    pub fn create_contact(&mut self, mut draft: UserDraft) -> Result<UserId, EngineError> {
        self.require_user()?;
        draft.display_name = draft.display_name.trim().to_owned();
        if draft.display_name.is_empty() {
            return Err(EngineError::invalid("contact name is empty"));
        }

        let user_id = self.identity.create(draft).id.clone();
        tracing::debug!(user = %user_id, "Created contact");
        self.push(EngineEvent::ContactChanged { user_id: user_id.clone() });
        Ok(user_id)
    }

    // Time

    /// Fire everything due at the current time.
    pub fn tick(&mut self) {
        let now = self.env.now();

        if let Some(until) = self.composing_until
            && now >= until
        {
            self.composing_until = None;
            self.push(EngineEvent::ComposingChanged { typing: false });
        }

        let actions = self.presence.handle_tick(now, &self.env);
        self.apply_presence(actions);
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    /// `None` if nothing is scheduled.
    pub fn next_deadline(&self) -> Option<E::Instant> {
        match (self.presence.next_deadline(), self.composing_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply simulator actions.
    ///
    /// Raising a flag or delivering a message is only allowed for the
    /// selected chat. Clearing a typing flag is always allowed.
    fn apply_presence(&mut self, actions: Vec<PresenceAction>) {
        for action in actions {
            let active = self.conversations.selected() == Some(action.chat_id());
            match action {
                PresenceAction::SetTyping { chat_id, user_id, typing } => {
                    if typing && !active {
                        tracing::debug!(chat = %chat_id, "Dropped typing flag for inactive chat");
                        continue;
                    }
                    if self.identity.set_typing(&user_id, typing) {
                        self.push(EngineEvent::TypingChanged { chat_id, user_id, typing });
                    }
                },
                PresenceAction::DeliverInbound { chat_id, sender_id, body } => {
                    if !active {
                        tracing::debug!(chat = %chat_id, "Dropped inbound message for inactive chat");
                        continue;
                    }
                    let label = self.now_label();
                    match operations::deliver_inbound(&mut self.conversations, &chat_id, &sender_id, &body, label)
                    {
                        Ok(message) => {
                            let message_id = message.id.clone();
                            tracing::debug!(chat = %chat_id, message = %message_id, "Simulated inbound message");
                            self.push(EngineEvent::MessageAppended { chat_id, message_id, inbound: true });
                        },
                        Err(error) => tracing::warn!(%error, "Dropped simulated message"),
                    }
                },
            }
        }
    }

    // Queries

    /// Drain pending events.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Search message bodies across every chat. See [`search::search_all`].
    pub fn search_all(&self, term: &str) -> Option<Vec<SearchHit>> {
        search::search_all(&self.conversations, term)
    }

    /// Users listed under `view`. See [`directory::filter_users`].
    pub fn filter_users(&self, term: &str, view: DirectoryView) -> Vec<&User> {
        directory::filter_users(&self.identity, self.session.user_id(), term, view)
    }

    /// Chats listed under `view`. See [`directory::filter_chats`].
    pub fn filter_chats(&self, term: &str, view: DirectoryView) -> Vec<&Chat> {
        directory::filter_chats(&self.conversations, &self.identity, self.session.user_id(), term, view)
    }

    /// Current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Logged-in user id. `None` if anonymous.
    pub fn current_user_id(&self) -> Option<&UserId> {
        self.session.user_id()
    }

    /// All chats in creation order.
    pub fn chats(&self) -> &[Chat] {
        self.conversations.list_chats()
    }

    /// Look up a chat.
    pub fn find_chat(&self, chat_id: &ChatId) -> Option<&Chat> {
        self.conversations.find_chat(chat_id)
    }

    /// Currently selected chat.
    pub fn selected_chat(&self) -> Option<&Chat> {
        self.conversations.selected_chat()
    }

    /// Look up a user.
    pub fn find_user(&self, user_id: &UserId) -> Option<&User> {
        self.identity.find_by_id(user_id)
    }

    /// All users in insertion order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.identity.users()
    }

    /// The identity store.
    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    /// The conversation store.
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// The presence simulator.
    pub fn presence(&self) -> &PresenceSimulator<E::Instant> {
        &self.presence
    }

    /// Whether the local composer typing indicator is raised.
    pub fn is_composing(&self) -> bool {
        self.composing_until.is_some()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }
}
