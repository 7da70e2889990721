//! Seed data the engine starts from.

use crate::{
    conversation::Chat,
    identity::{ContactInfo, Presence, User},
    ids::{ChatId, UserId},
    message::{Message, Reactions},
};

/// Reactions offered by the message picker.
pub const REACTION_PALETTE: [&str; 6] = ["👍", "❤️", "😂", "😮", "😢", "👏"];

/// Initial users and chats.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Known users
    pub users: Vec<User>,
    /// Chats with their seeded logs
    pub chats: Vec<Chat>,
}

struct Person {
    id: &'static str,
    name: &'static str,
    avatar: &'static str,
    presence: Presence,
    last_active: Option<&'static str>,
    email: &'static str,
    phone: &'static str,
    location: &'static str,
    is_contact: bool,
}

const PEOPLE: [Person; 8] = [
    Person {
        id: "1",
        name: "Emma Wilson",
        avatar: "https://randomuser.me/api/portraits/women/32.jpg",
        presence: Presence::Online,
        last_active: None,
        email: "emma.wilson@example.com",
        phone: "+1 (555) 123-4567",
        location: "New York, NY",
        is_contact: true,
    },
    Person {
        id: "2",
        name: "James Rodriguez",
        avatar: "https://randomuser.me/api/portraits/men/42.jpg",
        presence: Presence::Busy,
        last_active: None,
        email: "james.rodriguez@example.com",
        phone: "+1 (555) 987-6543",
        location: "Los Angeles, CA",
        is_contact: true,
    },
    Person {
        id: "3",
        name: "Sophia Chen",
        avatar: "https://randomuser.me/api/portraits/women/44.jpg",
        presence: Presence::Away,
        last_active: Some("10m ago"),
        email: "sophia.chen@example.com",
        phone: "+1 (555) 234-5678",
        location: "Chicago, IL",
        is_contact: true,
    },
    Person {
        id: "4",
        name: "Liam Johnson",
        avatar: "https://randomuser.me/api/portraits/men/32.jpg",
        presence: Presence::Online,
        last_active: None,
        email: "liam.johnson@example.com",
        phone: "+1 (555) 345-6789",
        location: "Miami, FL",
        is_contact: false,
    },
    Person {
        id: "5",
        name: "Olivia Davis",
        avatar: "https://randomuser.me/api/portraits/women/24.jpg",
        presence: Presence::Offline,
        last_active: Some("3h ago"),
        email: "olivia.davis@example.com",
        phone: "+1 (555) 456-7890",
        location: "Seattle, WA",
        is_contact: false,
    },
    Person {
        id: "6",
        name: "Noah Smith",
        avatar: "https://randomuser.me/api/portraits/men/54.jpg",
        presence: Presence::Online,
        last_active: None,
        email: "noah.smith@example.com",
        phone: "+1 (555) 567-8901",
        location: "San Francisco, CA",
        is_contact: false,
    },
    Person {
        id: "7",
        name: "Ava Brown",
        avatar: "https://randomuser.me/api/portraits/women/67.jpg",
        presence: Presence::Online,
        last_active: None,
        email: "ava.brown@example.com",
        phone: "+1 (555) 678-9012",
        location: "Austin, TX",
        is_contact: false,
    },
    Person {
        id: "8",
        name: "Ethan Miller",
        avatar: "https://randomuser.me/api/portraits/men/76.jpg",
        presence: Presence::Away,
        last_active: Some("30m ago"),
        email: "ethan.miller@example.com",
        phone: "+1 (555) 789-0123",
        location: "Denver, CO",
        is_contact: false,
    },
];

impl Person {
    fn to_user(&self) -> User {
        User {
            id: self.id.into(),
            display_name: self.name.to_owned(),
            avatar_ref: self.avatar.to_owned(),
            presence: self.presence,
            last_active: self.last_active.map(str::to_owned),
            is_typing: false,
            contact: ContactInfo {
                email: Some(self.email.to_owned()),
                phone: Some(self.phone.to_owned()),
                location: Some(self.location.to_owned()),
            },
            is_contact: self.is_contact,
        }
    }
}

/// Builds seeded logs with a running sequence number.
struct LogBuilder {
    sequence: u64,
}

impl LogBuilder {
    fn message(
        &mut self,
        id: &str,
        sender: &str,
        body: &str,
        label: &str,
        reactions: &[(&str, &[&str])],
        read: bool,
    ) -> Message {
        self.sequence += 1;
        Message {
            id: id.into(),
            sender_id: sender.into(),
            body: body.to_owned(),
            created_at: label.to_owned(),
            sequence: self.sequence,
            reactions: Reactions::from_pairs(
                reactions
                    .iter()
                    .map(|(emoji, users)| ((*emoji).to_owned(), users.iter().map(|u| UserId::from(*u)))),
            ),
            read,
            deleted: false,
        }
    }
}

impl Dataset {
    /// Empty dataset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Id of the user the demo logs in as.
    pub fn demo_user_id() -> UserId {
        UserId::from("6")
    }

    /// Demo data: eight users, three direct chats and one group chat.
    ///
    /// The session user is "Noah Smith" (id `6`). `chat1` and `chat3` each
    /// start with one unread message.
    pub fn demo() -> Self {
        let users = PEOPLE.iter().map(Person::to_user).collect();
        let mut log = LogBuilder { sequence: 0 };
        let me = "6";

        let mut chat1 = Chat::direct(ChatId::from("chat1"), "1".into(), me.into());
        chat1.messages = vec![
            log.message("msg1", "1", "Hey Noah, how's your day going?", "10:30 AM", &[], true),
            log.message(
                "msg2",
                me,
                "Pretty good! Just finishing up some work. How about you?",
                "10:32 AM",
                &[("👍", &["1"])],
                true,
            ),
            log.message(
                "msg3",
                "1",
                "I'm great! Planning to go hiking this weekend. Would you like to join?",
                "10:35 AM",
                &[],
                false,
            ),
        ];
        chat1.unread_count = 1;

        let mut chat2 = Chat::direct(ChatId::from("chat2"), "2".into(), me.into());
        chat2.messages = vec![
            log.message("msg4", "2", "Did you get the files I sent?", "Yesterday", &[], true),
            log.message(
                "msg5",
                me,
                "Yes, I'm reviewing them now. Will get back to you soon!",
                "Yesterday",
                &[],
                true,
            ),
            log.message(
                "msg6",
                "2",
                "Sounds good. Let me know if you have any questions.",
                "Yesterday",
                &[],
                true,
            ),
        ];

        let mut chat3 = Chat::direct(ChatId::from("chat3"), "3".into(), me.into());
        chat3.messages = vec![
            log.message("msg7", me, "Hi Sophia, are we still meeting at 3PM?", "Yesterday", &[], true),
            log.message(
                "msg8",
                "3",
                "Yes, I'll be there! See you at the coffee shop.",
                "Yesterday",
                &[("👍", &[me])],
                true,
            ),
            log.message(
                "msg9",
                "3",
                "Actually, can we move it to 4PM? Something came up.",
                "1 hour ago",
                &[],
                false,
            ),
        ];
        chat3.unread_count = 1;

        let mut group = Chat::group(
            ChatId::from("group1"),
            "Project Alpha Team".to_owned(),
            "https://randomuser.me/api/portraits/lego/1.jpg".to_owned(),
            vec!["1".into(), "2".into(), "3".into(), me.into()],
        );
        group.messages = vec![
            log.message(
                "grp1",
                "1",
                "Hey team, just checking in on our project progress.",
                "Yesterday",
                &[("👍", &["2", "3", me])],
                true,
            ),
            log.message(
                "grp2",
                "2",
                "I've completed the design phase. Will share mockups later today.",
                "Yesterday",
                &[("🎉", &["1", me])],
                true,
            ),
            log.message(
                "grp3",
                me,
                "Great work everyone! I'll prepare the presentation for Friday's meeting.",
                "This morning",
                &[],
                true,
            ),
        ];

        Self { users, chats: vec![chat1, chat2, chat3, group] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_shape() {
        let data = Dataset::demo();

        assert_eq!(data.users.len(), 8);
        assert_eq!(data.chats.len(), 4);
        assert!(data.users.iter().any(|u| u.id == Dataset::demo_user_id() && u.display_name == "Noah Smith"));

        let unread: Vec<u32> = data.chats.iter().map(|c| c.unread_count).collect();
        assert_eq!(unread, [1, 0, 1, 0]);
    }

    #[test]
    fn demo_sequences_are_strictly_increasing() {
        let data = Dataset::demo();
        let sequences: Vec<u64> = data.chats.iter().flat_map(|c| c.messages.iter()).map(|m| m.sequence).collect();
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn demo_participants_are_known_users() {
        let data = Dataset::demo();
        for chat in &data.chats {
            for participant in &chat.participants {
                assert!(data.users.iter().any(|u| &u.id == participant), "{participant} unknown");
            }
            for message in &chat.messages {
                assert!(chat.has_participant(&message.sender_id));
            }
        }
    }
}
