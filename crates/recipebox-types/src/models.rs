use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a stored or submitted string is not one of an enum's values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}', expected one of: {allowed}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub allowed: String,
}

/// Declares a closed string enum that round-trips through its exact wire name,
/// both in JSON and in SQLite text columns.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                        allowed: [$($text),+].join(", "),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Account role. Admins manage recipes, users and the message inbox.
    Role, "role" {
        User => "user",
        Admin => "admin",
    }
}

string_enum! {
    Difficulty, "difficulty" {
        Easy => "Easy",
        Medium => "Medium",
        Hard => "Hard",
    }
}

string_enum! {
    Category, "category" {
        Breakfast => "Breakfast",
        Lunch => "Lunch",
        Dinner => "Dinner",
        Dessert => "Dessert",
        Snack => "Snack",
        Vegetarian => "Vegetarian",
        Vegan => "Vegan",
        Quick => "Quick",
    }
}

string_enum! {
    /// What a user is writing to the admins about.
    MessageKind, "message type" {
        Suggestion => "suggestion",
        Feedback => "feedback",
        Review => "review",
        Question => "question",
    }
}

string_enum! {
    /// Inbox lifecycle: `pending -> read -> replied -> archived`, with
    /// `pending -> archived` allowed directly. Admins may set any status at
    /// any time through the status endpoint; only the reply action attaches
    /// reply content.
    MessageStatus, "message status" {
        Pending => "pending",
        Read => "read",
        Replied => "replied",
        Archived => "archived",
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Dinner
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Suggestion
    }
}

impl Default for MessageStatus {
    fn default() -> Self {
        MessageStatus::Pending
    }
}
