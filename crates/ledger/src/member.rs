//! Group participants.
//!
//! A participant is either a registered user or an external member tracked
//! by name only. The two variants have separate id spaces, so identity is
//! always the pair (variant, id), captured by [`MemberKey`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a member inside a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MemberKey {
    Registered(i64),
    External(i64),
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered(id) => write!(f, "registered:{id}"),
            Self::External(id) => write!(f, "external:{id}"),
        }
    }
}

/// A participant with an account in the system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredMember {
    pub id: i64,
    pub display_name: String,
    pub phone: String,
}

/// A participant with no account, known only by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalMember {
    pub id: i64,
    pub display_name: String,
}

/// Borrowed view over either kind of member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Member<'a> {
    Registered(&'a RegisteredMember),
    External(&'a ExternalMember),
}

impl Member<'_> {
    pub fn key(&self) -> MemberKey {
        match self {
            Member::Registered(member) => MemberKey::Registered(member.id),
            Member::External(member) => MemberKey::External(member.id),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Member::Registered(member) => &member.display_name,
            Member::External(member) => &member.display_name,
        }
    }
}

impl RegisteredMember {
    pub fn key(&self) -> MemberKey {
        MemberKey::Registered(self.id)
    }
}

impl ExternalMember {
    pub fn key(&self) -> MemberKey {
        MemberKey::External(self.id)
    }
}
