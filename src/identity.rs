use core::fmt;

/// A concrete external chat identifier: either the numeric id of a
/// persistent chat or the opaque instance string attached to inline
/// contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatIdKind {
    Id(i64),
    Instance(String),
}

impl ChatIdKind {
    /// Textual form bound into lookup queries; numeric ids are cast back to
    /// bigint on the server side.
    pub fn value(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Instance(inst) => inst.clone(),
        }
    }

    /// The chats-table column this identifier matches.
    pub(crate) fn sql_column(&self) -> &'static str {
        match self {
            Self::Id(_) => "chat_id",
            Self::Instance(_) => "chat_instance",
        }
    }

    /// SQL type of that column, for casting the bound text value.
    pub(crate) fn sql_type(&self) -> &'static str {
        match self {
            Self::Id(_) => "bigint",
            Self::Instance(_) => "text",
        }
    }
}

impl From<i64> for ChatIdKind {
    fn from(chat_id: i64) -> Self {
        Self::Id(chat_id)
    }
}

impl fmt::Display for ChatIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Instance(inst) => write!(f, "inst:{inst}"),
        }
    }
}

/// Where an ambiguous reference came from. Persistent chats keep a stable
/// numeric id; inline contexts only guarantee the instance string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIdSource {
    Database,
    InlineQuery,
}

/// An unresolved reference to a chat. Either the caller already knows a
/// concrete identifier, or it carries both candidates plus their origin and
/// leaves the choice to the resolution rule.
#[derive(Debug, Clone)]
pub enum ChatIdPartiality {
    Specific(ChatIdKind),
    Both {
        chat_id: i64,
        chat_instance: String,
        source: ChatIdSource,
    },
}

impl ChatIdPartiality {
    pub fn from_chat_id(chat_id: i64) -> Self {
        Self::Specific(ChatIdKind::Id(chat_id))
    }

    pub fn from_instance(chat_instance: impl Into<String>) -> Self {
        Self::Specific(ChatIdKind::Instance(chat_instance.into()))
    }

    /// Resolves the reference to one concrete identifier. With merging
    /// enabled the numeric id always wins; without it the instance string is
    /// preferred only for inline sources.
    pub fn kind(&self, chats_merging: bool) -> ChatIdKind {
        match self {
            Self::Specific(kind) => kind.clone(),
            Self::Both {
                chat_id,
                chat_instance,
                source,
            } => {
                if !chats_merging && *source == ChatIdSource::InlineQuery {
                    ChatIdKind::Instance(chat_instance.clone())
                } else {
                    ChatIdKind::Id(*chat_id)
                }
            }
        }
    }

    /// Column values for the chats-table upsert. Both fields are populated
    /// only when merging is enabled, which is what makes a two-row match
    /// (and thus a merge) possible at all.
    pub(crate) fn columns(&self, chats_merging: bool) -> (Option<i64>, Option<String>) {
        match self {
            Self::Specific(ChatIdKind::Id(id)) => (Some(*id), None),
            Self::Specific(ChatIdKind::Instance(inst)) => (None, Some(inst.clone())),
            Self::Both {
                chat_id,
                chat_instance,
                source,
            } => {
                if chats_merging {
                    (Some(*chat_id), Some(chat_instance.clone()))
                } else if *source == ChatIdSource::InlineQuery {
                    (None, Some(chat_instance.clone()))
                } else {
                    (Some(*chat_id), None)
                }
            }
        }
    }
}

impl fmt::Display for ChatIdPartiality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific(kind) => write!(f, "{kind}"),
            Self::Both {
                chat_id,
                chat_instance,
                ..
            } => write!(f, "id:{chat_id}+inst:{chat_instance}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn both(source: ChatIdSource) -> ChatIdPartiality {
        ChatIdPartiality::Both {
            chat_id: 100,
            chat_instance: "abc".to_owned(),
            source,
        }
    }

    #[test]
    fn specific_reference_is_used_directly() {
        let by_id = ChatIdPartiality::from_chat_id(42);
        assert_eq!(by_id.kind(true), ChatIdKind::Id(42));
        assert_eq!(by_id.kind(false), ChatIdKind::Id(42));

        let by_inst = ChatIdPartiality::from_instance("xyz");
        assert_eq!(by_inst.kind(true), ChatIdKind::Instance("xyz".to_owned()));
        assert_eq!(by_inst.kind(false), ChatIdKind::Instance("xyz".to_owned()));
    }

    #[test]
    fn merging_prefers_numeric_id() {
        assert_eq!(both(ChatIdSource::Database).kind(true), ChatIdKind::Id(100));
        assert_eq!(
            both(ChatIdSource::InlineQuery).kind(true),
            ChatIdKind::Id(100)
        );
    }

    #[test]
    fn without_merging_inline_prefers_instance() {
        assert_eq!(
            both(ChatIdSource::Database).kind(false),
            ChatIdKind::Id(100)
        );
        assert_eq!(
            both(ChatIdSource::InlineQuery).kind(false),
            ChatIdKind::Instance("abc".to_owned())
        );
    }

    #[test]
    fn columns_follow_the_resolution_rule() {
        assert_eq!(
            both(ChatIdSource::Database).columns(true),
            (Some(100), Some("abc".to_owned()))
        );
        assert_eq!(
            both(ChatIdSource::Database).columns(false),
            (Some(100), None)
        );
        assert_eq!(
            both(ChatIdSource::InlineQuery).columns(false),
            (None, Some("abc".to_owned()))
        );
        assert_eq!(
            ChatIdPartiality::from_instance("xyz").columns(true),
            (None, Some("xyz".to_owned()))
        );
    }
}
