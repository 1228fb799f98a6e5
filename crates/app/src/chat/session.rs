//! Session-list state helpers shared by the sidebar and the turn worker.

use std::cmp::Ordering;

use sehat_cloud::{ChatSessionRecord, PLACEHOLDER_SESSION_TITLE};

/// Number of characters of the first message carried into the session title.
pub const SESSION_TITLE_MAX_CHARS: usize = 30;

/// Derives a session title from the first message of a consultation.
/// Longer messages are cut at [`SESSION_TITLE_MAX_CHARS`] characters with a
/// trailing ellipsis.
pub fn derive_session_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    let mut title: String = trimmed.chars().take(SESSION_TITLE_MAX_CHARS).collect();
    if trimmed.chars().count() > SESSION_TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// True while a session still carries the placeholder title, i.e. before its
/// first message.
pub fn needs_title(session: &ChatSessionRecord) -> bool {
    session.title.trim().is_empty() || session.title == PLACEHOLDER_SESSION_TITLE
}

/// Newest-first ordering for the sidebar, ties broken by id so repeated
/// refreshes stay deterministic.
pub fn sort_sessions_newest_first(sessions: &mut [ChatSessionRecord]) {
    sessions.sort_by(compare_by_recent_desc);
}

fn compare_by_recent_desc(left: &ChatSessionRecord, right: &ChatSessionRecord) -> Ordering {
    right
        .updated_at_unix_ms
        .cmp(&left.updated_at_unix_ms)
        .then_with(|| right.id.as_str().cmp(left.id.as_str()))
}

#[cfg(test)]
mod tests {
    use sehat_cloud::{SessionId, UserId};

    use super::*;

    fn session(id: &str, title: &str, updated_at_unix_ms: i64) -> ChatSessionRecord {
        ChatSessionRecord {
            id: SessionId::new(id),
            user_id: UserId::new("u-1"),
            title: title.to_string(),
            last_message: String::new(),
            updated_at_unix_ms,
        }
    }

    #[test]
    fn short_first_messages_become_the_title_verbatim() {
        assert_eq!(derive_session_title("Apa itu diabetes?"), "Apa itu diabetes?");
    }

    #[test]
    fn exactly_thirty_characters_gets_no_ellipsis() {
        let message = "a".repeat(SESSION_TITLE_MAX_CHARS);
        assert_eq!(derive_session_title(&message), message);
    }

    #[test]
    fn longer_messages_are_cut_with_an_ellipsis() {
        let message = "a".repeat(SESSION_TITLE_MAX_CHARS + 1);
        let title = derive_session_title(&message);
        assert_eq!(title.chars().count(), SESSION_TITLE_MAX_CHARS + 3);
        assert!(title.ends_with("..."));
        assert!(title.starts_with(&"a".repeat(SESSION_TITLE_MAX_CHARS)));
    }

    #[test]
    fn surrounding_whitespace_is_not_counted() {
        assert_eq!(derive_session_title("  halo dokter  "), "halo dokter");
    }

    #[test]
    fn placeholder_and_blank_titles_need_retitling() {
        assert!(needs_title(&session("s-1", "New Chat", 0)));
        assert!(needs_title(&session("s-2", "  ", 0)));
        assert!(!needs_title(&session("s-3", "Apa itu diabetes?", 0)));
    }

    #[test]
    fn sessions_sort_newest_first_with_id_tiebreak() {
        let mut sessions = vec![
            session("s-1", "a", 100),
            session("s-2", "b", 300),
            session("s-3", "c", 300),
        ];

        sort_sessions_newest_first(&mut sessions);

        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s-3", "s-2", "s-1"]);
    }
}
