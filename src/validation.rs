//! Sanitization for player-facing strings.
//!
//! Player names arrive from the chat platform and are attacker-controlled.
//! They are sanitized once, up front, before they reach the wire, the local
//! score store, or a log line.

/// Maximum characters kept in a sanitized player name.
pub const MAX_NAME_LEN: usize = 64;

/// Fallback display name when sanitization leaves nothing.
pub const DEFAULT_NAME: &str = "Player";

/// Sanitize a player display name:
/// - control characters are dropped
/// - all whitespace becomes a single space, runs collapsed
/// - the result is trimmed and capped at [`MAX_NAME_LEN`] characters
///
/// Empty or all-control input falls back to [`DEFAULT_NAME`].
pub fn sanitize_player_name(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len().min(MAX_NAME_LEN * 4));
    let mut kept = 0usize;
    let mut last_was_space = false;
    for ch in raw.chars() {
        if kept >= MAX_NAME_LEN {
            break;
        }
        if ch.is_control() {
            continue;
        }
        if ch.is_whitespace() {
            if last_was_space {
                continue;
            }
            cleaned.push(' ');
            last_was_space = true;
        } else {
            cleaned.push(ch);
            last_was_space = false;
        }
        kept += 1;
    }
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether a user id identifies a real platform account. Zero is the
/// anonymous placeholder used when the web view provides no identity.
pub fn is_registered_user(user_id: i64) -> bool {
    user_id > 0
}
