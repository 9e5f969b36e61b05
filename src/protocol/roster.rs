//! Roster message composition

/// Marker every roster broadcast starts with.
pub const ROSTER_PREFIX: &str = "Lista_clientes:";

/// Builds the roster payload: the marker, then one name per line.
///
/// Returns `None` for an empty roster; nothing is announced in that case.
pub fn compose_roster<S: AsRef<str>>(names: &[S]) -> Option<String> {
    if names.is_empty() {
        return None;
    }

    let mut roster = String::from(ROSTER_PREFIX);
    for name in names {
        roster.push('\n');
        roster.push_str(name.as_ref());
    }
    Some(roster)
}

/// Returns true if `message` is a roster broadcast rather than a chat line.
pub fn is_roster(message: &str) -> bool {
    message.starts_with(ROSTER_PREFIX)
}

/// Extracts the names from a roster payload, in announced order.
pub fn parse_roster(message: &str) -> Option<Vec<&str>> {
    let body = message.strip_prefix(ROSTER_PREFIX)?;
    Some(body.lines().filter(|line| !line.is_empty()).collect())
}
