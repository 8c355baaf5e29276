//! Text rendering for the `/status` reply and online notifications.

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;

use crate::presence::Presence;
use crate::state::StatusSnapshot;

pub const STATUS_HEADER: &str = "♟ Player Status:";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Render an epoch timestamp in `tz`, e.g. `2023-11-15 03:43:20 IST`.
///
/// Absent or zero timestamps render as `Unknown`.
pub fn format_last_seen(last_seen: Option<i64>, tz: &Tz) -> String {
    let Some(ts) = last_seen.filter(|&ts| ts != 0) else {
        return "Unknown".to_string();
    };
    match Utc.timestamp_opt(ts, 0).single() {
        Some(utc) => utc.with_timezone(tz).format(TIME_FORMAT).to_string(),
        None => "Invalid Time".to_string(),
    }
}

/// One line per directory entry, in directory order.
///
/// Names missing from the snapshot still get a line with placeholders.
pub fn status_lines(directory: &[String], snapshot: &StatusSnapshot, tz: &Tz) -> Vec<String> {
    directory
        .iter()
        .map(|name| {
            let (status, last_seen) = snapshot
                .get(name)
                .map(|u| (u.status, u.last_seen))
                .unwrap_or((Presence::Unknown, None));
            format!(
                "• {name}: {} (Last Online: {})",
                status.as_str().to_uppercase(),
                format_last_seen(last_seen, tz)
            )
        })
        .collect()
}

/// The full `/status` reply.
pub fn render_status(directory: &[String], snapshot: &StatusSnapshot, tz: &Tz) -> String {
    let mut lines = Vec::with_capacity(directory.len() + 1);
    lines.push(STATUS_HEADER.to_string());
    lines.extend(status_lines(directory, snapshot, tz));
    lines.join("\n")
}

/// Message sent when a player comes online.
pub fn online_notification(username: &str, last_seen: Option<i64>, tz: &Tz) -> String {
    format!(
        "♟ {username} is now ONLINE\nLast Online: {}",
        format_last_seen(last_seen, tz)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TrackedUser;

    const IST: Tz = chrono_tz::Asia::Kolkata;

    fn snapshot(users: Vec<TrackedUser>) -> StatusSnapshot {
        StatusSnapshot { users }
    }

    fn user(name: &str, status: Presence, last_seen: Option<i64>) -> TrackedUser {
        TrackedUser {
            username: name.into(),
            id: Some(format!("id-{name}")),
            last_seen,
            status,
        }
    }

    #[test]
    fn test_format_last_seen_placeholders() {
        assert_eq!(format_last_seen(None, &IST), "Unknown");
        assert_eq!(format_last_seen(Some(0), &IST), "Unknown");
        assert_eq!(format_last_seen(Some(i64::MAX), &IST), "Invalid Time");
    }

    #[test]
    fn test_format_last_seen_ist() {
        // 2023-11-14 22:13:20 UTC
        assert_eq!(
            format_last_seen(Some(1_700_000_000), &IST),
            "2023-11-15 03:43:20 IST"
        );
        // Same input, same bytes.
        assert_eq!(
            format_last_seen(Some(1_700_000_000), &IST),
            format_last_seen(Some(1_700_000_000), &IST)
        );
    }

    #[test]
    fn test_format_last_seen_other_zone() {
        assert_eq!(
            format_last_seen(Some(1_700_000_000), &chrono_tz::UTC),
            "2023-11-14 22:13:20 UTC"
        );
    }

    #[test]
    fn test_empty_snapshot_renders_every_name() {
        let directory = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
        let lines = status_lines(&directory, &snapshot(vec![]), &IST);
        assert_eq!(
            lines,
            vec![
                "• alice: UNKNOWN (Last Online: Unknown)",
                "• bob: UNKNOWN (Last Online: Unknown)",
                "• carol: UNKNOWN (Last Online: Unknown)",
            ]
        );
    }

    #[test]
    fn test_lines_follow_directory_order() {
        let directory = vec!["bob".to_string(), "alice".to_string()];
        let snap = snapshot(vec![
            user("alice", Presence::Online, Some(1_700_000_000)),
            user("bob", Presence::Offline, None),
        ]);
        let lines = status_lines(&directory, &snap, &IST);
        assert_eq!(lines[0], "• bob: OFFLINE (Last Online: Unknown)");
        assert_eq!(
            lines[1],
            "• alice: ONLINE (Last Online: 2023-11-15 03:43:20 IST)"
        );
    }

    #[test]
    fn test_render_status_has_header() {
        let directory = vec!["alice".to_string()];
        let text = render_status(&directory, &snapshot(vec![]), &IST);
        assert_eq!(
            text,
            "♟ Player Status:\n• alice: UNKNOWN (Last Online: Unknown)"
        );
    }

    #[test]
    fn test_online_notification() {
        assert_eq!(
            online_notification("alice", Some(1_700_000_000), &IST),
            "♟ alice is now ONLINE\nLast Online: 2023-11-15 03:43:20 IST"
        );
        assert_eq!(
            online_notification("bob", None, &IST),
            "♟ bob is now ONLINE\nLast Online: Unknown"
        );
    }
}
