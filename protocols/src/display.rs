//! Operator-facing formatting helpers.

/// Title-case a backend status label: `in_progress` -> `In Progress`.
/// A missing label renders as `Ready`, the state of a freshly issued ticket.
pub fn format_status(status: Option<&str>) -> String {
    let Some(status) = status.filter(|s| !s.is_empty()) else {
        return "Ready".to_string();
    };

    status
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a call duration: `45s`, `2m 5s`, `1h 3m`; `N/A` when unknown or zero.
pub fn format_duration(duration_ms: Option<u64>) -> String {
    let Some(ms) = duration_ms.filter(|ms| *ms > 0) else {
        return "N/A".to_string();
    };

    let secs = (ms + 500) / 1000;
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(format_status(Some("in_progress")), "In Progress");
        assert_eq!(format_status(Some("registered")), "Registered");
        assert_eq!(format_status(Some("")), "Ready");
        assert_eq!(format_status(None), "Ready");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(None), "N/A");
        assert_eq!(format_duration(Some(0)), "N/A");
        assert_eq!(format_duration(Some(45_200)), "45s");
        assert_eq!(format_duration(Some(125_000)), "2m 5s");
        assert_eq!(format_duration(Some(3_780_000)), "1h 3m");
    }
}
