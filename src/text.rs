use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

/// Timezone all user-facing date text is rendered in.
pub const DISPLAY_TZ: Tz = chrono_tz::Pacific::Auckland;

/// Reserved token separating the selected options of a multi-select
/// answer in its stored string form. Must never appear in option text.
pub const OPTION_DELIMITER: &str = "<OPTION>";

/// Joins a multi-select answer into its stored string form.
pub fn join_answer(options: &[String]) -> String {
    options.join(OPTION_DELIMITER)
}

/// Splits a stored multi-select answer back into the selected options.
pub fn split_answer(answer: &str) -> Vec<String> {
    answer.split(OPTION_DELIMITER).map(str::to_string).collect()
}

/// Converts an enum member name to display text,
/// e.g. "NOT_STARTED" -> "Not started".
pub fn enum_name_to_text(name: &str) -> String {
    let lowered = name.replace('_', " ").to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => lowered,
    }
}

/// Converts display text back to an enum member name,
/// e.g. "Operations on numbers" -> "OPERATIONS_ON_NUMBERS".
pub fn text_to_enum_name(text: &str) -> String {
    text.replace(' ', "_").to_uppercase()
}

/// Attribution line shown under a question, keyed by its source.
pub fn attribution(source: &str) -> String {
    match source {
        "nzqa" => concat!(
            "This question is sourced from past NCEA Numeracy papers published by the ",
            "New Zealand Qualifications Authority (NZQA). Licensed under ",
            "<a href='https://creativecommons.org/licenses/by/3.0/nz/' style='color: #007ACC;'>",
            "Creative Commons Attribution 3.0 New Zealand</a>."
        )
        .to_string(),
        _ => String::new(),
    }
}

/// Due date line on the student dashboard, e.g. "2026-03-14 17:30".
pub fn format_due_date(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&DISPLAY_TZ).format("%Y-%m-%d %H:%M").to_string()
}

/// Compact date label for chart axes, e.g. "03/14".
pub fn format_chart_date(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&DISPLAY_TZ).format("%m/%d").to_string()
}

/// Compact date-time label, e.g. "03/14 17:30".
pub fn format_short_datetime(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&DISPLAY_TZ).format("%m/%d %H:%M").to_string()
}

/// Date-time text that drops the year for dates in the current year.
pub fn format_datetime(instant: DateTime<Utc>) -> String {
    let local = instant.with_timezone(&DISPLAY_TZ);
    if local.year() == Utc::now().with_timezone(&DISPLAY_TZ).year() {
        local.format("%m/%d %H:%M").to_string()
    } else {
        local.format("%Y/%m/%d %H:%M").to_string()
    }
}

/// Title for the n-th sub-question of a question: "Question A", "Question B", ...
pub fn question_letter_title(index: usize) -> String {
    let letter = char::from(b'A' + (index % 26) as u8);
    format!("Question {letter}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_answer_delimiter_round_trip() {
        let selected = vec!["A".to_string(), "C".to_string()];
        let joined = join_answer(&selected);
        assert_eq!(joined, "A<OPTION>C");
        assert_eq!(split_answer(&joined), selected);
    }

    #[test]
    fn test_single_option_round_trip() {
        let selected = vec!["B".to_string()];
        assert_eq!(split_answer(&join_answer(&selected)), selected);
    }

    #[test]
    fn test_enum_name_to_text() {
        assert_eq!(enum_name_to_text("NOT_STARTED"), "Not started");
        assert_eq!(enum_name_to_text("OPERATIONS_ON_NUMBERS"), "Operations on numbers");
        assert_eq!(enum_name_to_text("APPLY"), "Apply");
    }

    #[test]
    fn test_text_to_enum_name() {
        assert_eq!(text_to_enum_name("Operations on numbers"), "OPERATIONS_ON_NUMBERS");
        assert_eq!(text_to_enum_name("Apply"), "APPLY");
    }

    #[test]
    fn test_attribution_known_source() {
        assert!(attribution("nzqa").contains("NZQA"));
        assert_eq!(attribution("unknown"), "");
    }

    #[test]
    fn test_due_date_renders_in_display_timezone() {
        // 2026-01-14 00:30 UTC is 13:30 the same day in Auckland (NZDT, +13).
        let instant = Utc.with_ymd_and_hms(2026, 1, 14, 0, 30, 0).unwrap();
        assert_eq!(format_due_date(instant), "2026-01-14 13:30");
        assert_eq!(format_chart_date(instant), "01/14");
    }

    #[test]
    fn test_question_letter_titles() {
        assert_eq!(question_letter_title(0), "Question A");
        assert_eq!(question_letter_title(2), "Question C");
    }
}
