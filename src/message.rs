use chrono::DateTime;
use chrono_tz::Tz;

use crate::store::{BirthdayRecord, Gender};

fn glyph(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => "👸",
        Gender::Male => "🤴",
        Gender::Unspecified => "🎂",
    }
}

fn possessive(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => "her",
        Gender::Male => "his",
        Gender::Unspecified => "their",
    }
}

fn when(days_ahead: u32) -> (String, &'static str) {
    match days_ahead {
        0 => ("Today".into(), "is"),
        1 => ("Tomorrow".into(), "will be"),
        n => (format!("In {n} days"), "will be"),
    }
}

/// Markdown reminder for `birthdays`, or `None` when there is nothing to say.
pub fn compose(username: &str, birthdays: &[BirthdayRecord], days_ahead: u32) -> Option<String> {
    if birthdays.is_empty() {
        return None;
    }

    let (time_word, verb) = when(days_ahead);
    let mut text = format!("🎉 *Birthday Reminder for {username}* 🎉\n\n");

    for person in birthdays {
        text.push_str(&format!(
            "{} *{}* - {time_word} {verb} {} birthday!\n",
            glyph(person.gender),
            person.name,
            possessive(person.gender),
        ));
    }

    match days_ahead {
        0 => text.push_str("\n🎁 *Time to celebrate!* 🥳"),
        1 => text.push_str("\n🕛 *Don't forget to wish at 12:00 AM sharp!*"),
        _ => {}
    }

    let count = birthdays.len();
    let plural = if count == 1 { "" } else { "s" };
    text.push_str(&format!("\n\n📅 Total: {count} birthday{plural}"));

    Some(text)
}

pub fn test_message(username: &str, bot_api: &str, sent_at: DateTime<Tz>) -> String {
    format!(
        "🧪 *Test Reminder for {username}*\n\n\
         This is a test message from your Birthday Reminder Service.\n\n\
         ⏰ Sent at: {}\n🤖 Bot API: {bot_api}",
        sent_at.format("%Y-%m-%d %H:%M:%S %Z"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn person(name: &str, gender: Gender) -> BirthdayRecord {
        BirthdayRecord {
            name: name.into(),
            date: "15-03".into(),
            gender,
        }
    }

    #[test]
    fn test_empty_list_has_no_message() {
        assert!(compose("Priya", &[], 0).is_none());
        assert!(compose("Priya", &[], 1).is_none());
    }

    #[test]
    fn test_single_tomorrow() {
        let text = compose("Priya", &[person("Bob", Gender::Male)], 1).unwrap();
        assert!(text.starts_with("🎉 *Birthday Reminder for Priya* 🎉\n\n"));
        assert!(text.contains("🤴 *Bob* - Tomorrow will be his birthday!\n"));
        assert!(text.contains("Don't forget to wish at 12:00 AM sharp!"));
        assert!(!text.contains("Time to celebrate"));
        assert!(text.ends_with("📅 Total: 1 birthday"));
    }

    #[test]
    fn test_many_today() {
        let people = [
            person("Amy", Gender::Female),
            person("Sam", Gender::Unspecified),
            person("Bob", Gender::Male),
        ];
        let text = compose("Priya", &people, 0).unwrap();
        assert!(text.contains("👸 *Amy* - Today is her birthday!\n"));
        assert!(text.contains("🎂 *Sam* - Today is their birthday!\n"));
        assert!(text.contains("🤴 *Bob* - Today is his birthday!\n"));
        assert!(text.contains("🎁 *Time to celebrate!* 🥳"));
        assert!(!text.contains("12:00 AM"));
        assert!(text.ends_with("📅 Total: 3 birthdays"));
    }

    #[test]
    fn test_lines_follow_input_order() {
        let people = [person("Zed", Gender::Male), person("Ann", Gender::Female)];
        let text = compose("Priya", &people, 1).unwrap();
        assert!(text.find("Zed").unwrap() < text.find("Ann").unwrap());
    }

    #[test]
    fn test_further_offsets_have_no_footnote() {
        let people = [person("Amy", Gender::Female), person("Sam", Gender::Unspecified)];
        let text = compose("Priya", &people, 5).unwrap();
        assert!(text.contains("👸 *Amy* - In 5 days will be her birthday!"));
        assert!(!text.contains("Time to celebrate"));
        assert!(!text.contains("12:00 AM"));
        assert!(text.ends_with("📅 Total: 2 birthdays"));
    }

    #[test]
    fn test_test_message_mentions_user_and_api() {
        let at = chrono_tz::Asia::Kolkata
            .with_ymd_and_hms(2026, 3, 14, 23, 50, 0)
            .unwrap();
        let text = test_message("Priya", "https://api.telegram.org/bot", at);
        assert!(text.starts_with("🧪 *Test Reminder for Priya*"));
        assert!(text.contains("Sent at: 2026-03-14 23:50:00 IST"));
        assert!(text.ends_with("🤖 Bot API: https://api.telegram.org/bot"));
    }
}
