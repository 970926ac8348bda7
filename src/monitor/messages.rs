use crate::database::models::Member;

pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

pub fn warning(non_reporters: &[Member], minutes_until: i64) -> String {
    let mentions: Vec<String> = non_reporters.iter().map(|m| mention(&m.user_id)).collect();
    format!(
        "Hey, {}! {} minutes to deadline and the team is still waiting for standups from you!",
        mentions.join(", "),
        minutes_until
    )
}

pub fn all_reported() -> String {
    "Congratulations! Everybody wrote their standups today!".to_string()
}

pub fn missed_deadline(member: &Member) -> String {
    format!(
        "Hello, {}! You missed the standup deadline in <#{}> channel. Please, write your standup ASAP!",
        mention(&member.name),
        member.group_id
    )
}

pub fn reminder(member: &Member, repeat: u32, max: u32) -> String {
    format!(
        "Hello, {}! Reminder {} of {}: your standup in <#{}> is still missing. Please, write it ASAP!",
        mention(&member.name),
        repeat,
        max,
        member.group_id
    )
}
