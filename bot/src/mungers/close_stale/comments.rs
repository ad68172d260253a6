use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use shared::{IssueUsers, ItemKind};

// Fragments shared by the rendered comments and the patterns recognizing them.
macro_rules! inactive_head {
    () => {
        "This {kind} hasn't been active in {inactive}."
    };
}

macro_rules! closing_tail {
    () => {
        "label to prevent this from happening again"
    };
}

macro_rules! warning_tail {
    () => {
        "be closed in {close_in}"
    };
}

const CLOSING_TEMPLATE: &str = concat!(
    inactive_head!(),
    " Closing this {kind}. Please reopen if you would like to work towards merging this change, \
     if/when the {kind} is ready for the next round of review.\n\n{mention}\nYou can add 'keep-open' ",
    closing_tail!(),
    ", or add a comment to keep it open another 90 days"
);

const WARNING_TEMPLATE: &str = concat!(
    inactive_head!(),
    " It will ",
    warning_tail!(),
    " ({close_date}).\n\n{mention}\nYou can add 'keep-open' label to prevent this from happening, \
     or add a comment to keep it open another 90 days"
);

const CLOSE_DATE_FORMAT: &str = "%b %-d, %Y";

/// Recognizes the comments rendered by [`closing_comment`] and [`warning_comment`].
#[derive(Debug, Clone)]
pub struct CommentClassifier {
    closing: Regex,
    warning: Regex,
}

impl CommentClassifier {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            closing: gap_pattern(inactive_head!(), closing_tail!())?,
            warning: gap_pattern(inactive_head!(), warning_tail!())?,
        })
    }

    pub fn is_closing(&self, text: &str) -> bool {
        self.closing.is_match(text)
    }

    pub fn is_warning(&self, text: &str) -> bool {
        self.warning.is_match(text)
    }
}

/// `head`, then anything (line breaks included), then `tail`.
fn gap_pattern(head: &str, tail: &str) -> anyhow::Result<Regex> {
    let pattern = format!(
        "(?s){}.*{}",
        fragment_pattern(head),
        fragment_pattern(tail)
    );
    Ok(Regex::new(&pattern)?)
}

fn fragment_pattern(fragment: &str) -> String {
    regex::escape(fragment)
        .replace(r"\{kind\}", r"(?:PR|Issue)")
        .replace(r"\{inactive\}", r"\d+ days?")
        .replace(r"\{close_in\}", r"\d+ days?")
}

fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("{{{key}}}"), value)
        })
}

fn mention_line(users: &IssueUsers) -> String {
    let mention = users.mention();
    if mention.is_empty() {
        mention
    } else {
        format!("cc {mention}\n")
    }
}

/// Whole days, truncated toward zero, with the unit pluralized.
pub fn duration_to_days(duration: Duration) -> String {
    let days = duration.num_days();
    let unit = if days == 1 || days == -1 { "day" } else { "days" };
    format!("{days} {unit}")
}

pub fn closing_comment(kind: ItemKind, inactive_for: Duration, users: &IssueUsers) -> String {
    let inactive = duration_to_days(inactive_for);
    let mention = mention_line(users);
    render(
        CLOSING_TEMPLATE,
        &[
            ("kind", kind.as_ref()),
            ("inactive", inactive.as_str()),
            ("mention", mention.as_str()),
        ],
    )
}

pub fn warning_comment(
    kind: ItemKind,
    inactive_for: Duration,
    close_in: Duration,
    now: DateTime<Utc>,
    users: &IssueUsers,
) -> String {
    let inactive = duration_to_days(inactive_for);
    let close_in_days = duration_to_days(close_in);
    let close_date = (now + close_in).format(CLOSE_DATE_FORMAT).to_string();
    let mention = mention_line(users);
    render(
        WARNING_TEMPLATE,
        &[
            ("kind", kind.as_ref()),
            ("inactive", inactive.as_str()),
            ("close_in", close_in_days.as_str()),
            ("close_date", close_date.as_str()),
            ("mention", mention.as_str()),
        ],
    )
}
