use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::models::activity::ActivityEvent;
use crate::models::message::{Message, Role};

/// Character budget for derived section titles.
pub const MAX_SECTION_TITLE_CHARS: usize = 68;

lazy_static! {
    static ref URL_PATTERN: Regex =
        Regex::new(r"https?://[\w\-._~:/?#\[\]@!$&'()*+,;=%]+").expect("url pattern");
}

/// One section of the derived report view: an assistant answer titled by the
/// question that prompted it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metrics: Vec<String>,
}

/// A source link surfaced from the report text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSource {
    pub title: String,
    pub url: String,
}

/// Unique http(s) URLs in order of first appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for found in URL_PATTERN.find_iter(text) {
        let url = found.as_str().to_string();
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }
    urls
}

/// Host of a URL with any leading `www.` stripped; unparsable URLs fall back
/// to the raw string.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .host_str()
                .map(|host| host.trim_start_matches("www.").to_string())
        })
        .unwrap_or_else(|| url.to_string())
}

/// One section per assistant message, titled by the first line of the
/// nearest preceding user message.
pub fn build_sections(messages: &[Message], thread_id: Option<&str>) -> Vec<ReportSection> {
    let scope = thread_id.unwrap_or("local");
    let mut sections = Vec::new();

    for (index, message) in messages.iter().enumerate() {
        if message.role != Role::Assistant {
            continue;
        }

        let raw_title = messages[..index]
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.lines().next())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Insight {}", index + 1));

        let metrics = message
            .tags
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter(|tag| !tag.is_empty())
            .collect();

        sections.push(ReportSection {
            id: format!("{scope}-{index}"),
            title: truncate_title(&raw_title),
            content: message.content.clone(),
            metrics,
        });
    }

    sections
}

fn truncate_title(raw: &str) -> String {
    if raw.chars().count() > MAX_SECTION_TITLE_CHARS {
        let head: String = raw.chars().take(MAX_SECTION_TITLE_CHARS).collect();
        format!("{head}…")
    } else {
        raw.to_string()
    }
}

pub fn build_sources(urls: &[String]) -> Vec<ReportSource> {
    urls.iter()
        .map(|url| ReportSource {
            title: extract_domain(url),
            url: url.clone(),
        })
        .collect()
}

/// Rough run duration from the activity timeline, floored at 30 seconds.
/// Degenerate timelines (fewer than two events, clock regressions) fall back
/// to the floor.
pub fn duration_seconds(events: &[ActivityEvent]) -> i64 {
    const FLOOR: i64 = 30;
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return FLOOR;
    };
    if events.len() < 2 {
        return FLOOR;
    }
    let elapsed = (last.timestamp - first.timestamp).num_seconds();
    if elapsed <= 0 {
        FLOOR
    } else {
        elapsed.max(FLOOR)
    }
}
