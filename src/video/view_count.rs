use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::{Html, Selector};
use serde_json::Value;

use super::{transport::HttpTransport, VideoError, VideoId};

const WATCH_PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Inline-script shapes carrying the view count, most reliable first.
static VIEW_COUNT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""viewCount":\s*"(\d+)""#,
        r#""viewCount":\s*(\d+)"#,
        r#""simpleText":"([\d\s,]+)\s*vues""#,
        r#""viewCountText":\s*\{[^}]*"simpleText":"([\d\s,]+)\s*vues""#,
        r#""runs":\s*\[[^\]]*"text":"([\d\s,]+)\s*vues""#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile view count regex"))
    .collect()
});

type Strategy = fn(&str) -> Option<u64>;

/// Tried in order; the first strategy returning a count wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("inline-patterns", from_inline_patterns),
    ("json-ld", from_json_ld),
];

pub fn watch_page_url(id: &VideoId) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Strip whitespace, thousands separators and quotes from a captured count.
pub fn clean_count(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '"')
        .collect()
}

fn positive_count(raw: &str) -> Option<u64> {
    clean_count(raw).parse::<u64>().ok().filter(|count| *count > 0)
}

fn from_inline_patterns(html: &str) -> Option<u64> {
    VIEW_COUNT_PATTERNS.iter().find_map(|re| {
        re.captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| positive_count(m.as_str()))
    })
}

fn names_watch_action(value: &Value) -> bool {
    match value {
        Value::String(name) => name == "WatchAction" || name.ends_with("/WatchAction"),
        Value::Object(_) => value
            .get("@type")
            .and_then(Value::as_str)
            .is_some_and(|name| name == "WatchAction"),
        _ => false,
    }
}

fn watch_count(data: &Value) -> Option<u64> {
    if let Value::Array(items) = data {
        return items.iter().find_map(watch_count);
    }

    let stats = match data.get("interactionStatistic")? {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        single => vec![single],
    };

    stats
        .into_iter()
        .filter(|stat| {
            stat.get("@type").is_some_and(names_watch_action)
                || stat.get("interactionType").is_some_and(names_watch_action)
        })
        .find_map(|stat| {
            stat.get("userInteractionCount")?
                .as_str()?
                .parse::<u64>()
                .ok()
        })
}

// Zero is a valid answer here, unlike the inline patterns.
fn from_json_ld(html: &str) -> Option<u64> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("Failed to compile json-ld selector");
    let document = Html::parse_document(html);

    document.select(&selector).find_map(|script| {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&text) {
            Ok(data) => watch_count(&data),
            Err(err) => {
                log::debug!("skipping malformed json-ld block: {err}");
                None
            }
        }
    })
}

/// Run every extraction strategy over a watch page.
pub fn view_count_from_page(html: &str) -> Option<u64> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let count = strategy(html)?;
        log::debug!("strategy={name} view_count={count}");
        Some(count)
    })
}

/// Fetch the watch page and scrape its view count.
pub fn scrape_view_count(
    transport: &dyn HttpTransport,
    id: &VideoId,
    user_agent: &str,
) -> Result<u64, VideoError> {
    let url = watch_page_url(id);

    let resp = transport
        .get(&url, &[(USER_AGENT, user_agent), (ACCEPT, WATCH_PAGE_ACCEPT)])
        .map_err(|err| {
            log::warn!("{id}: watch page unavailable: {err}");
            VideoError::ViewCountNotFound
        })?;

    if !resp.status.is_success() {
        log::warn!("{id}: watch page returned {}", resp.status);
        return Err(VideoError::ViewCountNotFound);
    }

    view_count_from_page(&resp.body).ok_or_else(|| {
        log::warn!("{id}: no view count strategy matched");
        VideoError::ViewCountNotFound
    })
}
