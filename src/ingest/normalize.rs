// src/ingest/normalize.rs
//! Entry normalization: title, date fallback chain, summary and slug.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha1::{Digest, Sha1};

use crate::ingest::clean_summary;
use crate::ingest::types::{Post, RawEntry};

pub const UNTITLED: &str = "Untitled";
pub const SLUG_MAX_CHARS: usize = 80;
pub const FINGERPRINT_HEX_LEN: usize = 10;

/// Offset-bearing layouts tried after RFC 3339 and RFC 2822.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
];

/// Layouts without a zone; the result is taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Builds a [`Post`] from one entry, or `None` when the entry has no usable link.
///
/// `now` is the fallback timestamp for entries whose dates are all missing or unparseable.
pub fn normalize_entry(entry: &RawEntry, source: &str, now: DateTime<Utc>) -> Option<Post> {
    let url = entry.link.as_deref().map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return None;
    }

    let title = resolve_title(entry.title.as_deref());
    let summary = clean_summary(
        entry
            .summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(entry.description.as_deref())
            .unwrap_or_default(),
    );
    let published = parse_date([
        entry.published.as_deref(),
        entry.updated.as_deref(),
        entry.created.as_deref(),
    ])
    .unwrap_or(now);
    let slug = slugify(&title, url);

    Some(Post {
        title,
        url: url.to_string(),
        source: source.to_string(),
        published,
        summary,
        slug,
    })
}

pub fn resolve_title(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).filter(|t| !t.is_empty());
    let Some(trimmed) = trimmed else {
        return UNTITLED.to_string();
    };
    let decoded = html_escape::decode_html_entities(trimmed);
    let decoded = decoded.trim();
    if decoded.is_empty() {
        UNTITLED.to_string()
    } else {
        decoded.to_string()
    }
}

/// First candidate that is present, non-empty and parseable wins.
/// Each candidate is tried once; `None` means the caller picks the fallback.
pub fn parse_date<'a, I>(candidates: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .find_map(parse_datetime)
}

/// Parses one date-time string. Zoned values are converted, naive ones read as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = parse_rfc2822_lenient(s) {
        return Some(dt);
    }

    // Feeds routinely carry a weekday that disagrees with the date; drop it.
    let body = strip_weekday(s);
    if body != s {
        if let Some(dt) = parse_rfc2822_lenient(body) {
            return Some(dt);
        }
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(body, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = body.strip_suffix('Z').unwrap_or(body);
    if let Some(ndt) = parse_naive(naive) {
        return Some(ndt.and_utc());
    }

    // Unknown zone abbreviation (`CEST`, `IST`): read the rest as UTC.
    if let Some(ndt) = strip_zone_name(body).and_then(parse_naive) {
        return Some(ndt.and_utc());
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
        }
    }

    None
}

fn parse_rfc2822_lenient(s: &str) -> Option<DateTime<Utc>> {
    let normalized = match s.strip_suffix(" UTC") {
        Some(head) => format!("{head} +0000"),
        None => s.to_string(),
    };
    DateTime::parse_from_rfc2822(&normalized)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn strip_weekday(s: &str) -> &str {
    static RE_WEEKDAY: OnceCell<Regex> = OnceCell::new();
    let re = RE_WEEKDAY.get_or_init(|| {
        Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+").expect("weekday regex")
    });
    match re.find(s) {
        Some(m) => &s[m.end()..],
        None => s,
    }
}

fn strip_zone_name(s: &str) -> Option<&str> {
    static RE_ZONE: OnceCell<Regex> = OnceCell::new();
    let re = RE_ZONE.get_or_init(|| Regex::new(r"^(.*\d)\s+[A-Za-z]{1,6}$").expect("zone regex"));
    re.captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `<slugified title>-<10 hex chars of sha1(url)>`.
pub fn slugify(title: &str, url: &str) -> String {
    format!("{}-{}", slug_base(title), url_fingerprint(url))
}

fn slug_base(title: &str) -> String {
    static RE_DISALLOWED: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_disallowed =
        RE_DISALLOWED.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("slug charset regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));

    let lowered = title.trim().to_lowercase();
    let kept = re_disallowed.replace_all(&lowered, "");
    let hyphenated = re_ws.replace_all(&kept, "-");
    let base: String = hyphenated
        .trim_matches('-')
        .chars()
        .take(SLUG_MAX_CHARS)
        .collect();

    if base.is_empty() {
        "post".to_string()
    } else {
        base
    }
}

pub fn url_fingerprint(url: &str) -> String {
    let digest = Sha1::digest(url.as_bytes());
    let mut out = String::with_capacity(FINGERPRINT_HEX_LEN);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
        if out.len() >= FINGERPRINT_HEX_LEN {
            break;
        }
    }
    out.truncate(FINGERPRINT_HEX_LEN);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fingerprint_is_first_ten_hex_of_sha1() {
        // sha1("https://x.test/a") = 264344770ca8cf985c7e0b079449f649f7c8ba9c
        assert_eq!(url_fingerprint("https://x.test/a"), "264344770c");
    }

    #[test]
    fn slug_drops_punctuation_and_non_ascii() {
        assert_eq!(slug_base("  Hello, World! 2024 "), "hello-world-2024");
        assert_eq!(slug_base("Café — über"), "caf-ber");
        assert_eq!(slug_base("--- a -- b ---"), "a----b");
        assert_eq!(slug_base("!!!"), "post");
        assert_eq!(slug_base(""), "post");
    }

    #[test]
    fn slug_base_is_capped() {
        let long = "word ".repeat(40);
        let base = slug_base(&long);
        assert_eq!(base.chars().count(), SLUG_MAX_CHARS);
    }

    #[test]
    fn title_placeholder_and_entities() {
        assert_eq!(resolve_title(None), "Untitled");
        assert_eq!(resolve_title(Some("   ")), "Untitled");
        assert_eq!(resolve_title(Some(" Tom &amp; Jerry ")), "Tom & Jerry");
        assert_eq!(resolve_title(Some("&#32;")), "Untitled");
    }

    #[test]
    fn date_formats_normalize_to_utc() {
        let expect = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_datetime("2024-03-01T12:00:00+02:00"), Some(expect));
        assert_eq!(parse_datetime("Fri, 01 Mar 2024 10:00:00 GMT"), Some(expect));
        assert_eq!(parse_datetime("Fri, 01 Mar 2024 10:00:00 UTC"), Some(expect));
        assert_eq!(parse_datetime("2024-03-01 05:00:00 -0500"), Some(expect));
        assert_eq!(parse_datetime("2024-03-01T10:00:00"), Some(expect));
        assert_eq!(parse_datetime("2024-03-01 10:00:00.000"), Some(expect));
        assert_eq!(
            parse_datetime("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime("yesterday-ish"), None);
    }

    #[test]
    fn weekday_that_disagrees_with_date_is_ignored() {
        // 2024-03-01 is a Friday.
        let expect = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_datetime("Sat, 01 Mar 2024 10:00:00 +0000"), Some(expect));
        assert_eq!(parse_datetime("Sat, 01 Mar 2024 10:00:00 GMT"), Some(expect));
        assert_eq!(parse_datetime("Saturday, 01 Mar 2024 10:00 +0000"), Some(expect));
        assert_eq!(parse_datetime("01 Mar 2024 12:00:00 +0200"), Some(expect));
    }

    #[test]
    fn unknown_zone_name_reads_as_utc() {
        let expect = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_datetime("Fri, 01 Mar 2024 10:00:00 CEST"), Some(expect));
        assert_eq!(parse_datetime("Sat, 01 Mar 2024 10:00 CEST"), Some(expect));
        assert_eq!(parse_datetime("2024-03-01 10:00:00 IST"), Some(expect));
        assert_eq!(parse_datetime("Fri, 01 Mar 2024 CEST"), None);
    }

    #[test]
    fn parse_date_skips_empty_and_broken_candidates() {
        let got = parse_date([Some(""), Some("garbage"), Some("2024-01-02T00:00:00Z")]);
        assert_eq!(got, Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
        assert_eq!(parse_date([None, None, None]), None);
    }
}
