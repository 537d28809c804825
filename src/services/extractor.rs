//! Record extraction from word detail pages.
//!
//! Site-specific markup handling is confined to [`InNoteExtractor`].

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{RhymeRecord, WordId};

/// Turns one fetched detail page into rhyme records.
pub trait RecordExtractor: Send + Sync {
    /// Extract every valid record. Unmatched list items are skipped.
    fn extract(&self, page: &str, source_id: WordId) -> Vec<RhymeRecord>;
}

/// `「空」と韻を踏む言葉` → `空`
static HEADING_DECORATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^「|」.*$").expect("valid heading regex"));

/// `3 文字 flow （ふろー）`; the length may use full-width digits.
static CANDIDATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9０-９]+)\s*文字\s+(.+?)\s+（(.+?)）").expect("valid candidate regex")
});

/// Extractor for in-note.com word pages.
pub struct InNoteExtractor {
    heading: Selector,
    item: Selector,
}

impl InNoteExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            heading: Self::parse_selector("h1")?,
            item: Self::parse_selector("li")?,
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    /// Target word from the first heading, without its 「」 decoration.
    fn target_word(&self, document: &Html) -> Option<String> {
        let heading = document.select(&self.heading).next()?;
        let text = joined_text(&heading, "");
        let target = HEADING_DECORATION.replace_all(&text, "").trim().to_string();
        (!target.is_empty()).then_some(target)
    }

    /// Parse one list item line into a record.
    fn parse_line(line: &str, target: &str, source_id: WordId) -> Option<Result<RhymeRecord>> {
        let caps = CANDIDATE_LINE.captures(line)?;
        let n_chars = match ascii_digits(&caps[1]).parse::<u32>() {
            Ok(n) => n,
            Err(e) => return Some(Err(AppError::parse(format!("bad length in {line:?}: {e}")))),
        };
        Some(RhymeRecord::new(
            source_id,
            target,
            caps[2].trim(),
            caps[3].trim(),
            n_chars,
        ))
    }
}

impl RecordExtractor for InNoteExtractor {
    fn extract(&self, page: &str, source_id: WordId) -> Vec<RhymeRecord> {
        let document = Html::parse_document(page);
        let Some(target) = self.target_word(&document) else {
            log::debug!("page {source_id}: no heading");
            return Vec::new();
        };

        let mut records = Vec::new();
        for item in document.select(&self.item) {
            let line = joined_text(&item, " ");
            match Self::parse_line(&line, &target, source_id) {
                Some(Ok(record)) => records.push(record),
                Some(Err(e)) => log::debug!("page {source_id}: skipped item: {e}"),
                None => {}
            }
        }

        if records.is_empty() {
            log::debug!("page {source_id} ({target}): no candidate lines");
        }
        records
    }
}

/// Text nodes trimmed, empty ones dropped, joined by `separator`.
fn joined_text(element: &ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// `１２` → `12`
fn ascii_digits(digits: &str) -> String {
    digits
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_digit(u32::from(c) - u32::from('０'), 10).unwrap_or(c),
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h1>「空」と韻を踏む言葉</h1>
          <ul>
            <li><span>1</span>文字 <a href="/words/2">月</a> （つき）</li>
            <li>1 文字 風 （かぜ）</li>
            <li>3文字 <b>flow</b> （ふろー）</li>
            <li>ホーム</li>
            <li>0 文字 無 （む）</li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_extract_candidates() {
        let extractor = InNoteExtractor::new().unwrap();
        let records = extractor.extract(PAGE, 7);

        let rhymes: Vec<_> = records
            .iter()
            .map(|r| (r.rhyme_word.as_str(), r.reading.as_str(), r.n_chars))
            .collect();
        assert_eq!(
            rhymes,
            vec![("月", "つき", 1), ("風", "かぜ", 1), ("flow", "ふろー", 3)]
        );
        assert!(records.iter().all(|r| r.target_word == "空" && r.source_id == 7));
    }

    #[test]
    fn test_missing_heading_yields_nothing() {
        let extractor = InNoteExtractor::new().unwrap();
        let page = "<ul><li>1 文字 風 （かぜ）</li></ul>";
        assert!(extractor.extract(page, 1).is_empty());
    }

    #[test]
    fn test_no_matching_lines_yields_nothing() {
        let extractor = InNoteExtractor::new().unwrap();
        let page = "<h1>「海」</h1><ul><li>about</li><li>contact</li></ul>";
        assert!(extractor.extract(page, 1).is_empty());
    }

    #[test]
    fn test_parse_line() {
        let record = InNoteExtractor::parse_line("  12文字 あいうえお （あいうえお）", "空", 3)
            .unwrap()
            .unwrap();
        assert_eq!(record.n_chars, 12);
        assert_eq!(record.rhyme_word, "あいうえお");
        assert!(InNoteExtractor::parse_line("文字 風 （かぜ）", "空", 3).is_none());
    }

    #[test]
    fn test_heading_split_across_elements() {
        let extractor = InNoteExtractor::new().unwrap();
        let page = "<h1>「<b>東</b>京」と韻を踏む言葉</h1><ul><li>2 文字 <b>投</b>稿 （とうこう）</li></ul>";
        let records = extractor.extract(page, 4);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_word, "東京");
        assert_eq!(records[0].rhyme_word, "投 稿");
    }

    #[test]
    fn test_full_width_length() {
        let record = InNoteExtractor::parse_line("１２ 文字 風 （かぜ）", "空", 3)
            .unwrap()
            .unwrap();
        assert_eq!(record.n_chars, 12);
        assert!(InNoteExtractor::parse_line("٣ 文字 風 （かぜ）", "空", 3).is_none());
    }
}
