//! Heuristic extraction of a structured explanation from the Markdown the
//! model streams back. Headings are routed by keyword, so the extractor
//! tolerates responses that rename or reorder sections.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Shown when a response had no recognizable どう動くか section.
pub const NO_ANALYSIS_RESULT: &str = "解析結果を取得できませんでした";
/// Shown when no techniques section was found.
pub const NO_TECHNIQUES_FOUND: &str = "使用されている技術を特定できませんでした";
/// Shown when no cautions section was found.
pub const NO_WATCH_OUT_FOUND: &str = "特に注意すべき点は見つかりませんでした";

/// Structured explanation extracted from a Markdown response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub summary: String,
    pub how_it_works: Vec<String>,
    pub key_techniques: Vec<String>,
    pub watch_out: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_links: Option<Vec<String>>,
}

/// Keywords that route a heading to an `Explanation` field. Matching is
/// substring containment against the lowercased heading, first match wins
/// in field order.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    pub summary: Vec<String>,
    pub how_it_works: Vec<String>,
    pub key_techniques: Vec<String>,
    pub watch_out: Vec<String>,
    pub tips: Vec<String>,
    pub related_links: Vec<String>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            summary: owned(&["概要", "変更"]),
            how_it_works: owned(&["動作", "仕組み"]),
            key_techniques: owned(&["技術", "パターン", "api", "選択"]),
            watch_out: owned(&["注意", "問題", "エッジケース"]),
            tips: owned(&["ヒント", "コツ", "最適化"]),
            related_links: owned(&["参考", "リンク"]),
        }
    }
}

fn matches_any(keywords: &[String], title: &str) -> bool {
    keywords.iter().any(|keyword| title.contains(keyword.as_str()))
}

/// Split a Markdown response on `##` headings and route each section to an
/// `Explanation` field. Unmatched fields get placeholder text so the result
/// is always renderable.
pub fn parse_markdown_explanation(markdown: &str, keywords: &KeywordTable) -> Explanation {
    let section_re = Regex::new(r"##\s+").unwrap();

    let mut summary = String::new();
    let mut how_it_works: Vec<String> = Vec::new();
    let mut key_techniques: Vec<String> = Vec::new();
    let mut watch_out: Vec<String> = Vec::new();
    let mut tips: Option<Vec<String>> = None;
    let mut related_links: Option<Vec<String>> = None;

    for section in section_re.split(markdown) {
        let mut lines = section.trim().split('\n');
        let title = lines.next().unwrap_or("").to_lowercase();
        let content = lines.collect::<Vec<_>>().join("\n").trim().to_string();

        if matches_any(&keywords.summary, &title) {
            summary = content;
        } else if matches_any(&keywords.how_it_works, &title) {
            how_it_works = extract_bullet_points(&content);
        } else if matches_any(&keywords.key_techniques, &title) {
            key_techniques = extract_bullet_points(&content);
        } else if matches_any(&keywords.watch_out, &title) {
            watch_out = extract_bullet_points(&content);
        } else if matches_any(&keywords.tips, &title) {
            let points = extract_bullet_points(&content);
            if !points.is_empty() {
                tips = Some(points);
            }
        } else if matches_any(&keywords.related_links, &title) {
            let links = extract_bullet_points(&content);
            if !links.is_empty() {
                related_links = Some(links);
            }
        }
    }

    if summary.is_empty() {
        summary = format!("{}...", markdown.chars().take(200).collect::<String>());
    }
    if how_it_works.is_empty() {
        how_it_works = vec![NO_ANALYSIS_RESULT.to_string()];
    }
    if key_techniques.is_empty() {
        key_techniques = vec![NO_TECHNIQUES_FOUND.to_string()];
    }
    if watch_out.is_empty() {
        watch_out = vec![NO_WATCH_OUT_FOUND.to_string()];
    }

    Explanation {
        summary,
        how_it_works,
        key_techniques,
        watch_out,
        tips,
        related_links,
    }
}

/// Collect `-`, `*`, `・` and `1.` style bullet lines. Content without any
/// bullet line is kept whole as a single entry.
fn extract_bullet_points(content: &str) -> Vec<String> {
    let bullet_re = Regex::new(r"^[-*・]\s+").unwrap();
    let numbered_re = Regex::new(r"^\d+\.\s+").unwrap();

    let mut points = Vec::new();
    for line in content.split('\n') {
        let trimmed = line.trim();
        if bullet_re.is_match(trimmed) || numbered_re.is_match(trimmed) {
            let without_bullet = bullet_re.replace(trimmed, "");
            let without_number = numbered_re.replace(&without_bullet, "");
            points.push(without_number.into_owned());
        }
    }

    if points.is_empty() {
        vec![content.to_string()]
    } else {
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(markdown: &str) -> Explanation {
        parse_markdown_explanation(markdown, &KeywordTable::default())
    }

    #[test]
    fn test_full_markdown_parses_all_sections() {
        let markdown = "## 概要\nソート関数の説明\n\n## 動作の仕組み\n- 配列を走査する\n- 隣接要素を比較する\n\n## 使われている技術\n- クロージャ\n- 高階関数\n\n## 注意点\n- 計算量は O(n^2)\n\n## ヒント\n- 標準ライブラリを使う\n\n## 参考リンク\n- https://example.com/docs";
        let explanation = parse(markdown);

        assert_eq!(explanation.summary, "ソート関数の説明");
        assert_eq!(
            explanation.how_it_works,
            vec!["配列を走査する", "隣接要素を比較する"]
        );
        assert_eq!(explanation.key_techniques, vec!["クロージャ", "高階関数"]);
        assert_eq!(explanation.watch_out, vec!["計算量は O(n^2)"]);
        assert_eq!(
            explanation.tips,
            Some(vec!["標準ライブラリを使う".to_string()])
        );
        assert_eq!(
            explanation.related_links,
            Some(vec!["https://example.com/docs".to_string()])
        );
    }

    #[test]
    fn test_partial_markdown_gets_placeholders() {
        let markdown = "## 概要\n生成器の説明\n## 注意点\n- 落とし穴A\n- 落とし穴B";
        let explanation = parse(markdown);

        assert_eq!(explanation.summary, "生成器の説明");
        assert_eq!(explanation.watch_out, vec!["落とし穴A", "落とし穴B"]);
        assert_eq!(explanation.how_it_works, vec![NO_ANALYSIS_RESULT]);
        assert_eq!(explanation.key_techniques, vec![NO_TECHNIQUES_FOUND]);
        assert_eq!(explanation.tips, None);
        assert_eq!(explanation.related_links, None);
    }

    #[test]
    fn test_missing_summary_falls_back_to_prefix() {
        let markdown = "見出しのないただのテキストです";
        let explanation = parse(markdown);
        assert_eq!(explanation.summary, "見出しのないただのテキストです...");
    }

    #[test]
    fn test_empty_markdown() {
        let explanation = parse("");
        assert_eq!(explanation.summary, "...");
        assert_eq!(explanation.how_it_works, vec![NO_ANALYSIS_RESULT]);
        assert_eq!(explanation.watch_out, vec![NO_WATCH_OUT_FOUND]);
    }

    #[test]
    fn test_numbered_and_star_bullets() {
        let markdown = "## 動作の仕組み\n1. 入力を読む\n2. 変換する\n\n## 使われている技術\n* map\n・ filter";
        let explanation = parse(markdown);
        assert_eq!(explanation.how_it_works, vec!["入力を読む", "変換する"]);
        assert_eq!(explanation.key_techniques, vec!["map", "filter"]);
    }

    #[test]
    fn test_section_without_bullets_kept_whole() {
        let markdown = "## 注意点\nただの文章です";
        let explanation = parse(markdown);
        assert_eq!(explanation.watch_out, vec!["ただの文章です"]);
    }

    #[test]
    fn test_diff_headings_route_to_summary() {
        let markdown = "## 変更の概要\nループを map に置き換えました";
        let explanation = parse(markdown);
        assert_eq!(explanation.summary, "ループを map に置き換えました");
    }

    #[test]
    fn test_custom_keyword_table_routes_english_headings() {
        let mut keywords = KeywordTable::default();
        keywords.summary.push("overview".to_string());
        let explanation = parse_markdown_explanation("## Overview\nEnglish text", &keywords);
        assert_eq!(explanation.summary, "English text");
    }

    #[test]
    fn test_serializes_camel_case() {
        let explanation = parse("## 概要\n説明");
        let value = serde_json::to_value(&explanation).unwrap();
        assert!(value.get("howItWorks").is_some());
        assert!(value.get("keyTechniques").is_some());
        assert!(value.get("watchOut").is_some());
        assert!(value.get("tips").is_none());
    }
}
