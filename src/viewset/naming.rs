//! Route prefixes and default route metadata derived from a view set's name.

use regex::Regex;
use std::sync::LazyLock;

static SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ViewSets?$").expect("suffix pattern is valid"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-z]+)").expect("word pattern is valid"));
static ACRONYM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{2,})").expect("acronym pattern is valid"));

/// The name without its `ViewSet`/`ViewSets` suffix
#[must_use]
pub fn strip_suffix(name: &str) -> &str {
    match SUFFIX.find(name) {
        Some(found) => &name[..found.start()],
        None => name,
    }
}

/// `HTTPStatsViewSet` -> `http_stats`
#[must_use]
pub fn path_segment(name: &str) -> String {
    let stem = strip_suffix(name);
    let stem = WORD.replace_all(stem, "_$1");
    let stem = ACRONYM.replace_all(&stem, "_$1");
    stem.to_lowercase().trim_matches('_').to_string()
}

/// `query_company_include_users` -> `Query Company Include Users`
#[must_use]
pub fn default_summary(handler: &str) -> String {
    let mut summary = String::with_capacity(handler.len());
    let mut in_word = false;
    for c in handler.replace('_', " ").trim().chars() {
        if c.is_alphabetic() {
            if in_word {
                summary.extend(c.to_lowercase());
            } else {
                summary.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            summary.push(c);
            in_word = false;
        }
    }
    summary
}

/// Tags of a route: the view set name is always present, after any explicit tags.
#[must_use]
pub fn default_tags(tags: Option<Vec<String>>, viewset: &str) -> Vec<String> {
    let mut tags = tags.unwrap_or_default();
    tags.push(viewset.to_string());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment_simple_names() {
        assert_eq!(path_segment("UserViewSet"), "user");
        assert_eq!(path_segment("CompanyViewSet"), "company");
        assert_eq!(path_segment("PositionViewSets"), "position");
    }

    #[test]
    fn test_path_segment_acronyms() {
        assert_eq!(path_segment("HTTPStatsViewSet"), "http_stats");
        assert_eq!(path_segment("UserHTTPViewSet"), "user_http");
        assert_eq!(path_segment("APIViewSet"), "api");
    }

    #[test]
    fn test_path_segment_suffix_is_case_insensitive() {
        assert_eq!(path_segment("Loggerviewset"), "logger");
        assert_eq!(path_segment("SystemConfigVIEWSETS"), "system_config");
    }

    #[test]
    fn test_path_segment_without_suffix() {
        assert_eq!(path_segment("Logger"), "logger");
        assert_eq!(path_segment("DependsTest"), "depends_test");
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(strip_suffix("CompanyViewSet"), "Company");
        assert_eq!(strip_suffix("Company"), "Company");
    }

    #[test]
    fn test_default_summary_title_cases_words() {
        assert_eq!(default_summary("all"), "All");
        assert_eq!(default_summary("add_users"), "Add Users");
        assert_eq!(default_summary("get_config"), "Get Config");
        assert_eq!(default_summary("_private_call_"), "Private Call");
        assert_eq!(default_summary("v2_export"), "V2 Export");
    }

    #[test]
    fn test_default_tags() {
        assert_eq!(default_tags(None, "CompanyViewSet"), vec!["CompanyViewSet"]);
        assert_eq!(
            default_tags(Some(vec!["admin".to_string()]), "CompanyViewSet"),
            vec!["admin", "CompanyViewSet"]
        );
    }
}
