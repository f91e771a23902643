//! Extraction of code and dataset references from free text

use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    github: Regex,
    gitlab: Regex,
    hub_dataset: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                github: Regex::new(
                    r"https?://(?:www\.)?github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)",
                )
                .ok()?,
                gitlab: Regex::new(r"https?://(?:www\.)?gitlab\.com/([A-Za-z0-9_./-]+)").ok()?,
                hub_dataset: Regex::new(
                    r"https?://(?:www\.)?huggingface\.co/datasets/([A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)?)",
                )
                .ok()?,
            })
        })
        .as_ref()
}

// Path prefixes on github.com that are not repositories
const GITHUB_RESERVED: &[&str] = &[
    "orgs", "topics", "features", "sponsors", "marketplace", "settings", "about", "collections",
];

/// Code repository URLs mentioned in `text`, normalized and de-duplicated in
/// order of first appearance
pub fn code_mentions(text: &str) -> Vec<String> {
    let Some(p) = patterns() else {
        return Vec::new();
    };

    let mut found: Vec<(usize, String)> = Vec::new();

    for caps in p.github.captures_iter(text) {
        let (Some(whole), Some(owner), Some(repo)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if GITHUB_RESERVED.contains(&owner.as_str()) {
            continue;
        }
        let repo = repo.as_str().trim_end_matches(".git").trim_end_matches('.');
        if repo.is_empty() {
            continue;
        }
        found.push((
            whole.start(),
            format!("https://github.com/{}/{}", owner.as_str(), repo),
        ));
    }

    for caps in p.gitlab.captures_iter(text) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let project: Vec<&str> = path
            .as_str()
            .split('/')
            .take_while(|s| *s != "-")
            .filter(|s| !s.is_empty())
            .collect();
        if project.len() < 2 {
            continue;
        }
        let joined = project.join("/");
        let joined = joined.trim_end_matches(".git").trim_end_matches('.');
        found.push((whole.start(), format!("https://gitlab.com/{}", joined)));
    }

    found.sort_by_key(|(pos, _)| *pos);
    dedup(found.into_iter().map(|(_, url)| url))
}

/// Hugging Face dataset ids linked from `text`
pub fn dataset_mentions(text: &str) -> Vec<String> {
    let Some(p) = patterns() else {
        return Vec::new();
    };
    dedup(
        p.hub_dataset
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('.').to_string()),
    )
}

/// Number of fenced code blocks in markdown
pub fn fenced_code_blocks(markdown: &str) -> usize {
    markdown
        .lines()
        .filter(|line| line.trim_start().starts_with("```"))
        .count()
        / 2
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
            out.push(item);
        }
    }
    out
}
