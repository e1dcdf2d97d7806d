//! Merge-by-URL: the union strategy used by background headline refreshes.

use std::collections::HashSet;

use super::model::{Article, GeopoliticalNews};

/// Merges freshly fetched articles into the list currently on display.
///
/// - URLs not already displayed are prepended, in incoming order, with
///   `is_new` set.
/// - Previously "new" articles lose their flag.
/// - Duplicate URLs inside `incoming` are collapsed to their first occurrence.
/// - The result never exceeds `limit`; older articles fall off the end.
///
/// When every incoming URL is already displayed the result is `existing`
/// with all flags cleared (and truncated to `limit`).
pub fn merge_by_url(existing: &[Article], incoming: &[Article], limit: usize) -> Vec<Article> {
    let mut seen: HashSet<&str> = existing.iter().map(|a| a.url.as_str()).collect();

    let fresh = incoming.iter().filter(|a| seen.insert(a.url.as_str())).map(|a| Article {
        is_new: true,
        ..a.clone()
    });

    let kept = existing.iter().map(|a| Article {
        is_new: false,
        ..a.clone()
    });

    fresh.chain(kept).take(limit).collect()
}

impl GeopoliticalNews {
    /// Applies a background refresh result to the displayed board.
    ///
    /// Supporters and opponents are merged by URL; country groups are
    /// replaced outright without highlighting.
    pub fn absorb(&mut self, fresh: GeopoliticalNews, limit: usize) {
        self.supporters = merge_by_url(&self.supporters, &fresh.supporters, limit);
        self.opponents = merge_by_url(&self.opponents, &fresh.opponents, limit);
        self.countries = fresh.countries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::model::CountryNews;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn article(url: &str) -> Article {
        Article::new(format!("Title {url}"), "Summary", url, "test")
    }

    fn urls(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.url.as_str()).collect()
    }

    #[test]
    fn test_new_urls_prepended_and_flagged() {
        let existing = vec![article("b"), article("c")];
        let incoming = vec![article("a"), article("b")];

        let merged = merge_by_url(&existing, &incoming, 15);

        assert_eq!(urls(&merged), vec!["a", "b", "c"]);
        assert!(merged[0].is_new);
        assert!(!merged[1].is_new);
        assert!(!merged[2].is_new);
    }

    #[test]
    fn test_previous_new_flags_cleared() {
        let mut flagged = article("b");
        flagged.is_new = true;
        let existing = vec![flagged];

        let merged = merge_by_url(&existing, &[article("a")], 15);

        assert_eq!(urls(&merged), vec!["a", "b"]);
        assert!(merged[0].is_new);
        assert!(!merged[1].is_new);
    }

    #[test]
    fn test_subset_incoming_only_clears_flags() {
        let mut flagged = article("a");
        flagged.is_new = true;
        let existing = vec![flagged, article("b")];

        let merged = merge_by_url(&existing, &[article("b")], 15);

        assert_eq!(urls(&merged), vec!["a", "b"]);
        assert!(merged.iter().all(|a| !a.is_new));
    }

    #[test]
    fn test_truncates_to_limit_keeping_newest() {
        let existing: Vec<Article> = (0..15).map(|i| article(&format!("old-{i}"))).collect();
        let incoming = vec![article("new-0"), article("new-1")];

        let merged = merge_by_url(&existing, &incoming, 15);

        assert_eq!(merged.len(), 15);
        assert_eq!(urls(&merged)[..3].to_vec(), vec!["new-0", "new-1", "old-0"]);
        assert_eq!(merged.last().unwrap().url, "old-12");
    }

    #[test]
    fn test_duplicate_incoming_urls_collapsed() {
        let merged = merge_by_url(&[], &[article("a"), article("a")], 15);
        assert_eq!(urls(&merged), vec!["a"]);
    }

    #[test]
    fn test_identity_is_url_only() {
        let existing = vec![article("a")];
        let mut edited = article("a");
        edited.title = "Completely different title".to_string();

        let merged = merge_by_url(&existing, &[edited], 15);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Title a");
        assert!(!merged[0].is_new);
    }

    #[test]
    fn test_absorb_replaces_countries_and_merges_sides() {
        let mut board = GeopoliticalNews {
            supporters: vec![article("s1")],
            opponents: vec![article("o1")],
            countries: vec![CountryNews {
                country_name: "Old".to_string(),
                articles: vec![article("c-old")],
            }],
        };
        let fresh = GeopoliticalNews {
            supporters: vec![article("s2"), article("s1")],
            opponents: vec![article("o1")],
            countries: vec![CountryNews {
                country_name: "New".to_string(),
                articles: vec![article("c-new")],
            }],
        };

        board.absorb(fresh, 15);

        assert_eq!(urls(&board.supporters), vec!["s2", "s1"]);
        assert!(board.supporters[0].is_new);
        assert_eq!(urls(&board.opponents), vec!["o1"]);
        assert!(!board.opponents[0].is_new);
        assert_eq!(board.countries.len(), 1);
        assert_eq!(board.countries[0].country_name, "New");
        assert!(!board.countries[0].articles[0].is_new);
    }

    fn url_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-f]{1,2}", 0..25)
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_limit(existing in url_list(), incoming in url_list(), limit in 0usize..20) {
            let existing: Vec<Article> = existing.iter().map(|u| article(u)).collect();
            let incoming: Vec<Article> = incoming.iter().map(|u| article(u)).collect();
            let merged = merge_by_url(&existing, &incoming, limit);
            prop_assert!(merged.len() <= limit);
        }

        #[test]
        fn prop_new_articles_lead(existing in url_list(), incoming in url_list()) {
            let existing: Vec<Article> = existing.iter().map(|u| article(u)).collect();
            let incoming: Vec<Article> = incoming.iter().map(|u| article(u)).collect();
            let merged = merge_by_url(&existing, &incoming, 100);
            // Once a non-new article appears, no new one follows it
            let first_old = merged.iter().position(|a| !a.is_new).unwrap_or(merged.len());
            prop_assert!(merged[first_old..].iter().all(|a| !a.is_new));
        }

        #[test]
        fn prop_subset_is_idempotent(existing in url_list(), picks in prop::collection::vec(any::<prop::sample::Index>(), 0..10)) {
            let existing: Vec<Article> = existing.iter().map(|u| article(u)).collect();
            prop_assume!(!existing.is_empty());
            let incoming: Vec<Article> = picks.iter().map(|i| existing[i.index(existing.len())].clone()).collect();
            let merged = merge_by_url(&existing, &incoming, 100);
            prop_assert!(merged.iter().all(|a| !a.is_new));
            prop_assert_eq!(merged.len(), existing.len());
        }
    }
}
