use serde::{Deserialize, Serialize};

/// Category label used when the AI service returns a blank category.
pub const UNCATEGORIZED: &str = "Uncategorized";

// ============================================================================
// Article
// ============================================================================

/// A summarized article as returned by the AI service.
///
/// Identity is the URL: two articles with the same `url` are the same article
/// regardless of any other field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Transient display flag set by merge-by-URL. Never persisted in a
    /// cache entry; the next merge resets it on every article already shown.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        url: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            url: url.into(),
            category: category.into(),
            image_url: None,
            is_new: false,
        }
    }
}

// ============================================================================
// Categorized Articles
// ============================================================================

/// One category and its articles, in AI output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub articles: Vec<Article>,
}

/// Articles grouped by free-form category name.
///
/// Group order is the order in which each category first appeared in the
/// AI output. That order is not stable across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedArticles {
    groups: Vec<CategoryGroup>,
}

impl CategorizedArticles {
    /// Groups articles by trimmed category. A blank category falls into
    /// [`UNCATEGORIZED`].
    pub fn from_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let mut groups: Vec<CategoryGroup> = Vec::new();

        for mut article in articles {
            let category = match article.category.trim() {
                "" => UNCATEGORIZED.to_string(),
                trimmed => trimmed.to_string(),
            };
            article.category.clone_from(&category);

            match groups.iter_mut().find(|g| g.category == category) {
                Some(group) => group.articles.push(article),
                None => groups.push(CategoryGroup {
                    category,
                    articles: vec![article],
                }),
            }
        }

        Self { groups }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.category.as_str())
    }

    pub fn get(&self, category: &str) -> Option<&[Article]> {
        self.groups
            .iter()
            .find(|g| g.category == category)
            .map(|g| g.articles.as_slice())
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of articles across all categories.
    pub fn article_count(&self) -> usize {
        self.groups.iter().map(|g| g.articles.len()).sum()
    }
}

// ============================================================================
// Geopolitical News
// ============================================================================

/// Articles about one country's domestic affairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryNews {
    pub country_name: String,
    pub articles: Vec<Article>,
}

/// The fixed three-way grouping shown by the headlines carousel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeopoliticalNews {
    pub supporters: Vec<Article>,
    pub opponents: Vec<Article>,
    pub countries: Vec<CountryNews>,
}

impl GeopoliticalNews {
    pub fn is_empty(&self) -> bool {
        self.supporters.is_empty() && self.opponents.is_empty() && self.countries.is_empty()
    }

    pub fn new_count(&self) -> usize {
        self.supporters
            .iter()
            .chain(self.opponents.iter())
            .filter(|a| a.is_new)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article(url: &str, category: &str) -> Article {
        Article::new(format!("Title {url}"), "Summary", url, category)
    }

    #[test]
    fn test_grouping_preserves_first_appearance_order() {
        let grouped = CategorizedArticles::from_articles(vec![
            article("https://a.example/1", "Technology"),
            article("https://a.example/2", "Politics"),
            article("https://a.example/3", "Technology"),
        ]);

        let categories: Vec<&str> = grouped.categories().collect();
        assert_eq!(categories, vec!["Technology", "Politics"]);
        assert_eq!(grouped.get("Technology").unwrap().len(), 2);
        assert_eq!(grouped.article_count(), 3);
    }

    #[test]
    fn test_blank_category_becomes_uncategorized() {
        let grouped = CategorizedArticles::from_articles(vec![
            article("https://a.example/1", "   "),
            article("https://a.example/2", ""),
        ]);

        assert_eq!(grouped.categories().collect::<Vec<_>>(), vec![UNCATEGORIZED]);
        assert_eq!(grouped.get(UNCATEGORIZED).unwrap()[0].category, UNCATEGORIZED);
    }

    #[test]
    fn test_category_is_trimmed() {
        let grouped = CategorizedArticles::from_articles(vec![
            article("https://a.example/1", " Science "),
            article("https://a.example/2", "Science"),
        ]);
        assert_eq!(grouped.groups().len(), 1);
    }

    #[test]
    fn test_is_new_not_serialized_when_false() {
        let json = serde_json::to_string(&article("https://a.example/1", "X")).unwrap();
        assert!(!json.contains("isNew"));
        assert!(!json.contains("imageUrl"));
    }

    #[test]
    fn test_new_count_spans_both_camps() {
        let mut news = GeopoliticalNews {
            supporters: vec![Article {
                is_new: true,
                ..article("https://a.example/1", "s")
            }],
            opponents: vec![Article {
                is_new: true,
                ..article("https://a.example/2", "o")
            }],
            countries: Vec::new(),
        };
        assert_eq!(news.new_count(), 2);
        news.opponents[0].is_new = false;
        assert_eq!(news.new_count(), 1);
    }
}
