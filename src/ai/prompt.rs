//! Prompt text for the two categorization operations.

use crate::language::Language;

pub(super) fn categorize_prompt(language: Language, feed_text: &str) -> String {
    let lang = language.english_name();
    format!(
        "You are an expert news analyst. Analyze the provided RSS feed content. \
For each article, extract the title and URL and write a concise, neutral summary \
of about 2-3 sentences in {lang}. Also assign a suitable, relevant category in {lang} \
to each article (for example \"Technology\", \"Politics\", \"Economy\", \"Science\").\n\
The final output must be a JSON array of articles. Each article in the array must be an \
object with the keys 'title', 'summary', 'url' and 'category'.\n\n\
The RSS content follows:\n{feed_text}\n"
    )
}

pub(super) fn geopolitical_prompt(language: Language, feed_text: &str) -> String {
    let lang = language.english_name();
    format!(
        "You are a geopolitical news analyst specializing in the Middle East. You will be \
given a set of RSS feed articles. Your task is to analyze and categorize them.\n\n\
First, identify the main subject of each article. Then group the articles into the \
following categories:\n\
1. **supporters_of_resistance**: news about groups and countries generally considered \
part of the \"Axis of Resistance\".\n\
2. **opponents_of_resistance**: news about groups and countries generally considered \
opposed to the \"Axis of Resistance\".\n\
3. **countries**: news mainly about the domestic affairs or general news of one specific \
country. Group these by country name, written in {lang}.\n\n\
For each article provide:\n\
- The original article title.\n\
- A concise, neutral summary in {lang} (2-3 sentences).\n\
- The original article URL.\n\
- The category name ('supporters_of_resistance', 'opponents_of_resistance' or the \
country name in {lang}).\n\n\
Limit the results to at most 5 important articles per category.\n\n\
Return the result as a single JSON object matching the schema. Your response must \
contain only JSON and no other text.\n\n\
RSS content:\n{feed_text}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_is_named_in_prompt() {
        let prompt = categorize_prompt(Language::De, "<rss/>");
        assert!(prompt.contains("in German"));
        assert!(prompt.ends_with("<rss/>\n"));
    }

    #[test]
    fn test_geopolitical_prompt_names_groups() {
        let prompt = geopolitical_prompt(Language::Fa, "feed");
        assert!(prompt.contains("supporters_of_resistance"));
        assert!(prompt.contains("opponents_of_resistance"));
        assert!(prompt.contains("Persian (Farsi)"));
        assert!(prompt.contains("at most 5"));
    }
}
