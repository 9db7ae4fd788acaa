use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strips reasoning artifacts some models wrap around their JSON payload.
/// Runs before any parse attempt; it never touches the payload itself.
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = response.to_string();

    cleaned = THINK_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    cleaned = cleaned.trim().to_string();

    cleaned = MULTIPLE_NEWLINES_PATTERN
        .replace_all(&cleaned, "\n\n")
        .to_string();

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_think_tags() {
        let input = "<think>Which categories apply here?</think>{\"testcases\": []}";
        assert_eq!(clean_llm_response(input), "{\"testcases\": []}");
    }

    #[test]
    fn test_clean_self_closing_think() {
        let input = "<think/>{\"testcases\": []}";
        assert_eq!(clean_llm_response(input), "{\"testcases\": []}");
    }

    #[test]
    fn test_clean_reasoning_tags() {
        let input = "<reasoning>internal</reasoning>{\"personas\": []}";
        assert_eq!(clean_llm_response(input), "{\"personas\": []}");
    }

    #[test]
    fn test_clean_collapses_newline_runs() {
        let input = "Here is the JSON:\n\n\n\n{}";
        assert_eq!(clean_llm_response(input), "Here is the JSON:\n\n{}");
    }

    #[test]
    fn test_clean_preserves_plain_replies() {
        let input = "{\"testcases\": [], \"personas\": []}";
        assert_eq!(clean_llm_response(input), input);
    }
}
