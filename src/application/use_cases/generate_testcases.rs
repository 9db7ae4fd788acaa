use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::persona::{Persona, PersonaRow};
use crate::domain::testcase::{TestCase, TestCaseRow, TestCategory};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parsed shape of the model reply. Both keys are optional: an absent array
/// is an empty table, not an error.
#[derive(Debug, Default, Serialize, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    testcases: Vec<TestCase>,
    #[serde(default)]
    personas: Vec<Persona>,
}

/// The two tables the front-end renders. Row order follows reply order.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationResult {
    pub testcases: Vec<TestCaseRow>,
    pub personas: Vec<PersonaRow>,
}

pub struct GenerateTestCasesUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
}

impl GenerateTestCasesUseCase {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self { llm_client }
    }

    /// Generates test cases and personas for a user story.
    ///
    /// The caller is expected to reject blank stories before calling; an
    /// empty `categories` slice asks the model for all categories. One
    /// outbound model call per invocation, no retries.
    pub async fn execute(
        &self,
        config: &LLMConfig,
        story: &str,
        categories: &[TestCategory],
        language: &str,
    ) -> Result<GenerationResult> {
        let language = normalize_language(language);
        let system_prompt = build_generation_system_prompt(&language);
        let user_prompt = build_generation_user_prompt(story, categories, &language);

        let raw_output = self
            .llm_client
            .generate(config, &system_prompt, &user_prompt)
            .await?;
        let cleaned = clean_llm_response(&raw_output);
        let parsed = parse_generation_reply(&cleaned)?;

        let testcases = parsed
            .testcases
            .iter()
            .enumerate()
            .map(|(index, case)| TestCaseRow::from_case(case, index + 1))
            .collect();
        let personas = parsed.personas.iter().map(PersonaRow::from_persona).collect();

        Ok(GenerationResult {
            testcases,
            personas,
        })
    }
}

fn normalize_language(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "Deutsch".to_string()
    } else {
        trimmed.to_string()
    }
}

fn build_generation_system_prompt(language: &str) -> String {
    format!(
        "You are an experienced test manager in an agile banking environment. You write precise, practical test cases in {}. Return the answer exclusively as JSON, without explanatory text.",
        language
    )
}

fn build_generation_user_prompt(
    story: &str,
    categories: &[TestCategory],
    language: &str,
) -> String {
    let category_text = if categories.is_empty() {
        "all categories".to_string()
    } else {
        categories
            .iter()
            .map(|category| category.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut body = String::new();
    body.push_str("Generate test cases and test users (personas) for the user story below.\n\n");
    body.push_str("User story:\n\"\"\"\n");
    body.push_str(story);
    body.push_str("\n\"\"\"\n\n");
    body.push_str(&format!("Response language: {}\n\n", language));
    body.push_str("Requirements for the output:\n\n");
    body.push_str(&format!(
        "1) Generate test cases in the following categories: {}.\n",
        category_text
    ));
    body.push_str("2) For each test case:\n");
    body.push_str("   - id (string, e.g. TC-001, TC-002 ...)\n");
    body.push_str("   - category (\"Positive\", \"Negative\" or \"Edge\")\n");
    body.push_str("   - title\n");
    body.push_str("   - preconditions\n");
    body.push_str("   - steps (list of steps)\n");
    body.push_str("   - expected_result\n");
    body.push_str("   - priority (\"Hoch\", \"Mittel\" or \"Niedrig\")\n\n");
    body.push_str("3) Additionally generate 2-4 test users/personas with:\n");
    body.push_str("   - name\n");
    body.push_str("   - role\n");
    body.push_str("   - permissions\n");
    body.push_str("   - attributes\n");
    body.push_str("   - relevance\n\n");
    body.push_str("Return the result exactly in the following JSON format:\n\n");
    body.push_str(
        r#"{
  "testcases": [
    {
      "id": "TC-001",
      "category": "Positive",
      "title": "...",
      "preconditions": "...",
      "steps": ["Step 1", "Step 2"],
      "expected_result": "...",
      "priority": "Hoch"
    }
  ],
  "personas": [
    {
      "name": "...",
      "role": "...",
      "permissions": "...",
      "attributes": "...",
      "relevance": "..."
    }
  ]
}
"#,
    );
    body
}

/// Direct JSON parse first; if that fails, one slice from the first `{` to
/// the last `}` inclusive. The slice is a best-effort recovery for replies
/// wrapped in prose and is knowingly fragile around nested braces in
/// malformed outer objects.
fn parse_generation_reply(reply: &str) -> Result<GenerationOutput> {
    let trimmed = reply.trim();
    if let Ok(parsed) = serde_json::from_str::<GenerationOutput>(trimmed) {
        return Ok(parsed);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<GenerationOutput>(&trimmed[start..=end]) {
                return Ok(parsed);
            }
        }
    }

    Err(AppError::ParseError(format!(
        "The model reply could not be read as JSON | reply_snippet={}",
        preview_text(trimmed, 600)
    )))
}

fn preview_text(value: &str, limit: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    let snippet: String = trimmed.chars().take(limit).collect();
    if trimmed.chars().count() > limit {
        format!("{}...", snippet)
    } else {
        snippet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeLlmClient {
        reply: String,
    }

    impl FakeLlmClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
            })
        }
    }

    #[async_trait]
    impl LLMClient for FakeLlmClient {
        async fn generate(&self, _config: &LLMConfig, _system: &str, _user: &str) -> Result<String> {
            Ok(self.reply.clone())
        }

        async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct FailingLlmClient;

    #[async_trait]
    impl LLMClient for FailingLlmClient {
        async fn generate(&self, _config: &LLMConfig, _system: &str, _user: &str) -> Result<String> {
            Err(AppError::LLMError("API error (401): unauthorized".to_string()))
        }

        async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
            Err(AppError::LLMError("API error (401): unauthorized".to_string()))
        }
    }

    async fn run_with_reply(reply: &str) -> Result<GenerationResult> {
        let use_case = GenerateTestCasesUseCase::new(FakeLlmClient::new(reply));
        use_case
            .execute(
                &LLMConfig::default(),
                "As a customer I want to log in",
                &[TestCategory::Positive, TestCategory::Negative],
                "",
            )
            .await
    }

    const FULL_REPLY: &str = r#"{
      "testcases": [
        {
          "id": "TC-001",
          "category": "Positive",
          "title": "Erfolgreicher Login",
          "preconditions": "Kunde ist registriert",
          "steps": ["App oeffnen", "Zugangsdaten eingeben", "Login bestaetigen"],
          "expected_result": "Kunde sieht die Kontouebersicht",
          "priority": "Hoch"
        },
        {
          "category": "Negative",
          "title": "Falsches Passwort",
          "preconditions": "",
          "steps": ["App oeffnen", "Falsches Passwort eingeben"],
          "expected_result": "Fehlermeldung wird angezeigt",
          "priority": "Mittel"
        }
      ],
      "personas": [
        {
          "name": "Maya",
          "role": "Privatkundin",
          "permissions": "Standardzugang",
          "attributes": "Nutzt die App taeglich",
          "relevance": "Hauptzielgruppe"
        }
      ]
    }"#;

    #[tokio::test]
    async fn test_row_counts_match_reply_object_counts() {
        let result = run_with_reply(FULL_REPLY).await.unwrap();
        assert_eq!(result.testcases.len(), 2);
        assert_eq!(result.personas.len(), 1);
    }

    #[tokio::test]
    async fn test_fields_carry_over_and_steps_are_joined() {
        let result = run_with_reply(FULL_REPLY).await.unwrap();
        let first = &result.testcases[0];
        assert_eq!(first.id, "TC-001");
        assert_eq!(first.category, "Positive");
        assert_eq!(first.title, "Erfolgreicher Login");
        assert_eq!(
            first.steps,
            "App oeffnen\nZugangsdaten eingeben\nLogin bestaetigen"
        );
        assert_eq!(first.priority, "Hoch");
        assert_eq!(result.personas[0].role, "Privatkundin");
    }

    #[tokio::test]
    async fn test_missing_id_gets_sequential_placeholder() {
        let result = run_with_reply(FULL_REPLY).await.unwrap();
        // Second case carries no id; the placeholder reflects its position.
        assert_eq!(result.testcases[1].id, "TC-002");
    }

    #[tokio::test]
    async fn test_reply_wrapped_in_prose_is_recovered() {
        let wrapped = format!("Here is the result:\n{}\nThanks", FULL_REPLY);
        let result = run_with_reply(&wrapped).await.unwrap();
        assert_eq!(result.testcases.len(), 2);
    }

    #[tokio::test]
    async fn test_reply_in_code_fence_is_recovered() {
        let fenced = format!("```json\n{}\n```", FULL_REPLY);
        let result = run_with_reply(&fenced).await.unwrap();
        assert_eq!(result.testcases.len(), 2);
    }

    #[tokio::test]
    async fn test_unrecoverable_reply_is_a_parse_error() {
        let err = run_with_reply("I cannot help with that.").await.unwrap_err();
        match err {
            AppError::ParseError(msg) => assert!(msg.contains("could not be read as JSON")),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_arrays_are_empty_tables_not_errors() {
        let result = run_with_reply(r#"{"testcases": [], "personas": []}"#)
            .await
            .unwrap();
        assert!(result.testcases.is_empty());
        assert!(result.personas.is_empty());
    }

    #[tokio::test]
    async fn test_absent_keys_are_empty_tables() {
        let result = run_with_reply("{}").await.unwrap();
        assert!(result.testcases.is_empty());
        assert!(result.personas.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_propagates_unchanged() {
        let use_case = GenerateTestCasesUseCase::new(Arc::new(FailingLlmClient));
        let err = use_case
            .execute(&LLMConfig::default(), "story", &[], "")
            .await
            .unwrap_err();
        match err {
            AppError::LLMError(msg) => assert!(msg.contains("401")),
            other => panic!("expected LLMError, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_categories_request_all_categories() {
        let prompt = build_generation_user_prompt("story", &[], "Deutsch");
        assert!(prompt.contains("categories: all categories."));
    }

    #[test]
    fn test_selected_categories_are_listed_in_order() {
        let prompt = build_generation_user_prompt(
            "story",
            &[TestCategory::Negative, TestCategory::Edge],
            "Deutsch",
        );
        assert!(prompt.contains("categories: Negative, Edge."));
    }

    #[test]
    fn test_blank_language_defaults_to_german() {
        assert_eq!(normalize_language("  "), "Deutsch");
        assert_eq!(normalize_language("English"), "English");
    }

    #[test]
    fn test_parse_fallback_slices_first_to_last_brace() {
        let parsed =
            parse_generation_reply("noise {\"testcases\": [{\"title\": \"x\"}]} trailing").unwrap();
        assert_eq!(parsed.testcases.len(), 1);
        assert_eq!(parsed.testcases[0].title, "x");
    }
}
