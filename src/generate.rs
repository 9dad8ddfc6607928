//! Code generation through a forced function call. The model judges the
//! request and returns its result as structured arguments instead of free
//! text, so the reply parses without fence scraping.

use crate::config::{ApiConfig, Credentials};
use crate::error::CoachError;
use crate::language::language_display_name;
use crate::llm::client::{ChatRequest, ChatResponse, ChatTransport};
use crate::llm::tools::{generation_tool, generation_tool_choice, GENERATION_TOOL_NAME};
use crate::mask::{mask_sensitive_data, truncate_code};
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

/// Added to both system prompts so the model fills the tool arguments.
const VALIDITY_INSTRUCTION: &str = "\n\nまず指示がコード生成・変更の要求として適切かどうかを判断してください。不適切な場合は isValidRequest を false にし、reason に理由を書いてください。結果は必ず submit_generated_code 関数で返してください。";

/// A natural-language generation or modification request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub language: String,
    /// Starting point for modification. Empty or absent means generate
    /// from scratch.
    pub existing_code: Option<String>,
}

/// Outcome of a generation request. `is_valid_request` is the model's own
/// judgment of the prompt; on a malformed reply it is forced false and
/// `code` carries the caller's code unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub code: String,
    pub is_valid_request: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedArgs {
    #[serde(rename = "isValidRequest")]
    is_valid_request: bool,
    #[serde(default)]
    code: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Single-shot generation adapter over the chat transport.
pub struct CodeGenerator {
    transport: Arc<dyn ChatTransport>,
    credentials: Credentials,
    config: ApiConfig,
}

impl CodeGenerator {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        credentials: Credentials,
        config: ApiConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            config,
        }
    }

    /// Generate new code or modify the existing buffer. Transport and
    /// credential failures propagate; a malformed structured reply soft
    /// fails instead of throwing away the caller's code.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GeneratedCode, CoachError> {
        let Some(api_key) = self.credentials.api_key() else {
            return Err(CoachError::MissingCredential);
        };

        let lang_name = language_display_name(&request.language);
        let existing = request
            .existing_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .map(|code| truncate_code(&mask_sensitive_data(code)));

        let (system_prompt, user_prompt) = match &existing {
            Some(code) => (
                modify_system_prompt(&lang_name),
                modify_user_prompt(&lang_name, &request.language, code, &request.prompt),
            ),
            None => (
                create_system_prompt(&lang_name),
                create_user_prompt(&lang_name, &request.prompt),
            ),
        };

        let chat_request = ChatRequest::with_tool(
            &self.config.for_generation(),
            &system_prompt,
            &user_prompt,
            generation_tool(),
            generation_tool_choice(),
        );

        let response = self.transport.complete(&api_key, &chat_request).await?;
        let fallback_code = request.existing_code.unwrap_or_default();
        Ok(interpret_reply(response, fallback_code))
    }
}

fn interpret_reply(response: ChatResponse, fallback_code: String) -> GeneratedCode {
    let arguments = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.tool_calls)
        .and_then(|calls| {
            calls
                .into_iter()
                .find(|call| call.function.name == GENERATION_TOOL_NAME)
        })
        .map(|call| call.function.arguments);

    let Some(arguments) = arguments else {
        tracing::debug!("generation reply carried no tool call");
        return GeneratedCode {
            code: fallback_code,
            is_valid_request: false,
            reason: Some("構造化された応答を取得できませんでした".to_string()),
        };
    };

    match serde_json::from_str::<GeneratedArgs>(&arguments) {
        Ok(args) => GeneratedCode {
            code: strip_code_fences(&args.code),
            is_valid_request: args.is_valid_request,
            reason: args.reason,
        },
        Err(err) => {
            tracing::debug!("unparseable generation arguments: {}", err);
            GeneratedCode {
                code: fallback_code,
                is_valid_request: false,
                reason: Some("構造化された応答を解析できませんでした".to_string()),
            }
        }
    }
}

/// Strip one surrounding Markdown code fence, if present.
fn strip_code_fences(code: &str) -> String {
    let opening = Regex::new(r"^```[a-zA-Z]*\n").unwrap();
    let closing = Regex::new(r"\n```$").unwrap();
    let stripped = opening.replace(code, "");
    let stripped = closing.replace(&stripped, "");
    stripped.trim().to_string()
}

fn modify_system_prompt(lang_name: &str) -> String {
    format!(
        r#"あなたは{lang_name}のコード変更・改善アシスタントです。
既存のコードを起点として、ユーザーの要求に基づいて変更・改善・機能追加を行ってください。
完全に新しいコードで置き換えるのではなく、既存のコードを活かしながら変更してください。

重要な指示:
1. 変更されたコード全体を返してください。説明や追加のテキストは不要です。
2. 既存のコードの良い部分は残しつつ、要求された変更を加えてください。
3. 適切なエラーハンドリングを含めてください。
4. 必要に応じてコメントを追加してください。
5. {lang_name}の慣習に従ったコーディングスタイルを使用してください。
6. 既存の変数名や関数名、構造をできるだけ維持してください。
7. コメントでは日本語と英語の間に半角スペースを入れてください（例：「JavaScript のコード」「API の使用」）。{VALIDITY_INSTRUCTION}"#
    )
}

fn create_system_prompt(lang_name: &str) -> String {
    format!(
        r#"あなたは{lang_name}のコード生成アシスタントです。
ユーザーの要求に基づいて、クリーンで読みやすく、ベストプラクティスに従った{lang_name}コードを生成してください。

重要な指示:
1. コードのみを返してください。説明や追加のテキストは不要です。
2. 適切なエラーハンドリングを含めてください。
3. 必要に応じてコメントを追加してください。
4. {lang_name}の慣習に従ったコーディングスタイルを使用してください。
5. コメントでは日本語と英語の間に半角スペースを入れてください（例：「JavaScript のコード」「API の使用」）。{VALIDITY_INSTRUCTION}"#
    )
}

fn modify_user_prompt(lang_name: &str, language: &str, code: &str, prompt: &str) -> String {
    format!(
        r#"現在の{lang_name}コード:
```{language}
{code}
```

以下の要求に基づいて上記のコードを変更・改善してください：
{prompt}

変更されたコード全体を返してください。"#
    )
}

fn create_user_prompt(lang_name: &str, prompt: &str) -> String {
    format!(
        r#"以下の要求に基づいて{lang_name}コードを生成してください：

{prompt}

コードのみを返してください。"#
    )
}
