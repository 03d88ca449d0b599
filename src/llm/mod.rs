pub mod json;
pub mod queue;


use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::schema::SchemaSpec;

pub use queue::{LLMQueue, Priority};

/// One schema-aware model call for one stage.
#[derive(Clone, Debug)]
pub struct LlmRequest {
    pub stage: String,
    pub prompt: String,
    pub schema: Arc<SchemaSpec>,
    pub priority: Priority,
}

/// The call/response collaborator every stage goes through.
#[async_trait]
pub trait LlmCall: Send + Sync {
    async fn call(&self, request: LlmRequest) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat completion client.
#[derive(Clone)]
pub struct LLMClient {
    pub client: Client<OpenAIConfig>,
    pub model: String,
    temperature: f32,
    seed: Option<i64>,
    max_tokens: u32,
    json_mode: bool,
}

impl LLMClient {
    pub fn new(api_key: String, base_url: Option<String>, model: String) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        let client = Client::with_config(config);
        Self {
            client,
            model,
            temperature: crate::constants::llm::DEFAULT_TEMPERATURE,
            seed: None,
            max_tokens: crate::constants::llm::DEFAULT_MAX_TOKENS,
            json_mode: false,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let mut client = Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
            config.model.clone(),
        );
        client.temperature = config.temperature;
        client.seed = config.seed;
        client.max_tokens = config.max_tokens;
        client.json_mode = config.json_mode;
        client
    }

    /// System prompt that pins the reply to the stage's JSON shape.
    pub fn system_prompt(schema: &SchemaSpec) -> String {
        format!(
            "请根据用户的要求，严格按照JSON格式输出结果。你必须输出有效的JSON对象。\n\n\
             JSON格式示例：\n{}\n\n\
             请确保：\n\
             1. 输出内容必须是有效的JSON\n\
             2. 所有字符串值都用双引号包围\n\
             3. 不要添加任何JSON之外的说明文字\n\
             4. 枚举字段只能取示例中列出的值，数值字段必须落在给定范围内\n",
            schema.example_text()
        )
    }

    #[allow(deprecated)]
    pub async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String, LlmError> {
        info!("🤖 Sending request to LLM (Model: {})...", self.model);

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system_prompt)
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user_input)
                        .build()?,
                ),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        if let Some(seed) = self.seed {
            args.seed(seed);
        }
        if self.json_mode {
            args.response_format(ResponseFormat::JsonObject);
        }
        let request = args.build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!("🤖 LLM Response received ({} chars).", content.chars().count());
        Ok(content)
    }
}

#[async_trait]
impl LlmCall for LLMClient {
    async fn call(&self, request: LlmRequest) -> Result<String, LlmError> {
        debug!("🤖 [LLM] {} prompt: {}", request.stage, request.prompt);
        let system_prompt = Self::system_prompt(&request.schema);
        self.chat(&system_prompt, &request.prompt).await
    }
}
