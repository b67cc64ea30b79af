// RequestBuilder - chainable builder for MessageRequest

use super::{Message, MessageRequest, Role, ToolDefinition};

pub struct RequestBuilder {
    model: String,
    system: Option<String>,
    messages: Vec<Message>,
    tools: Option<Vec<ToolDefinition>>,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl RequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages: Vec::new(),
            tools: None,
            max_tokens: 4000,
            temperature: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> Result<MessageRequest, &'static str> {
        if self.messages.is_empty() {
            return Err("messages cannot be empty");
        }

        // Validate: first message must be user role
        if self.messages.first().map(|m| &m.role) != Some(&Role::User) {
            return Err("first message must have user role");
        }

        Ok(MessageRequest {
            model: self.model,
            system: self.system.filter(|s| !s.is_empty()),
            messages: self.messages,
            tools: self.tools.filter(|t| !t.is_empty()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }
}
