//! `RequestOptions` — the value threaded from an agent, through governance,
//! into a provider adapter.
//!
//! Options are built fresh for every request and handed between pipeline
//! stages by value. A stage that wants to change something returns a new
//! value; nothing holds a shared mutable reference to an in-flight request.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Separator placed between independently appended system-prompt sections.
pub const SECTION_SEPARATOR: &str = "\n\n";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Everything a provider needs to complete one chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// The user's prompt for this turn. Must be non-empty.
    pub prompt: String,

    /// System instructions. Governance plugins only ever append to this.
    #[serde(default)]
    pub system_prompt: String,

    /// Sampling temperature in `[0.0, 2.0]`.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate. Must be > 0.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Prior turns, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_history: Vec<Message>,

    /// Model override; adapters fall back to their configured model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Acting agent, used for governance-context lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// End user on whose behalf the agent acts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Role key of the acting agent (e.g. "technical_lead").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl RequestOptions {
    /// Create options for a prompt with default sampling parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            conversation_history: Vec::new(),
            model: None,
            agent_id: None,
            user_id: None,
            role: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Return a copy with `section` appended to the system prompt.
    ///
    /// Sections are joined with a blank line; an empty prompt takes the
    /// section as-is.
    pub fn with_appended_system_prompt(&self, section: &str) -> Self {
        let mut next = self.clone();
        if !next.system_prompt.is_empty() {
            next.system_prompt.push_str(SECTION_SEPARATOR);
        }
        next.system_prompt.push_str(section);
        next
    }

    /// Whether `other` differs from `self` only by text appended to the end of
    /// the system prompt.
    pub fn is_append_only_change(&self, other: &Self) -> bool {
        other.system_prompt.starts_with(&self.system_prompt)
            && self.prompt == other.prompt
            && self.temperature == other.temperature
            && self.max_tokens == other.max_tokens
            && self.conversation_history == other.conversation_history
            && self.model == other.model
            && self.agent_id == other.agent_id
            && self.user_id == other.user_id
            && self.role == other.role
    }

    /// Check the structural invariants a provider relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt must not be empty".into());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 2.0 (got {})",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = RequestOptions::new("hello");
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 1024);
        assert!(opts.system_prompt.is_empty());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn append_leaves_original_untouched() {
        let base = RequestOptions::new("q").with_system_prompt("You are helpful.");
        let next = base.with_appended_system_prompt("Be careful.");
        assert_eq!(base.system_prompt, "You are helpful.");
        assert_eq!(next.system_prompt, "You are helpful.\n\nBe careful.");
        assert!(base.is_append_only_change(&next));
    }

    #[test]
    fn append_to_empty_prompt_has_no_separator() {
        let next = RequestOptions::new("q").with_appended_system_prompt("Policy");
        assert_eq!(next.system_prompt, "Policy");
    }

    #[test]
    fn replacing_prompt_is_not_append_only() {
        let base = RequestOptions::new("q").with_system_prompt("original");
        let replaced = base.clone().with_system_prompt("something else");
        assert!(!base.is_append_only_change(&replaced));

        let retargeted = base.clone().with_temperature(1.5);
        assert!(!base.is_append_only_change(&retargeted));
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert!(RequestOptions::new("   ").validate().is_err());
        assert!(RequestOptions::new("q").with_temperature(2.5).validate().is_err());
        assert!(RequestOptions::new("q").with_temperature(-0.1).validate().is_err());
        assert!(RequestOptions::new("q").with_max_tokens(0).validate().is_err());
        assert!(RequestOptions::new("q").with_temperature(2.0).validate().is_ok());
    }

    #[test]
    fn serde_skips_empty_optionals() {
        let json = serde_json::to_string(&RequestOptions::new("q")).unwrap();
        assert!(!json.contains("agent_id"));
        assert!(!json.contains("conversation_history"));
        let parsed: RequestOptions = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(parsed, RequestOptions::new("hi"));
    }
}
