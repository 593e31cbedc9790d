//! Role definitions — what an agent is, expressed as data.

use serde::{Deserialize, Serialize};

/// A role an agent can play.
///
/// Built-in roles cover HR, project management, and technical leadership;
/// anything else is a [`custom`](Self::custom) role with its own prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Stable identifier, e.g. `technical_lead`. Passed to governance as the
    /// acting role.
    pub key: String,
    /// Display name.
    pub name: String,
    pub base_prompt: String,
    /// Fixed instructions that keep the agent inside its remit.
    #[serde(default)]
    pub boundary_text: String,
    /// Prepended to the first prompt of a fresh conversation only.
    #[serde(default)]
    pub first_turn_marker: Option<String>,
}

impl RoleDefinition {
    pub fn custom(
        key: impl Into<String>,
        name: impl Into<String>,
        base_prompt: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            base_prompt: base_prompt.into(),
            boundary_text: String::new(),
            first_turn_marker: None,
        }
    }

    pub fn with_boundary_text(mut self, text: impl Into<String>) -> Self {
        self.boundary_text = text.into();
        self
    }

    pub fn with_first_turn_marker(mut self, marker: impl Into<String>) -> Self {
        self.first_turn_marker = Some(marker.into());
        self
    }

    pub fn with_base_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.base_prompt = prompt.into();
        self
    }

    pub fn hr_specialist() -> Self {
        Self::custom(
            "hr_specialist",
            "HR Specialist",
            "You are an HR specialist. You help with hiring, onboarding, employee relations, \
             benefits, and workplace policy questions.",
        )
        .with_boundary_text(
            "Do not give legal advice or make final employment decisions. Treat all personnel \
             information as confidential and refer legal or medical matters to the appropriate \
             professional.",
        )
        .with_first_turn_marker("[HR consultation]")
    }

    pub fn project_manager() -> Self {
        Self::custom(
            "project_manager",
            "Project Manager",
            "You are a project manager. You help plan work, track milestones, manage risks, \
             and coordinate stakeholders.",
        )
        .with_boundary_text(
            "Do not commit budget, headcount, or deadlines on anyone's behalf. Flag technical \
             design questions for the technical lead.",
        )
        .with_first_turn_marker("[Project planning session]")
    }

    pub fn technical_lead() -> Self {
        Self::custom(
            "technical_lead",
            "Technical Lead",
            "You are a technical lead. You help with architecture, code review, technical \
             trade-offs, and engineering practices.",
        )
        .with_boundary_text(
            "Do not approve production changes or security exceptions on your own authority. \
             Recommend review by the responsible owner when a decision carries operational risk.",
        )
        .with_first_turn_marker("[Technical review]")
    }

    /// Look up a built-in role. Accepts `-` or `_` as separators.
    pub fn builtin(key: &str) -> Option<Self> {
        match key.replace('-', "_").as_str() {
            "hr_specialist" | "hr" => Some(Self::hr_specialist()),
            "project_manager" | "pm" => Some(Self::project_manager()),
            "technical_lead" | "tech_lead" => Some(Self::technical_lead()),
            _ => None,
        }
    }

    pub fn builtins() -> Vec<Self> {
        vec![
            Self::hr_specialist(),
            Self::project_manager(),
            Self::technical_lead(),
        ]
    }

    /// Base prompt followed by the boundary text.
    pub fn system_prompt(&self) -> String {
        match (self.base_prompt.is_empty(), self.boundary_text.is_empty()) {
            (_, true) => self.base_prompt.clone(),
            (true, false) => self.boundary_text.clone(),
            (false, false) => format!("{}\n\n{}", self.base_prompt, self.boundary_text),
        }
    }

    /// Apply the first-turn marker to `prompt`.
    pub fn frame_first_prompt(&self, prompt: &str) -> String {
        match &self.first_turn_marker {
            Some(marker) => format!("{marker} {prompt}"),
            None => prompt.to_string(),
        }
    }
}
