//! The skill catalog and its two agent-facing surfaces.

use crate::parser::{ParseError, Skill, parse_skill};
use deskflow_agent::SystemPromptAddendum;
use deskflow_core::{DeskError, Result, Tool};
use deskflow_tool::FunctionTool;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct SkillCatalog {
    skills: Vec<Skill>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    /// Load every `.md` skill under `root`. Files that fail to parse are
    /// logged and skipped so one bad skill does not take the catalog down.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut skills = Vec::new();

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let raw = std::fs::read_to_string(path)?;
            match parse_skill(&raw) {
                Ok(skill) => {
                    debug!(skill = %skill.name, path = %path.display(), "loaded skill");
                    skills.push(skill);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable skill");
                }
            }
        }

        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { skills })
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn find(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name.as_str()).collect()
    }

    /// The "Available Skills" block advertised to agents.
    pub fn summary_block(&self) -> String {
        let mut lines: Vec<String> = vec!["## Available Skills".to_string(), String::new()];
        for skill in &self.skills {
            lines.push(format!("- **{}**: {}", skill.name, skill.description));
        }
        lines.push(String::new());
        lines.push(
            "Use the load_skill tool when you need detailed information about handling a \
             specific type of request."
                .to_string(),
        );
        lines.join("\n")
    }

    /// Middleware that appends the catalog to an agent's system prompt.
    pub fn middleware(&self) -> Arc<SystemPromptAddendum> {
        Arc::new(SystemPromptAddendum::new(self.summary_block()))
    }

    fn load_by_name(&self, name: &str) -> Result<String> {
        match self.find(name) {
            Some(skill) => Ok(format!("Loaded skill: {}\n\n{}", skill.name, skill.body)),
            None => {
                let available = self.names().join(", ");
                Ok(format!("Skill '{name}' not found. Available skills: {available}"))
            }
        }
    }
}

/// The `load_skill` function tool over a shared catalog.
pub fn load_skill_tool(catalog: Arc<SkillCatalog>) -> Arc<dyn Tool> {
    Arc::new(
        FunctionTool::new(
            "load_skill",
            "Load the full content of a skill into the conversation. Use this when you need \
             detailed instructions, policies, or guidelines for a specific type of request.",
            move |args: Value| {
                let catalog = catalog.clone();
                async move {
                    let name = args
                        .get("skill_name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| DeskError::Tool("skill_name is required".to_string()))?;
                    let content = catalog.load_by_name(name)?;
                    Ok(json!({ "content": content }))
                }
            },
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "skill_name": {
                    "type": "string",
                    "description": "The name of the skill to load"
                }
            },
            "required": ["skill_name"]
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SkillCatalog {
        SkillCatalog::new(vec![
            Skill {
                name: "expense_reporting".to_string(),
                description: "Filing and approving expenses".to_string(),
                body: "Collect receipts before filing.".to_string(),
            },
            Skill {
                name: "travel_booking".to_string(),
                description: "Booking business travel".to_string(),
                body: "Prefer refundable fares.".to_string(),
            },
        ])
    }

    #[test]
    fn test_summary_block_lists_every_skill() {
        let block = catalog().summary_block();
        assert!(block.contains("**expense_reporting**: Filing and approving expenses"));
        assert!(block.contains("**travel_booking**"));
        assert!(block.contains("load_skill tool"));
    }

    #[tokio::test]
    async fn test_load_skill_returns_body() {
        let tool = load_skill_tool(Arc::new(catalog()));
        let out = tool.call(json!({"skill_name": "travel_booking"})).await.unwrap();
        let content = out["content"].as_str().unwrap();
        assert!(content.starts_with("Loaded skill: travel_booking"));
        assert!(content.contains("Prefer refundable fares."));
    }

    #[tokio::test]
    async fn test_unknown_skill_lists_available() {
        let tool = load_skill_tool(Arc::new(catalog()));
        let out = tool.call(json!({"skill_name": "nope"})).await.unwrap();
        let content = out["content"].as_str().unwrap();
        assert!(content.contains("'nope' not found"));
        assert!(content.contains("expense_reporting, travel_booking"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_an_error() {
        let tool = load_skill_tool(Arc::new(catalog()));
        assert!(tool.call(json!({})).await.is_err());
    }
}
