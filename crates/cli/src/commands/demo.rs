//! Offline stand-ins for the notebook tools and the material store.
//!
//! The demo tools return canned text shaped like the real services' output
//! so `wayfinder run` can exercise the whole loop without network access.
//! Retrieval finds nothing when no materials are attached, which lets the
//! web-research fallback show up in the trace.

use async_trait::async_trait;
use wayfinder_core::error::{MaterialError, ToolError};
use wayfinder_core::material::MaterialOracle;
use wayfinder_core::tool::{Tool, ToolInvocation, ToolRegistry, ToolResult, names};

/// Rough token charge for a piece of generated text.
fn charge(output: &str) -> u32 {
    (output.len() / 4) as u32 + 20
}

pub struct DemoRetrieval;

#[async_trait]
impl Tool for DemoRetrieval {
    fn name(&self) -> &str {
        names::RAG
    }

    fn description(&self) -> &str {
        "Retrieve passages from the notebook's processed materials."
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        if invocation.material_ids.is_empty() {
            return Ok(ToolResult::ok(names::RAG, "").with_tokens(20));
        }

        let output = format!(
            "Found passages in {} material(s) relevant to \"{}\": the source material \
             covers this topic in its opening chapter, with worked examples later on.",
            invocation.material_ids.len(),
            invocation.user_message
        );
        let tokens = charge(&output);
        Ok(ToolResult::ok(names::RAG, output)
            .with_tokens(tokens)
            .with_metadata("materials", serde_json::json!(invocation.material_ids)))
    }
}

pub struct DemoResearch;

#[async_trait]
impl Tool for DemoResearch {
    fn name(&self) -> &str {
        names::RESEARCH
    }

    fn description(&self) -> &str {
        "Search the web and summarize what comes back."
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        let output = format!(
            "Web results for \"{}\": three sources agree on the main points; \
             one recent article adds context not found in the notebook.",
            invocation.user_message
        );
        let tokens = charge(&output);
        Ok(ToolResult::ok(names::RESEARCH, output)
            .with_tokens(tokens)
            .with_summary("3 web sources summarized"))
    }
}

pub struct DemoPython;

#[async_trait]
impl Tool for DemoPython {
    fn name(&self) -> &str {
        names::PYTHON
    }

    fn description(&self) -> &str {
        "Write and run Python in a sandbox."
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        let output = match invocation.previous_output.as_deref() {
            Some(data) if !data.trim().is_empty() => format!(
                "Ran analysis over {} characters of retrieved data; produced 1 table and 1 chart.",
                data.len()
            ),
            _ => format!(
                "Executed generated code for \"{}\"; exit status 0.",
                invocation.user_message
            ),
        };
        let tokens = charge(&output);
        Ok(ToolResult::ok(names::PYTHON, output).with_tokens(tokens))
    }
}

/// One of the artifact generators: quiz, flashcards or slides.
pub struct DemoGenerator {
    name: &'static str,
    artifact: &'static str,
}

impl DemoGenerator {
    pub fn new(name: &'static str, artifact: &'static str) -> Self {
        Self { name, artifact }
    }
}

#[async_trait]
impl Tool for DemoGenerator {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Generate a study artifact from the notebook's materials."
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        let output = format!(
            "Generated {} from {} material(s) for \"{}\".",
            self.artifact,
            invocation.material_ids.len(),
            invocation.user_message
        );
        let tokens = charge(&output) + 200;
        Ok(ToolResult::ok(self.name, output)
            .with_tokens(tokens)
            .with_summary(format!("{} ready", self.artifact)))
    }
}

/// Registry with a demo implementation behind every tool id.
pub fn demo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(DemoRetrieval));
    registry.register(Box::new(DemoResearch));
    registry.register(Box::new(DemoPython));
    registry.register(Box::new(DemoGenerator::new(names::QUIZ, "a 10-question quiz")));
    registry.register(Box::new(DemoGenerator::new(names::FLASHCARD, "a deck of 20 flashcards")));
    registry.register(Box::new(DemoGenerator::new(names::PPT, "an 8-slide presentation")));
    registry
}

/// An oracle backed by a fixed list of processed materials.
pub struct ReadySet {
    ready: Vec<String>,
}

impl ReadySet {
    pub fn new(ready: Vec<String>) -> Self {
        Self { ready }
    }
}

#[async_trait]
impl MaterialOracle for ReadySet {
    async fn completed(&self, material_ids: &[String]) -> Result<Vec<String>, MaterialError> {
        Ok(material_ids
            .iter()
            .filter(|id| self.ready.contains(*id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_tool_id() {
        let registry = demo_registry();
        for name in [
            names::RAG,
            names::RESEARCH,
            names::PYTHON,
            names::QUIZ,
            names::FLASHCARD,
            names::PPT,
        ] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
    }

    #[tokio::test]
    async fn retrieval_without_materials_is_empty() {
        let result = DemoRetrieval
            .execute(ToolInvocation::default())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.trimmed_len(), 0);
    }

    #[tokio::test]
    async fn ready_set_keeps_caller_order() {
        let oracle = ReadySet::new(vec!["b".into(), "a".into()]);
        let ids = vec!["a".to_string(), "c".to_string(), "b".to_string()];
        assert_eq!(oracle.completed(&ids).await.unwrap(), vec!["a", "b"]);
    }
}
