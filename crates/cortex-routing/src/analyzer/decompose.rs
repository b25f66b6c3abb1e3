use cortex_core::{ChatClient, ChatMessage, ChatRequest};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::json::extract_json_object;
use crate::error::{Result, RoutingError};
use crate::types::{DecompositionResult, Task, ensure_unique_ids};

const DECOMPOSITION_SYSTEM_PROMPT: &str = "You split user requests into atomic tasks.\n\
Reply with a single JSON object and nothing else:\n\
{\"tasks\": [{\"id\": \"task_1\", \"description\": \"...\", \"dependencies\": [], \"priority\": 1}], \
\"is_sequential\": true, \"can_parallelize\": [\"task_id\"], \"reasoning\": \"...\"}\n\
Use one task when the request cannot be split. Dependencies list ids of earlier tasks \
whose output the task needs.";

/// A verb group: label used in task descriptions plus the words that trigger it.
struct VerbGroup {
    label: &'static str,
    keywords: &'static [&'static str],
}

const VERB_GROUPS: &[VerbGroup] = &[
    VerbGroup {
        label: "Research",
        keywords: &["research", "find", "search", "investigate", "lookup", "gather"],
    },
    VerbGroup {
        label: "Summarize",
        keywords: &["summarize", "summarise", "summary", "condense", "outline"],
    },
    VerbGroup {
        label: "Translate",
        keywords: &["translate", "translation"],
    },
    VerbGroup {
        label: "Analyze",
        keywords: &["analyze", "analyse", "analysis", "evaluate", "assess", "review"],
    },
    VerbGroup {
        label: "Write",
        keywords: &["write", "draft", "compose", "create"],
    },
    VerbGroup {
        label: "Calculate",
        keywords: &["calculate", "compute", "estimate"],
    },
    VerbGroup {
        label: "Compare",
        keywords: &["compare", "contrast", "versus", "vs"],
    },
    VerbGroup {
        label: "Explain",
        keywords: &["explain", "describe", "clarify"],
    },
];

const CONJUNCTIONS: &[&str] = &[
    " and then ",
    " then ",
    " after that",
    " afterwards",
    " followed by ",
    " finally ",
    "; ",
];

#[derive(Debug, Deserialize)]
struct DecompositionReply {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    is_sequential: bool,
    #[serde(default)]
    can_parallelize: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

/// Splits prompts into dependency-annotated tasks.
pub struct TaskDecomposer {
    chat: Option<Arc<dyn ChatClient>>,
    model: String,
}

impl TaskDecomposer {
    /// Creates a decomposer; without `chat` only the rule-based split runs.
    #[must_use]
    pub fn new(chat: Option<Arc<dyn ChatClient>>, model: impl Into<String>) -> Self {
        Self {
            chat,
            model: model.into(),
        }
    }

    /// Heuristic-only decomposer.
    #[must_use]
    pub fn heuristic() -> Self {
        Self {
            chat: None,
            model: String::new(),
        }
    }

    /// Decomposes `prompt`. Never fails: LLM errors fall back to heuristics and
    /// unusable LLM output falls back to a single whole-prompt task.
    pub async fn decompose(&self, prompt: &str) -> DecompositionResult {
        let Some(chat) = &self.chat else {
            return Self::decompose_heuristic(prompt);
        };

        match self.request_decomposition(chat.as_ref(), prompt).await {
            Ok(content) => parse_reply(prompt, &content),
            Err(error) => {
                warn!(%error, "LLM decomposition failed, using heuristics");
                Self::decompose_heuristic(prompt)
            }
        }
    }

    /// Verb-group chain decomposition.
    ///
    /// Two or more matched groups produce one task per group, each depending
    /// on the previous. Sequencing words alone never split a prompt.
    #[must_use]
    pub fn decompose_heuristic(prompt: &str) -> DecompositionResult {
        let lowered = prompt.to_lowercase();
        let words: HashSet<&str> = lowered
            .split(|character: char| !character.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let matched: Vec<&VerbGroup> = VERB_GROUPS
            .iter()
            .filter(|group| group.keywords.iter().any(|keyword| words.contains(keyword)))
            .collect();
        let has_conjunction = CONJUNCTIONS
            .iter()
            .any(|conjunction| lowered.contains(conjunction));

        // A conjunction with a single action has nothing to chain, so it stays one task.
        if matched.len() < 2 {
            let reasoning = if has_conjunction {
                "heuristic: sequencing words but fewer than two distinct actions"
            } else {
                "heuristic: single action"
            };
            return DecompositionResult::single(prompt, reasoning);
        }

        let mut tasks: Vec<Task> = Vec::with_capacity(matched.len());
        for (index, group) in matched.iter().enumerate() {
            let mut task = Task::new(
                format!("task_{}", index + 1),
                format!("{}: {prompt}", group.label),
            )
            .with_priority(index as u32 + 1);
            if let Some(previous) = tasks.last() {
                task = task.with_dependencies(vec![previous.id.clone()]);
            }
            tasks.push(task);
        }

        let labels: Vec<&str> = matched.iter().map(|group| group.label).collect();
        debug!(tasks = tasks.len(), "heuristic decomposition");
        DecompositionResult {
            original_prompt: prompt.to_owned(),
            tasks,
            is_sequential: true,
            can_parallelize: Vec::new(),
            reasoning: format!("heuristic: chained {}", labels.join(" -> ")),
        }
    }

    async fn request_decomposition(&self, chat: &dyn ChatClient, prompt: &str) -> Result<String> {
        let request = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(DECOMPOSITION_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
        )
        .with_temperature(0.1)
        .with_max_tokens(1024);
        let response = chat.chat(request).await.map_err(RoutingError::from)?;
        Ok(response.content)
    }
}

/// Parses the LLM reply; anything unusable becomes a single-task result.
fn parse_reply(prompt: &str, content: &str) -> DecompositionResult {
    let reply = extract_json_object(content)
        .and_then(|json| serde_json::from_str::<DecompositionReply>(json).ok());
    let Some(reply) = reply else {
        warn!("decomposition reply was not valid JSON, using a single task");
        return DecompositionResult::single(prompt, "unparseable decomposition reply");
    };

    let mut tasks: Vec<Task> = reply
        .tasks
        .into_iter()
        .filter(|task| !task.id.trim().is_empty() && !task.description.trim().is_empty())
        .collect();
    if tasks.is_empty() {
        return DecompositionResult::single(prompt, "decomposition produced no tasks");
    }

    // Only keep dependencies on tasks declared earlier in the list.
    let mut seen: HashSet<String> = HashSet::new();
    for task in &mut tasks {
        task.dependencies.retain(|dependency| seen.contains(dependency));
        seen.insert(task.id.clone());
    }
    ensure_unique_ids(&mut tasks);

    DecompositionResult {
        original_prompt: prompt.to_owned(),
        tasks,
        is_sequential: reply.is_sequential,
        can_parallelize: reply
            .can_parallelize
            .into_iter()
            .filter(|id| seen.contains(id))
            .collect(),
        reasoning: reply.reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::mock::MockChatClient;

    #[test]
    fn test_single_action_is_not_split() {
        let result = TaskDecomposer::decompose_heuristic("Write a haiku about autumn");
        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].description, "Write a haiku about autumn");
    }

    #[test]
    fn test_multiple_actions_form_a_chain() {
        let prompt = "Research solar panels, then summarize and translate the findings";
        let result = TaskDecomposer::decompose_heuristic(prompt);

        assert_eq!(result.tasks.len(), 3);
        assert!(result.is_sequential);
        assert!(result.tasks[0].description.starts_with("Research"));
        assert!(result.tasks[0].dependencies.is_empty());
        assert_eq!(result.tasks[1].dependencies, vec!["task_1"]);
        assert_eq!(result.tasks[2].dependencies, vec!["task_2"]);
    }

    #[tokio::test]
    async fn test_llm_tasks_are_parsed() {
        let reply = r#"{"tasks": [
            {"id": "a", "description": "find sources"},
            {"id": "b", "description": "write report", "dependencies": ["a", "ghost"]}
        ], "is_sequential": true, "can_parallelize": [], "reasoning": "two phases"}"#;
        let chat: Arc<dyn ChatClient> = Arc::new(MockChatClient::new().with_default_response(reply));
        let decomposer = TaskDecomposer::new(Some(chat), "planner");

        let result = decomposer.decompose("research and write a report").await;
        assert_eq!(result.tasks.len(), 2);
        assert_eq!(result.tasks[1].dependencies, vec!["a"]);
        assert_eq!(result.reasoning, "two phases");
    }

    #[tokio::test]
    async fn test_repeated_llm_task_ids_are_made_unique() {
        let reply = r#"{"tasks": [
            {"id": "t", "description": "step one"},
            {"id": "t", "description": "step two", "dependencies": ["t"]}
        ]}"#;
        let chat: Arc<dyn ChatClient> = Arc::new(MockChatClient::new().with_default_response(reply));
        let decomposer = TaskDecomposer::new(Some(chat), "planner");

        let result = decomposer.decompose("do two steps").await;
        let ids: Vec<&str> = result.tasks.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["t", "t_2"]);
        assert_eq!(result.tasks[1].dependencies, vec!["t"]);
    }

    #[tokio::test]
    async fn test_empty_llm_tasks_fall_back_to_single() {
        let chat: Arc<dyn ChatClient> =
            Arc::new(MockChatClient::new().with_default_response(r#"{"tasks": []}"#));
        let decomposer = TaskDecomposer::new(Some(chat), "planner");

        let result = decomposer.decompose("research X and summarize it").await;
        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].description, "research X and summarize it");
    }

    #[tokio::test]
    async fn test_llm_error_uses_heuristics() {
        let chat: Arc<dyn ChatClient> = Arc::new(MockChatClient::new().failing());
        let decomposer = TaskDecomposer::new(Some(chat), "planner");

        let result = decomposer.decompose("compare Rust and Go, then explain the winner").await;
        assert_eq!(result.tasks.len(), 2);
    }
}
