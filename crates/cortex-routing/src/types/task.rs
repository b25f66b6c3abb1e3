use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// An atomic unit of work produced by decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique within its decomposition
    pub id: String,
    /// What the agent is asked to do
    pub description: String,
    /// Ids of tasks whose output this task consumes
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Execution priority, 1 first
    #[serde(default = "default_priority")]
    pub priority: u32,
}

const fn default_priority() -> u32 {
    1
}

impl Task {
    /// Creates a task with no dependencies.
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            dependencies: Vec::new(),
            priority: default_priority(),
        }
    }

    /// Sets the tasks whose output this one needs.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Gives every repeated task id a numeric suffix (`t`, `t_2`, `t_3`, ...).
///
/// Dependencies keep pointing at the first task declared under an id.
pub(crate) fn ensure_unique_ids(tasks: &mut [Task]) {
    let mut taken: HashSet<String> = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if taken.contains(&task.id) {
            let mut suffix = 2_usize;
            while taken.contains(&format!("{}_{suffix}", task.id)) {
                suffix += 1;
            }
            task.id = format!("{}_{suffix}", task.id);
        }
        taken.insert(task.id.clone());
    }
}

/// Decomposition of a prompt into dependent tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionResult {
    /// Prompt that was decomposed
    pub original_prompt: String,
    /// Tasks in declaration order
    pub tasks: Vec<Task>,
    /// Whether the decomposer marked the tasks as a sequence
    pub is_sequential: bool,
    /// Tasks the decomposer considers independent of each other
    pub can_parallelize: Vec<String>,
    /// Why the prompt was split this way
    pub reasoning: String,
}

impl DecompositionResult {
    /// A decomposition holding the whole prompt as one task.
    #[must_use]
    pub fn single(prompt: &str, reasoning: impl Into<String>) -> Self {
        Self {
            original_prompt: prompt.to_owned(),
            tasks: vec![Task::new("task_1", prompt)],
            is_sequential: false,
            can_parallelize: Vec::new(),
            reasoning: reasoning.into(),
        }
    }
}

/// A task bound to the agent that will run it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    /// The task itself
    #[serde(flatten)]
    pub task: Task,
    /// Agent that will run the task
    pub assigned_agent_id: String,
    /// Display name of that agent
    pub assigned_agent_name: String,
    /// Match similarity within [0, 1]
    pub confidence: f64,
}

/// Ordered tasks with their agent assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Unique plan id
    pub id: String,
    /// Prompt the plan answers
    pub original_prompt: String,
    /// Tasks in execution order
    pub tasks: Vec<PlannedTask>,
    /// Carried over from the decomposition
    pub is_sequential: bool,
    /// When the plan was built
    pub created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    /// Creates a plan with a fresh id.
    #[must_use]
    pub fn new(original_prompt: &str, tasks: Vec<PlannedTask>, is_sequential: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_prompt: original_prompt.to_owned(),
            tasks,
            is_sequential,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of running one planned task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task that ran
    pub task_id: String,
    /// Agent that ran it
    pub agent_id: String,
    /// Display name of the agent
    pub agent_name: String,
    /// Message sent to the agent
    pub input: String,
    /// Agent reply, empty on failure
    pub output: String,
    /// Time spent on the task
    pub duration_ms: u64,
    /// Whether the agent call succeeded
    pub success: bool,
    /// Agent error, if any
    pub error: Option<String>,
}

/// Aggregated outcome of running an execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Unique id of this run
    pub request_id: String,
    /// Output of the last executed task
    pub final_output: String,
    /// Plan that was executed
    pub plan: ExecutionPlan,
    /// Results keyed by task id
    pub task_results: HashMap<String, TaskResult>,
    /// Wall time of the whole plan
    pub total_duration_ms: u64,
    /// True only when every task succeeded
    pub success: bool,
}

impl OrchestrationResult {
    /// Number of tasks that failed.
    #[must_use]
    pub fn failed_tasks(&self) -> usize {
        self.task_results
            .values()
            .filter(|result| !result.success)
            .count()
    }
}
