//! Multi-agent orchestration: task to agent matching, plan execution and
//! result aggregation.
//!
//! Plans execute strictly in order, one task at a time. A failed task is
//! recorded with its error and an empty output, and execution moves on to the
//! next task; the aggregate result is successful only if every task was.

use cortex_core::{AgentExecutor, AgentMatcher};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analyzer::TaskDecomposer;
use crate::config::OrchestratorConfig;
use crate::deadline::with_deadline;
use crate::error::{Result, RoutingError};
use crate::types::{
    DecompositionResult, ExecutionPlan, OrchestrationResult, PlannedTask, Task, TaskResult,
    ensure_unique_ids,
};

/// Separator between outputs of several dependency tasks
pub const DEPENDENCY_SEPARATOR: &str = "\n\n---\n\n";

/// Decomposes prompts and runs the resulting tasks on matched agents.
pub struct Orchestrator {
    config: OrchestratorConfig,
    decomposer: TaskDecomposer,
    matcher: Option<Arc<dyn AgentMatcher>>,
    executor: Option<Arc<dyn AgentExecutor>>,
}

impl Orchestrator {
    /// Creates an orchestrator; without both agent ports every call fails
    /// with a configuration error.
    #[must_use]
    pub fn new(
        config: OrchestratorConfig,
        decomposer: TaskDecomposer,
        matcher: Option<Arc<dyn AgentMatcher>>,
        executor: Option<Arc<dyn AgentExecutor>>,
    ) -> Self {
        Self {
            config,
            decomposer,
            matcher,
            executor,
        }
    }

    /// Whether both the agent matcher and executor are wired.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.matcher.is_some() && self.executor.is_some()
    }

    fn ports(&self) -> Result<(&dyn AgentMatcher, &dyn AgentExecutor)> {
        match (&self.matcher, &self.executor) {
            (Some(matcher), Some(executor)) => Ok((matcher.as_ref(), executor.as_ref())),
            (None, _) => Err(RoutingError::Configuration(
                "orchestrator requires an agent matcher".to_owned(),
            )),
            (_, None) => Err(RoutingError::Configuration(
                "orchestrator requires an agent executor".to_owned(),
            )),
        }
    }

    /// Decomposes `prompt` and executes the result.
    ///
    /// A single-task decomposition runs directly on its assigned agent and an
    /// execution error is returned to the caller. Multi-task decompositions go
    /// through [`Self::create_plan`] and [`Self::execute_plan`].
    ///
    /// # Errors
    /// Returns a configuration error when the matcher or executor is missing.
    pub async fn process(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        conversation_id: Option<&str>,
    ) -> Result<OrchestrationResult> {
        let (matcher, executor) = self.ports()?;
        let started = Instant::now();
        let decomposition = self.decomposer.decompose(prompt).await;
        info!(
            tasks = decomposition.tasks.len(),
            reasoning = %decomposition.reasoning,
            "prompt decomposed"
        );

        if let [task] = decomposition.tasks.as_slice() {
            let planned = self.assign(matcher, task.clone()).await;
            let plan = ExecutionPlan::new(prompt, vec![planned], true);
            return self
                .execute_single(executor, plan, conversation_id, started)
                .await;
        }

        let plan = self.create_plan(&decomposition).await?;
        self.execute_plan(cancel, plan, conversation_id).await
    }

    /// Matches every task to an agent.
    ///
    /// Matches below the minimum confidence, and failed lookups, are assigned
    /// to the default agent.
    ///
    /// # Errors
    /// Returns a configuration error when the matcher or executor is missing,
    /// or an orchestration error when the decomposition holds no tasks.
    pub async fn create_plan(&self, decomposition: &DecompositionResult) -> Result<ExecutionPlan> {
        let (matcher, _) = self.ports()?;
        if decomposition.tasks.is_empty() {
            return Err(RoutingError::Orchestration(
                "decomposition produced no tasks".to_owned(),
            ));
        }

        let mut tasks = decomposition.tasks.clone();
        ensure_unique_ids(&mut tasks);
        let mut planned = Vec::with_capacity(tasks.len());
        for task in tasks {
            planned.push(self.assign(matcher, task).await);
        }

        let plan = ExecutionPlan::new(
            &decomposition.original_prompt,
            planned,
            decomposition.is_sequential,
        );
        debug!(
            plan_id = %plan.id,
            assignments = ?plan
                .tasks
                .iter()
                .map(|task| (task.task.id.as_str(), task.assigned_agent_id.as_str()))
                .collect::<Vec<_>>(),
            "execution plan created"
        );
        Ok(plan)
    }

    /// Runs every planned task in order, feeding dependency outputs forward.
    ///
    /// # Errors
    /// Returns a configuration error when ports are missing, or a cancellation
    /// error when `cancel` fires between tasks.
    pub async fn execute_plan(
        &self,
        cancel: &CancellationToken,
        plan: ExecutionPlan,
        conversation_id: Option<&str>,
    ) -> Result<OrchestrationResult> {
        let (_, executor) = self.ports()?;
        let started = Instant::now();
        let mut results: HashMap<String, TaskResult> = HashMap::with_capacity(plan.tasks.len());
        let mut final_output = String::new();
        let mut success = true;

        for planned in &plan.tasks {
            if cancel.is_cancelled() {
                return Err(RoutingError::Cancelled(format!(
                    "plan {} cancelled before task {}",
                    plan.id, planned.task.id
                )));
            }

            let dependency_context = dependency_outputs(&planned.task, &results);
            let input = task_input(&plan.original_prompt, &planned.task, &dependency_context);
            let result = self.run_task(executor, planned, input, conversation_id).await;
            if let Some(error) = &result.error {
                warn!(task = %planned.task.id, agent = %planned.assigned_agent_id, %error, "task failed");
            } else {
                debug!(task = %planned.task.id, agent = %planned.assigned_agent_id, "task completed");
            }
            success &= result.success;
            final_output.clone_from(&result.output);
            if results.insert(planned.task.id.clone(), result).is_some() {
                warn!(task = %planned.task.id, "task id repeated in plan, earlier result replaced");
            }
        }

        info!(plan_id = %plan.id, success, tasks = plan.tasks.len(), "plan executed");
        Ok(OrchestrationResult {
            request_id: Uuid::new_v4().to_string(),
            final_output,
            plan,
            task_results: results,
            total_duration_ms: started.elapsed().as_millis() as u64,
            success,
        })
    }

    async fn execute_single(
        &self,
        executor: &dyn AgentExecutor,
        plan: ExecutionPlan,
        conversation_id: Option<&str>,
        started: Instant,
    ) -> Result<OrchestrationResult> {
        let Some(planned) = plan.tasks.first() else {
            return Err(RoutingError::Orchestration("empty plan".to_owned()));
        };
        let result = self
            .run_task(executor, planned, plan.original_prompt.clone(), conversation_id)
            .await;
        if let Some(error) = &result.error {
            return Err(RoutingError::Orchestration(format!(
                "task {} failed on agent {}: {error}",
                planned.task.id, planned.assigned_agent_id
            )));
        }

        let task_id = planned.task.id.clone();
        Ok(OrchestrationResult {
            request_id: Uuid::new_v4().to_string(),
            final_output: result.output.clone(),
            plan,
            task_results: HashMap::from([(task_id, result)]),
            total_duration_ms: started.elapsed().as_millis() as u64,
            success: true,
        })
    }

    /// Binds `task` to the best agent, or to the default one.
    async fn assign(&self, matcher: &dyn AgentMatcher, task: Task) -> PlannedTask {
        let (agent_id, agent_name, confidence) = match matcher.find_best_agent(&task.description).await {
            Ok(found) if found.similarity >= self.config.min_confidence => {
                (found.agent_id, found.agent_name, found.similarity)
            }
            Ok(found) => {
                debug!(
                    task = %task.id,
                    candidate = %found.agent_id,
                    similarity = found.similarity,
                    "match below minimum confidence, using default agent"
                );
                (
                    self.config.default_agent_id.clone(),
                    self.config.default_agent_id.clone(),
                    found.similarity,
                )
            }
            Err(error) => {
                warn!(task = %task.id, %error, "agent matching failed, using default agent");
                (
                    self.config.default_agent_id.clone(),
                    self.config.default_agent_id.clone(),
                    0.0,
                )
            }
        };

        PlannedTask {
            task,
            assigned_agent_id: agent_id,
            assigned_agent_name: agent_name,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    async fn run_task(
        &self,
        executor: &dyn AgentExecutor,
        planned: &PlannedTask,
        input: String,
        conversation_id: Option<&str>,
    ) -> TaskResult {
        let started = Instant::now();
        let deadline = Duration::from_millis(self.config.task_timeout_ms);
        let outcome = with_deadline(
            deadline,
            executor.execute(&planned.assigned_agent_id, &input, conversation_id),
        )
        .await;

        let (output, success, error) = match outcome {
            Ok(reply) => (reply.response, true, None),
            Err(error) => (String::new(), false, Some(error.to_string())),
        };
        TaskResult {
            task_id: planned.task.id.clone(),
            agent_id: planned.assigned_agent_id.clone(),
            agent_name: planned.assigned_agent_name.clone(),
            input,
            output,
            duration_ms: started.elapsed().as_millis() as u64,
            success,
            error,
        }
    }
}

/// Outputs of the task's completed dependencies, in declaration order.
fn dependency_outputs(task: &Task, results: &HashMap<String, TaskResult>) -> String {
    task.dependencies
        .iter()
        .filter_map(|dependency| results.get(dependency))
        .map(|result| result.output.as_str())
        .filter(|output| !output.is_empty())
        .collect::<Vec<_>>()
        .join(DEPENDENCY_SEPARATOR)
}

fn task_input(original_prompt: &str, task: &Task, dependency_context: &str) -> String {
    let mut input = format!(
        "Original request: {original_prompt}\n\nYour task: {}",
        task.description
    );
    if !dependency_context.is_empty() {
        input.push_str("\n\nResults from previous tasks:\n");
        input.push_str(dependency_context);
    }
    input
}
