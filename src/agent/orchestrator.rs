//! Agent orchestrator
//!
//! Ties the starting-URL selector, context builder, planner and tool executor
//! together. The single-round operations back the HTTP action protocol; `run`
//! drives a whole goal to completion as an explicit state machine.

use std::sync::Arc;

use crate::agent::context::ContextBuilder;
use crate::agent::loop_state::{AgentLoopState, LoopPhase};
use crate::agent::planner::Planner;
use crate::agent::start_url::StartingUrlSelector;
use crate::core::{Action, Config, Extraction, Result, Step, StepHistory, WaypointError};
use crate::llm::{GenerateOptions, OpenAiClient, StructuredModel};
use crate::tools::browser::RemoteBrowser;
use crate::tools::ToolExecutor;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Every step taken, ending with CLOSE
    pub history: StepHistory,
    /// Last extraction or observation before the run closed
    pub last_extraction: Option<Extraction>,
}

/// Main agent that orchestrates planning and tool execution
pub struct Agent {
    executor: Arc<ToolExecutor>,
    context: ContextBuilder,
    planner: Planner,
    selector: StartingUrlSelector,
    max_steps: Option<usize>,
}

impl Agent {
    /// Create an agent from an injected model and executor
    pub fn new(model: Arc<dyn StructuredModel>, executor: Arc<ToolExecutor>) -> Self {
        Self {
            context: ContextBuilder::new(executor.clone()),
            planner: Planner::new(model.clone()),
            selector: StartingUrlSelector::new(model),
            executor,
            max_steps: None,
        }
    }

    /// Create an agent wired to the configured remote services
    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn StructuredModel> = Arc::new(OpenAiClient::from_config(config)?);
        let backend = Arc::new(RemoteBrowser::from_config(config)?);
        let executor = Arc::new(ToolExecutor::from_config(backend, config));

        Ok(Self::new(model, executor)
            .with_max_steps(config.step_limit())
            .with_options(GenerateOptions {
                temperature: config.model.temperature,
                ..Default::default()
            }))
    }

    /// Generation options for every model call, planning and starting URL alike
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.selector = self.selector.with_options(options.clone());
        self.planner = self.planner.with_options(options);
        self
    }

    /// Bound the number of planning rounds in `run`
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The executor shared by every round
    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    /// Pick the starting URL and build the opening GOTO step
    async fn starting_step(&self, goal: &str) -> Result<Step> {
        let start = self.selector.select(goal).await?;
        Ok(Step::goto(start.url, start.reasoning))
    }

    /// START: choose where to begin and navigate there
    pub async fn start(&self, goal: &str, session_id: &str) -> Result<Step> {
        let step = self.starting_step(goal).await?;
        self.executor.execute_step(session_id, &step).await?;
        Ok(step)
    }

    /// GET_NEXT_STEP: plan the next step without executing it.
    ///
    /// Closing on a terminal step is left to the caller.
    pub async fn next_step(
        &self,
        goal: &str,
        session_id: &str,
        history: &StepHistory,
        last_extraction: Option<&Extraction>,
    ) -> Result<Step> {
        if self.executor.is_closed(session_id) {
            return Err(WaypointError::session(session_id, "session is already closed"));
        }

        let context = self
            .context
            .build(goal, session_id, history, last_extraction)
            .await;
        self.planner.plan(context).await
    }

    /// EXECUTE_STEP: run one step, returning its extraction if any
    pub async fn execute_step(&self, session_id: &str, step: &Step) -> Result<Option<Extraction>> {
        self.executor.execute_step(session_id, step).await
    }

    /// Close the session; at most once per session
    pub async fn close(&self, session_id: &str) -> Result<()> {
        self.executor.execute(session_id, &Action::Close).await.map(|_| ())
    }

    /// Drive a goal to completion.
    ///
    /// `on_step` is called with the 1-based step number as each step is
    /// recorded. Any error closes the session before it is returned.
    pub async fn run<F>(&self, goal: &str, session_id: &str, on_step: F) -> Result<RunOutcome>
    where
        F: Fn(usize, &Step) + Send + Sync,
    {
        let mut state = AgentLoopState::new(self.max_steps);

        tracing::info!(
            session = %session_id,
            max_steps = ?self.max_steps,
            "Starting agent loop for goal: {}", goal
        );

        match self.drive(goal, session_id, &mut state, &on_step).await {
            Ok(()) => {
                tracing::info!(
                    session = %session_id,
                    steps = state.history.len(),
                    "Goal complete"
                );
                Ok(RunOutcome {
                    history: state.history,
                    last_extraction: state.last_extraction,
                })
            }
            Err(e) => {
                state.advance(LoopPhase::Failed);
                tracing::error!(session = %session_id, error = %e, "Agent loop failed");
                if !self.executor.is_closed(session_id) {
                    if let Err(close_err) = self.close(session_id).await {
                        tracing::error!(session = %session_id, error = %close_err, "Failed to close session");
                    }
                }
                Err(e)
            }
        }
    }

    async fn drive<F>(
        &self,
        goal: &str,
        session_id: &str,
        state: &mut AgentLoopState,
        on_step: &F,
    ) -> Result<()>
    where
        F: Fn(usize, &Step) + Send + Sync,
    {
        state.advance(LoopPhase::NavigatingStart);
        let first = self.starting_step(goal).await?;
        state.record_start(first.clone());
        announce(on_step, state.history.len(), &first);
        self.executor.execute_step(session_id, &first).await?;

        state.advance(LoopPhase::Planning);
        loop {
            if let (true, Some(max)) = (state.limit_reached(), state.max_steps) {
                return Err(WaypointError::StepLimitExceeded(max));
            }

            let step = self
                .next_step(
                    goal,
                    session_id,
                    &state.history,
                    state.last_extraction.as_ref(),
                )
                .await?;
            state.record_planned(step.clone());
            announce(on_step, state.history.len(), &step);

            if step.is_terminal() {
                self.close(session_id).await?;
                state.advance(LoopPhase::Done);
                return Ok(());
            }

            state.advance(LoopPhase::Executing);
            let extraction = self.executor.execute_step(session_id, &step).await?;
            if let Some(ref result) = extraction {
                tracing::info!(session = %session_id, "{} result: {}", result.kind(), result.render());
            }
            state.set_extraction(extraction);
            state.advance(LoopPhase::Planning);
        }
    }
}

fn announce<F>(on_step: &F, number: usize, step: &Step)
where
    F: Fn(usize, &Step),
{
    tracing::info!(
        step = number,
        tool = %step.tool,
        text = %step.text,
        reasoning = %step.reasoning,
        "Step planned"
    );
    on_step(number, step);
}
