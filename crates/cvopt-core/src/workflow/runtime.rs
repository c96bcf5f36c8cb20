//! Effect execution for the workflow reducer.
//!
//! Request handlers run on spawned tasks and report back through an inbox
//! channel. The runtime drains the inbox and feeds each completion through
//! [`update`], so all state changes still happen in one place.

use std::future::Future;

use tokio::sync::mpsc;

use super::events::{AnalysisRequest, WorkflowEffect, WorkflowEvent};
use super::state::WorkflowState;
use super::update::update;
use crate::client::{ApiClient, Failure};

type InboxSender = mpsc::UnboundedSender<WorkflowEvent>;
type InboxReceiver = mpsc::UnboundedReceiver<WorkflowEvent>;

pub struct WorkflowRuntime {
    pub state: WorkflowState,
    client: ApiClient,
    inbox_tx: InboxSender,
    inbox_rx: InboxReceiver,
    session_expired: bool,
}

impl WorkflowRuntime {
    pub fn new(client: ApiClient, state: WorkflowState) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            state,
            client,
            inbox_tx,
            inbox_rx,
            session_expired: false,
        }
    }

    /// True once any completion reported an expired session.
    pub fn session_expired(&self) -> bool {
        self.session_expired
    }

    pub fn dispatch(&mut self, event: WorkflowEvent) {
        let effects = update(&mut self.state, event);
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Starts an analysis, returning the local refusal if there is one.
    ///
    /// # Errors
    /// `Validation` when inputs are missing or an analysis is already running.
    pub fn submit_analysis(&mut self) -> Result<(), Failure> {
        let effect = self.state.submit_analysis()?;
        self.execute_effect(effect);
        Ok(())
    }

    /// Starts a rewrite, returning the local refusal if there is one.
    ///
    /// # Errors
    /// `Validation` when inputs are missing or a rewrite is already running.
    pub fn submit_rewrite(&mut self) -> Result<(), Failure> {
        let effect = self.state.submit_rewrite()?;
        self.execute_effect(effect);
        Ok(())
    }

    /// Applies every completion that has already arrived.
    pub fn drain_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.inbox_rx.try_recv() {
            self.dispatch(event);
            applied += 1;
        }
        applied
    }

    /// Waits for the next completion and applies it.
    pub async fn process_next(&mut self) {
        if let Some(event) = self.inbox_rx.recv().await {
            self.dispatch(event);
        }
    }

    /// Processes completions until neither operation is pending.
    pub async fn settle(&mut self) {
        while self.state.analysis.is_pending() || self.state.rewrite.is_pending() {
            self.process_next().await;
        }
    }

    fn execute_effect(&mut self, effect: WorkflowEffect) {
        match effect {
            WorkflowEffect::Analyze { task, request } => {
                let client = self.client.clone();
                self.spawn_effect(
                    async move {
                        let result = match request {
                            AnalysisRequest::File {
                                file,
                                job_description,
                                include_ai,
                            } => {
                                client
                                    .analyze_file(&file, &job_description, include_ai)
                                    .await
                            }
                            AnalysisRequest::Text {
                                cv_text,
                                job_description,
                                include_ai,
                            } => {
                                client
                                    .analyze_text(&cv_text, &job_description, include_ai)
                                    .await
                            }
                        };
                        WorkflowEvent::AnalysisCompleted { task, result }
                    },
                    move |failure| WorkflowEvent::AnalysisCompleted {
                        task,
                        result: Err(failure),
                    },
                );
            }
            WorkflowEffect::Rewrite {
                task,
                cv_text,
                job_description,
            } => {
                let client = self.client.clone();
                self.spawn_effect(
                    async move {
                        let result = client.rewrite(&cv_text, &job_description).await;
                        WorkflowEvent::RewriteCompleted { task, result }
                    },
                    move |failure| WorkflowEvent::RewriteCompleted {
                        task,
                        result: Err(failure),
                    },
                );
            }
            WorkflowEffect::SessionExpired => {
                tracing::info!("session expired during workflow; sign-in required");
                self.session_expired = true;
            }
        }
    }

    /// Runs `fut` on its own task. If that task dies before producing an
    /// event, `on_abort` builds the completion so the slot never stays pending.
    fn spawn_effect<Fut, F>(&self, fut: Fut, on_abort: F)
    where
        Fut: Future<Output = WorkflowEvent> + Send + 'static,
        F: FnOnce(Failure) -> WorkflowEvent + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let event = match tokio::spawn(fut).await {
                Ok(event) => event,
                Err(err) => {
                    tracing::error!("workflow request task failed: {err}");
                    on_abort(Failure::transient("The request stopped unexpectedly"))
                }
            };
            let _ = tx.send(event);
        });
    }
}
