//! Inbound envelope dispatch.
//!
//! The session receiver hands every decoded [`InboundEnvelope`] to the
//! dispatcher: acknowledgements are logged, task instructions spawn a runner
//! tracked in the registry, and control commands mutate the registry or
//! queue a models-list reply. Dispatch itself never blocks the receiver —
//! anything that can wait runs in its own task.

use crate::outbound::OutboundQueue;
use crate::ports::catalog::ModelCatalog;
use crate::runner::TaskRunner;
use crate::tasks::TaskRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tokiame_domain::{CommandKind, ControlCommand, InboundEnvelope, OutboundEnvelope};

pub struct InboundDispatcher {
    registry: Arc<TaskRegistry>,
    runner: Arc<TaskRunner>,
    catalog: Arc<dyn ModelCatalog>,
    queue: OutboundQueue,
    /// Client shutdown token; parent of every task token.
    client: CancellationToken,
}

impl InboundDispatcher {
    pub fn new(
        registry: Arc<TaskRegistry>,
        runner: Arc<TaskRunner>,
        catalog: Arc<dyn ModelCatalog>,
        queue: OutboundQueue,
        client: CancellationToken,
    ) -> Self {
        Self {
            registry,
            runner,
            catalog,
            queue,
            client,
        }
    }

    pub fn dispatch(&self, envelope: InboundEnvelope) {
        match envelope {
            InboundEnvelope::Ack { task_id, ack } => {
                info!(
                    task_id,
                    success = ack.success,
                    details = %ack.details,
                    "received acknowledgement"
                );
            }
            InboundEnvelope::Task(instruction) => {
                info!(
                    task_id = %instruction.task_id,
                    model = %instruction.model,
                    "received task instruction"
                );
                self.spawn_task(instruction);
            }
            InboundEnvelope::Command { task_id, command } => {
                self.handle_command(task_id, command);
            }
        }
    }

    fn spawn_task(&self, instruction: tokiame_domain::TaskInstruction) {
        let task_id = instruction.task_id.clone();
        let guard = self.registry.insert(&task_id, &self.client);
        let token = guard.token();
        let runner = Arc::clone(&self.runner);
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            runner.run(instruction, token).await;
            registry.remove(&task_id, &guard);
            debug!(task_id, "task finished and removed from registry");
        });
    }

    fn handle_command(&self, task_id: String, command: ControlCommand) {
        match command.kind {
            CommandKind::ShutdownGracefully => {
                info!(task_id, reason = %command.reason, "received task shutdown command");
                if !self.registry.cancel(&task_id) {
                    debug!(task_id, "task not live, may have already finished");
                }
            }
            CommandKind::Models => {
                info!(task_id, "received models command");
                let queue = self.queue.clone();
                let models = self.catalog.snapshot();
                tokio::spawn(async move {
                    let envelope = OutboundEnvelope::models_list(&task_id, models);
                    if let Err(e) = queue.push(envelope).await {
                        warn!(task_id, "models list not queued: {e}");
                    }
                });
            }
        }
    }
}
