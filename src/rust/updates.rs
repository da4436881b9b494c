//! Model update notifications.
//!
//! A delivery collaborator (whatever downloads or refreshes model artifacts)
//! holds a [`ModelPublisher`] and announces new models on it. The classifier
//! side runs a [`ModelSubscription`] that applies each announcement in order,
//! swapping the classifier's model for all requests that start afterwards.

use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::classifier::{Classifier, Model};
use crate::model_manager::{ModelError, ModelLoader};

/// Something the delivery side wants the classifier to know about.
#[derive(Debug)]
pub enum ModelEvent {
    /// A new artifact named `name` is available from the loader
    Available { name: String },
    /// A ready-made model to install as-is
    Install(Arc<dyn Model>),
    /// Drop the current model; requests report `ModelUnavailable` afterwards
    Withdraw,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("Model update listener has stopped")]
    Closed,
    #[error("Model update queue is full")]
    Full,
}

/// Counts of events a subscription processed before its publishers went away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub applied: usize,
    pub failed: usize,
}

/// Sending half of a model update channel.
#[derive(Debug, Clone)]
pub struct ModelPublisher {
    tx: mpsc::Sender<ModelEvent>,
}

impl ModelPublisher {
    /// Announces that the artifact `name` can be loaded.
    pub async fn available(&self, name: impl Into<String>) -> Result<(), UpdateError> {
        self.send(ModelEvent::Available { name: name.into() }).await
    }

    pub async fn install(&self, model: Arc<dyn Model>) -> Result<(), UpdateError> {
        self.send(ModelEvent::Install(model)).await
    }

    pub async fn withdraw(&self) -> Result<(), UpdateError> {
        self.send(ModelEvent::Withdraw).await
    }

    pub async fn send(&self, event: ModelEvent) -> Result<(), UpdateError> {
        self.tx.send(event).await.map_err(|_| UpdateError::Closed)
    }

    /// Non-blocking send for callers outside an async context.
    pub fn try_send(&self, event: ModelEvent) -> Result<(), UpdateError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => UpdateError::Full,
            mpsc::error::TrySendError::Closed(_) => UpdateError::Closed,
        })
    }
}

/// Receiving half of a model update channel.
#[derive(Debug)]
pub struct ModelSubscription {
    rx: mpsc::Receiver<ModelEvent>,
}

/// Creates a bounded update channel.
pub fn model_channel(capacity: usize) -> (ModelPublisher, ModelSubscription) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ModelPublisher { tx }, ModelSubscription { rx })
}

impl ModelSubscription {
    pub async fn recv(&mut self) -> Option<ModelEvent> {
        self.rx.recv().await
    }

    /// Applies events to `classifier` until every publisher is dropped.
    ///
    /// A failed load is logged and counted; the previously installed model
    /// stays in place.
    pub async fn run(mut self, classifier: Arc<Classifier>, loader: Arc<dyn ModelLoader>) -> UpdateStats {
        let mut stats = UpdateStats::default();
        while let Some(event) = self.rx.recv().await {
            match apply_event(&classifier, &loader, event).await {
                Ok(()) => stats.applied += 1,
                Err(e) => {
                    error!("Failed to apply model update: {}", e);
                    stats.failed += 1;
                }
            }
        }
        info!(
            "Model update channel closed ({} applied, {} failed)",
            stats.applied, stats.failed
        );
        stats
    }

    /// Runs [`ModelSubscription::run`] on the tokio runtime.
    pub fn spawn(self, classifier: Arc<Classifier>, loader: Arc<dyn ModelLoader>) -> JoinHandle<UpdateStats> {
        tokio::spawn(self.run(classifier, loader))
    }
}

async fn apply_event(
    classifier: &Classifier,
    loader: &Arc<dyn ModelLoader>,
    event: ModelEvent,
) -> Result<(), ModelError> {
    match event {
        ModelEvent::Available { name } => {
            info!("Model '{}' announced, loading", name);
            let loader = Arc::clone(loader);
            let model = tokio::task::spawn_blocking(move || loader.load_model(&name))
                .await
                .map_err(|e| ModelError::LoadError(format!("Loader task failed: {}", e)))??;
            classifier.update_model(model);
        }
        ModelEvent::Install(model) => {
            classifier.update_model(model);
        }
        ModelEvent::Withdraw => {
            if classifier.clear_model().is_none() {
                warn!("Withdraw requested but no model was installed");
            }
        }
    }
    Ok(())
}
