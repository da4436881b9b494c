use std::collections::HashMap;
use std::sync::Arc;

use wordbag::{
    model_channel, Classifier, ClassifierError, FeatureVector, Model, ModelError, ModelEvent,
    ModelLoader, Prediction, UpdateError, UpdateStats,
};

#[derive(Debug)]
struct Named(String);

impl Model for Named {
    fn name(&self) -> &str {
        &self.0
    }

    fn version(&self) -> Option<&str> {
        Some("1")
    }

    fn predict(&self, _: &FeatureVector) -> Result<Prediction, ClassifierError> {
        Prediction::new(self.0.clone(), 0.5)
    }
}

fn named(name: &str) -> Arc<dyn Model> {
    Arc::new(Named(name.to_string()))
}

/// In-memory stand-in for the model store.
#[derive(Default)]
struct MemoryLoader {
    models: HashMap<String, Arc<dyn Model>>,
}

impl MemoryLoader {
    fn with(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            models: names.iter().map(|n| (n.to_string(), named(n))).collect(),
        })
    }
}

impl ModelLoader for MemoryLoader {
    fn load_model(&self, name: &str) -> Result<Arc<dyn Model>, ModelError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::NotFound(name.to_string()))
    }
}

fn label(classifier: &Classifier) -> Result<String, ClassifierError> {
    classifier.predict("any text").map(|p| p.label().to_string())
}

#[tokio::test]
async fn test_available_event_loads_and_swaps() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Arc::new(Classifier::builder().build()?);
    let (publisher, subscription) = model_channel(4);
    let listener = subscription.spawn(Arc::clone(&classifier), MemoryLoader::with(&["v1", "v2"]));

    publisher.available("v1").await?;
    publisher.available("v2").await?;
    drop(publisher);

    let stats = listener.await?;
    assert_eq!(stats, UpdateStats { applied: 2, failed: 0 });
    assert_eq!(label(&classifier)?, "v2");
    assert_eq!(classifier.info().model_version.as_deref(), Some("1"));
    Ok(())
}

#[tokio::test]
async fn test_failed_load_keeps_previous_model() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Arc::new(Classifier::builder().with_model(named("current")).build()?);
    let (publisher, subscription) = model_channel(4);
    let listener = subscription.spawn(Arc::clone(&classifier), MemoryLoader::with(&[]));

    publisher.available("missing").await?;
    drop(publisher);

    assert_eq!(listener.await?, UpdateStats { applied: 0, failed: 1 });
    assert_eq!(label(&classifier)?, "current");
    Ok(())
}

#[tokio::test]
async fn test_events_apply_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Arc::new(Classifier::builder().build()?);
    let (publisher, subscription) = model_channel(8);
    let listener = subscription.spawn(Arc::clone(&classifier), MemoryLoader::with(&["stored"]));

    publisher.install(named("first")).await?;
    publisher.available("stored").await?;
    publisher.withdraw().await?;
    publisher.install(named("last")).await?;
    drop(publisher);

    assert_eq!(listener.await?.applied, 4);
    assert_eq!(label(&classifier)?, "last");
    Ok(())
}

#[tokio::test]
async fn test_withdraw_makes_model_unavailable() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Arc::new(Classifier::builder().with_model(named("old")).build()?);
    let (publisher, subscription) = model_channel(1);
    let listener = subscription.spawn(Arc::clone(&classifier), MemoryLoader::with(&[]));

    publisher.send(ModelEvent::Withdraw).await?;
    drop(publisher);
    listener.await?;

    assert!(!classifier.is_ready());
    assert!(matches!(label(&classifier), Err(ClassifierError::ModelUnavailable)));
    Ok(())
}

#[tokio::test]
async fn test_manual_receive() {
    let (publisher, mut subscription) = model_channel(2);
    publisher.available("sentiment").await.unwrap();
    match subscription.recv().await {
        Some(ModelEvent::Available { name }) => assert_eq!(name, "sentiment"),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_publisher_errors() {
    let (publisher, subscription) = model_channel(1);
    publisher.try_send(ModelEvent::Withdraw).unwrap();
    assert!(matches!(
        publisher.try_send(ModelEvent::Withdraw),
        Err(UpdateError::Full)
    ));

    drop(subscription);
    let result = tokio_test::block_on(publisher.withdraw());
    assert!(matches!(result, Err(UpdateError::Closed)));
}
