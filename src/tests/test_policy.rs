use ndarray::{array, Array1, ArrayView1};
use std::fs;
use tempfile::tempdir;

use crate::checkpoint::CheckpointStore;
use crate::config::MindConfig;
use crate::error::MindError;
use crate::policy::{ModelSource, PolicyModel};

fn config_in(dir: &std::path::Path) -> MindConfig {
    MindConfig {
        checkpoint_dir: dir.to_path_buf(),
        ..MindConfig::default()
    }
}

fn fresh_policy(config: &MindConfig, seed: u64) -> PolicyModel {
    let mut policy = PolicyModel::with_seed(config, seed);
    assert_eq!(policy.initialize().unwrap(), ModelSource::Fresh);
    policy
}

fn probe() -> Array1<f32> {
    Array1::linspace(0.0, 1.0, 16)
}

#[test]
fn test_positive_reward_raises_target() {
    let outputs = array![[0.25, 0.25, 0.25, 0.25]];
    let targets = PolicyModel::adjusted_targets(outputs, &[1], &[10.0], 0.1, 0.01);
    let expected = [0.125, 0.625, 0.125, 0.125];
    for (t, e) in targets.row(0).iter().zip(expected) {
        assert!((t - e).abs() < 1e-6);
    }
}

#[test]
fn test_negative_reward_is_floored() {
    let outputs = array![[0.25, 0.25, 0.25, 0.25]];
    let targets = PolicyModel::adjusted_targets(outputs, &[0], &[-5.0], 0.1, 0.01);
    assert!((targets[[0, 0]] - 0.01).abs() < 1e-6);
    for j in 1..4 {
        assert!((targets[[0, j]] - 0.5).abs() < 1e-6);
    }
}

#[test]
fn test_collapsed_row_stays_non_negative() {
    let outputs = array![[0.1, 0.1, 0.1, 0.1]];
    let targets = PolicyModel::adjusted_targets(outputs, &[3], &[-10.0], 0.1, 0.01);
    assert!(targets.iter().all(|&v| v >= 0.01));
}

#[test]
fn test_predict_before_initialize_fails() {
    let dir = tempdir().unwrap();
    let policy = PolicyModel::with_seed(&config_in(dir.path()), 1);
    assert!(!policy.is_initialized());
    assert!(matches!(policy.predict(probe().view()), Err(MindError::ModelNotInitialized)));
    assert!(matches!(policy.save("early"), Err(MindError::ModelNotInitialized)));
    assert_eq!(policy.summary(), "Model not initialized");
}

#[test]
fn test_fresh_prediction_is_a_distribution() {
    let dir = tempdir().unwrap();
    let policy = fresh_policy(&config_in(dir.path()), 2);
    let dist = policy.predict(probe().view()).unwrap();
    assert_eq!(dist.len(), 4);
    assert!(dist.iter().all(|&p| p >= 0.0));
    assert!((dist.sum() - 1.0).abs() < 1e-4);
}

#[test]
fn test_train_on_batch_validates_input() {
    let dir = tempdir().unwrap();
    let mut policy = fresh_policy(&config_in(dir.path()), 3);
    let state = probe();
    let short = Array1::<f32>::zeros(3);

    let empty: Vec<ArrayView1<f32>> = Vec::new();
    assert!(matches!(policy.train_on_batch(&empty, &[], &[]), Err(MindError::TrainingBatch(_))));
    assert!(matches!(
        policy.train_on_batch(&[state.view()], &[0, 1], &[1.0]),
        Err(MindError::TrainingBatch(_))
    ));
    assert!(matches!(
        policy.train_on_batch(&[state.view()], &[4], &[1.0]),
        Err(MindError::TrainingBatch(_))
    ));
    assert!(matches!(
        policy.train_on_batch(&[short.view()], &[0], &[1.0]),
        Err(MindError::TrainingBatch(_))
    ));
    assert_eq!(policy.train_steps(), 0);
}

#[test]
fn test_training_uninitialized_model_fails() {
    let dir = tempdir().unwrap();
    let mut policy = PolicyModel::with_seed(&config_in(dir.path()), 4);
    let state = probe();
    assert!(matches!(
        policy.train_on_batch(&[state.view()], &[0], &[1.0]),
        Err(MindError::ModelNotInitialized)
    ));
}

#[test]
fn test_rewarded_action_gains_probability() {
    let dir = tempdir().unwrap();
    let mut policy = fresh_policy(&config_in(dir.path()), 5);
    let state = probe();
    let before = policy.predict(state.view()).unwrap()[2];

    let states = vec![state.view(); 8];
    for _ in 0..100 {
        let loss = policy.train_on_batch(&states, &[2; 8], &[10.0; 8]).unwrap();
        assert!(loss.is_finite());
    }

    let after = policy.predict(state.view()).unwrap()[2];
    assert!(after > before, "p(socialize) went from {} to {}", before, after);
    assert_eq!(policy.train_steps(), 100);
}

#[test]
fn test_save_then_load_restores_predictions() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let saved = fresh_policy(&config, 6);
    saved.save("penguin-ai-alpha").unwrap();

    let mut other = fresh_policy(&config, 7);
    let state = probe();
    assert_ne!(saved.predict(state.view()).unwrap(), other.predict(state.view()).unwrap());

    other.load("penguin-ai-alpha").unwrap();
    assert_eq!(saved.predict(state.view()).unwrap(), other.predict(state.view()).unwrap());
}

#[test]
fn test_failed_load_keeps_parameters() {
    let dir = tempdir().unwrap();
    let mut policy = fresh_policy(&config_in(dir.path()), 8);
    let state = probe();
    let before = policy.predict(state.view()).unwrap();

    assert!(matches!(policy.load("missing"), Err(MindError::CheckpointLoad { .. })));
    assert_eq!(policy.predict(state.view()).unwrap(), before);
}

#[test]
fn test_initialize_prefers_base_checkpoint() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let base = fresh_policy(&config, 9);
    base.save(&config.base_checkpoint).unwrap();

    let mut policy = PolicyModel::with_seed(&config, 10);
    assert_eq!(policy.initialize().unwrap(), ModelSource::Loaded);
    let state = probe();
    assert_eq!(policy.predict(state.view()).unwrap(), base.predict(state.view()).unwrap());
}

#[test]
fn test_corrupt_base_checkpoint_falls_back_to_fresh() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let store = CheckpointStore::new(dir.path());
    fs::write(store.path_for(&config.base_checkpoint), b"not a model").unwrap();

    let mut policy = PolicyModel::with_seed(&config, 11);
    assert_eq!(policy.initialize().unwrap(), ModelSource::Fresh);
    assert!(policy.is_initialized());
}

#[test]
fn test_summary_lists_layers() {
    let dir = tempdir().unwrap();
    let policy = fresh_policy(&config_in(dir.path()), 12);
    let summary = policy.summary();
    assert!(summary.contains("input: 16"));
    assert!(summary.contains("hidden 1: 64 (relu, dropout 0.3)"));
    assert!(summary.contains("hidden 2: 64 (relu, batch norm, dropout 0.2)"));
    assert!(summary.contains("hidden 3: 32 (relu)"));
    assert!(summary.contains("output: 4 (softmax)"));
}
