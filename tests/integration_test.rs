use penguin_ai::{
    agent::AgentController,
    colony::Colony,
    config::MindConfig,
    encoder::EnvironmentSnapshot,
    policy::ModelSource,
    reward::Outcome,
    types::Action,
};
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

fn config_in(dir: &std::path::Path, seed: u64) -> MindConfig {
    MindConfig {
        checkpoint_dir: dir.to_path_buf(),
        seed: Some(seed),
        ..MindConfig::default()
    }
}

fn busy_snapshot(tick: usize) -> EnvironmentSnapshot {
    EnvironmentSnapshot {
        nearest_fish_distance: Some((tick % 7) as f32 * 60.0),
        nearest_yarn_distance: Some(300.0),
        nearest_agent_distance: Some(80.0),
        nearby_agents: Some(tick % 5),
        fish_count: Some(8),
        yarn_count: Some(2),
        factory_mood: Some(65.0),
        turbo_mode: Some(tick % 2 == 0),
        time_of_day: Some((tick % 24) as f32 / 24.0),
        weather: Some(0.6),
    }
}

#[test]
fn test_end_to_end_learning_loop() {
    let dir = tempdir().unwrap();
    let mut agent = AgentController::new("pingu", config_in(dir.path(), 1)).unwrap();

    let mut trained_ticks = Vec::new();
    for tick in 1..=40 {
        let decision = agent.decide(Some(&busy_snapshot(tick)));
        assert!(!decision.is_fallback());
        if agent.learn(7.0).trained {
            trained_ticks.push(tick);
        }
    }

    assert_eq!(trained_ticks.first(), Some(&32));
    assert_eq!(trained_ticks.len(), 9);
    assert_eq!(agent.metrics().training_failures, 0);
    assert!(agent.metrics().mean_loss().unwrap().is_finite());
}

#[test]
fn test_store_stays_at_capacity() {
    let dir = tempdir().unwrap();
    let mut agent = AgentController::new("long-lived", config_in(dir.path(), 2)).unwrap();

    for _ in 0..1500 {
        agent.decide(None);
        agent.learn(1.0);
    }
    assert_eq!(agent.experiences().len(), 1000);
    assert!(agent.experiences().iter().all(|e| e.reward == Some(1.0)));
    // Every tick from the 32nd on trained, including those on a full store
    assert_eq!(agent.metrics().training_steps, 1500 - 31);
    assert_eq!(agent.metrics().training_failures, 0);
}

#[test]
fn test_outcome_driven_rewards_stay_bounded() {
    let dir = tempdir().unwrap();
    let mut agent = AgentController::new("collector", config_in(dir.path(), 3)).unwrap();

    for tick in 0..200 {
        let decision = agent.decide(Some(&busy_snapshot(tick)));
        let outcome = match decision.action {
            Action::Collect => Outcome {
                fish_collected: (tick % 3) as u32,
                yarn_collected: (tick % 11 == 0) as u32,
                ..Default::default()
            },
            Action::Socialize => Outcome {
                social_success: tick % 2 == 0,
                social_failure: tick % 2 == 1,
                ..Default::default()
            },
            Action::Move => Outcome {
                reached_target: true,
                distance: 140.0,
                new_area_explored: tick % 4 == 0,
                ..Default::default()
            },
            Action::Rest => Outcome::default(),
        };
        let (reward, _) = agent.learn_from_outcome(&outcome);
        assert!((-10.0..=10.0).contains(&reward));
    }

    let state = agent.state();
    assert!((0.0..=100.0).contains(&state.energy()));
    assert!((0.0..=100.0).contains(&state.happiness()));
    assert!((0.0..=1.0).contains(&state.performance.efficiency));
}

#[test]
fn test_colony_shares_base_checkpoint() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), 4);

    let mut first = Colony::new(config.clone()).unwrap();
    assert_eq!(first.register("a").unwrap(), ModelSource::Fresh);
    first.get("a").unwrap().policy().save(&config.base_checkpoint).unwrap();

    let mut second = Colony::new(config).unwrap();
    assert_eq!(second.register("b").unwrap(), ModelSource::Loaded);
}

#[test]
fn test_colony_ticks_and_save_all() {
    let dir = tempdir().unwrap();
    let mut colony = Colony::new(config_in(dir.path(), 5)).unwrap();
    let ids = ["pingu", "pinga", "robby"];
    for id in ids {
        colony.register(id).unwrap();
    }

    let snapshots: HashMap<String, EnvironmentSnapshot> =
        ids.iter().map(|id| (id.to_string(), busy_snapshot(id.len()))).collect();
    for _ in 0..35 {
        let decisions = colony.decide_all(&snapshots);
        assert_eq!(decisions.len(), ids.len());
        for id in ids {
            colony.learn(id, 2.5).unwrap();
        }
    }
    assert_eq!(colony.global_training_pass(), ids.len());

    colony.remove("robby");
    assert!(colony.learn("robby", 1.0).is_err());
    assert!(colony.save_all().is_empty());
    assert!(dir.path().join("penguin-ai-pingu.ckpt").is_file());
    assert!(!dir.path().join("penguin-ai-robby.ckpt").exists());
}

#[test]
fn test_config_file_drives_controller() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mind.json");
    let json = format!(
        r#"{{ "experience_capacity": 50, "min_experiences_to_train": 8, "batch_size": 4, "seed": 9, "checkpoint_dir": {:?} }}"#,
        dir.path().join("models")
    );
    fs::write(&path, json).unwrap();

    let config = MindConfig::from_json_file(&path).unwrap();
    assert_eq!(config.experience_capacity, 50);
    assert_eq!(config.batch_size, 4);

    let mut agent = AgentController::new("configured", config).unwrap();
    let mut trained = 0;
    for _ in 0..60 {
        agent.decide(None);
        if agent.learn(1.0).trained {
            trained += 1;
        }
    }
    assert_eq!(agent.experiences().len(), 50);
    assert_eq!(trained, 53);
    agent.save_model().unwrap();
    assert!(dir.path().join("models").join("penguin-ai-configured.ckpt").is_file());
}
