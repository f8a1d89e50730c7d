//! Configuration files and on-disk databases

use battle_core::Feature;
use battle_top::auth::Role;
use battle_top::db::users::{count_users, create_user, NewUser};
use battle_top::{Config, Database};
use tempfile::tempdir;

#[test]
fn test_load_partial_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("battle-top.toml");
    std::fs::write(
        &path,
        r#"
[server]
listen_addr = "127.0.0.1:4000"

[auth]
jwt_secret = "0123456789abcdef0123456789abcdef"
init_key = "bootstrap"

[economy]
default_debate_reward = 50

[economy.credibility]
per_like = 3

[features]
wallet = true
debate = true
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.listen_addr().unwrap().port(), 4000);
    assert_eq!(config.auth.init_key.as_deref(), Some("bootstrap"));
    assert_eq!(config.economy.default_debate_reward, 50);
    assert_eq!(config.economy.credibility.per_like, 3);
    assert!(config.features.is_enabled(Feature::Wallet));
    assert!(config.features.is_enabled(Feature::Debate));
    assert!(config.features.is_enabled(Feature::Subscription));
    assert!(!config.features.is_enabled(Feature::Shop));
    assert!(config.jwt_validator().is_ok());
}

#[test]
fn test_bad_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[server\nlisten_addr = ").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.server.listen_addr, "0.0.0.0:3000");
}

#[test]
fn test_save_then_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved.toml");

    let mut config = Config::default();
    config.features.set(Feature::Vip, true);
    config.server.permissive_cors = true;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert!(loaded.features.is_enabled(Feature::Vip));
    assert!(loaded.server.permissive_cors);
}

#[test]
fn test_database_persists_across_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("battle.db");

    {
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            create_user(
                conn,
                NewUser {
                    name: "ada".into(),
                    email: "ada@example.com".into(),
                    password_hash: "not-a-real-hash".into(),
                    security_question: None,
                    security_answer_hash: None,
                    role: Role::User,
                },
            )
        })
        .unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.with_conn(count_users).unwrap(), 1);
    assert_eq!(db.stats().unwrap().user_count, 1);
}
