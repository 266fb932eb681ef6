mod common;

use address_risk_monitor::{
    config::MonitorSettings,
    error::AppError,
    models::{
        ActionType, AddressKind, AlertPriority, AlertRule, AlertStatus, RiskLevel, SafetyGrade, HIGH_RISK_SCORE_RULE,
    },
};
use chrono::{Duration, Utc};
use common::{monitor_with, monitor_with_settings, rug_pull_scorer, StubChain};
use address_risk_monitor::utils::time::MAX_DURATION_SECONDS;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_example_contract_fires_one_high_alert_then_cools_down() {
    let chain = Arc::new(StubChain::new().with_contract("0xEXAMPLE", 1));
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain, scorer);

    monitor
        .add_monitored_address("0xEXAMPLE", 1, "user-1", vec![HIGH_RISK_SCORE_RULE.to_string()])
        .await
        .unwrap();

    let now = Utc::now();
    let summary = monitor.sweep_at(now).await;
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.alerts_fired, 1);

    let alerts = monitor.recent_alerts(10).await;
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.rule_id, HIGH_RISK_SCORE_RULE);
    assert_eq!(alert.priority, AlertPriority::High);
    assert_eq!(alert.status, AlertStatus::Triggered);
    assert_eq!(alert.user_id, "user-1");
    assert_eq!(alert.assessment["risk_score"], 85);
    // Log succeeds, the webhook has no channel configured
    assert_eq!(alert.action_results.len(), 2);
    assert!(alert.action_results[0].success);
    assert_eq!(alert.action_results[1].action_type, ActionType::Webhook);
    assert!(!alert.action_results[1].success);

    let watched = monitor.get_monitored_address("0xexample", 1).await.unwrap();
    assert_eq!(watched.last_risk_score, Some(85));
    assert_eq!(watched.kind, Some(AddressKind::Contract));
    assert_eq!(watched.last_checked, Some(now));

    let assessment = monitor
        .assess_contract_risk(&address_risk_monitor::models::ContractRiskRequest::for_monitoring("0xEXAMPLE", 1))
        .await
        .unwrap();
    assert_eq!(assessment.safety_grade, SafetyGrade::D);
    assert_eq!(assessment.risk_level, RiskLevel::High);

    // Inside the re-check window nothing is looked at again
    let again = monitor.sweep_at(now + Duration::seconds(30)).await;
    assert_eq!(again.skipped, 1);
    assert_eq!(again.alerts_fired, 0);

    // Re-checked, but the rule is still cooling down
    let later = monitor.sweep_at(now + Duration::minutes(6)).await;
    assert_eq!(later.checked, 1);
    assert_eq!(later.alerts_fired, 0);
    assert_eq!(monitor.recent_alerts(10).await.len(), 1);

    // Cooldown over
    let after_cooldown = monitor.sweep_at(now + Duration::minutes(16)).await;
    assert_eq!(after_cooldown.alerts_fired, 1);
    assert_eq!(monitor.stats().await.alerts_fired, 2);
}

#[tokio::test]
async fn test_cooldown_is_shared_across_addresses() {
    let chain = Arc::new(StubChain::new().with_contract("0xaaa", 1).with_contract("0xbbb", 1));
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain, scorer);

    for address in ["0xaaa", "0xbbb"] {
        monitor
            .add_monitored_address(address, 1, "user", vec![HIGH_RISK_SCORE_RULE.to_string()])
            .await
            .unwrap();
    }

    let summary = monitor.sweep_once().await;
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.alerts_fired, 1);
}

#[tokio::test]
async fn test_accounts_are_classified_but_not_scored() {
    let chain = Arc::new(StubChain::new());
    let (scorer, predictor) = rug_pull_scorer(0.99);
    let monitor = monitor_with(chain, scorer);
    monitor
        .add_alert_rule(AlertRule::new("always", "Always", AlertPriority::Info, Duration::zero()))
        .await
        .unwrap();
    monitor
        .add_monitored_address("0xwallet", 1, "user", vec!["always".to_string()])
        .await
        .unwrap();

    let summary = monitor.sweep_once().await;

    assert_eq!(summary.checked, 1);
    assert_eq!(summary.alerts_fired, 0);
    assert_eq!(predictor.calls(), 0);
    let watched = monitor.get_monitored_address("0xwallet", 1).await.unwrap();
    assert_eq!(watched.kind, Some(AddressKind::Account));
    assert_eq!(watched.last_risk_score, None);
    assert!(watched.last_checked.is_some());
}

#[tokio::test]
async fn test_chain_errors_leave_address_for_next_sweep() {
    let chain = Arc::new(StubChain::new().with_contract("0xflaky", 1));
    chain.set_failing("0xflaky", 1, true);
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain.clone(), scorer);
    monitor
        .add_monitored_address("0xflaky", 1, "user", vec![HIGH_RISK_SCORE_RULE.to_string()])
        .await
        .unwrap();

    let now = Utc::now();
    let failed = monitor.sweep_at(now).await;
    assert_eq!(failed.failed, 1);
    assert!(monitor.get_monitored_address("0xflaky", 1).await.unwrap().last_checked.is_none());

    chain.set_failing("0xflaky", 1, false);
    let recovered = monitor.sweep_at(now + Duration::seconds(30)).await;
    assert_eq!(recovered.checked, 1);
    assert_eq!(recovered.alerts_fired, 1);
    assert_eq!(chain.calls(), 2);
}

#[tokio::test]
async fn test_unknown_and_disabled_rules_are_skipped() {
    let chain = Arc::new(StubChain::new().with_contract("0xc", 1));
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain, scorer);
    monitor
        .add_alert_rule(AlertRule::new("off", "Disabled", AlertPriority::High, Duration::zero()).disabled())
        .await
        .unwrap();
    monitor
        .add_monitored_address("0xc", 1, "user", vec!["missing".to_string(), "off".to_string()])
        .await
        .unwrap();

    let summary = monitor.sweep_once().await;
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.alerts_fired, 0);
}

#[tokio::test]
async fn test_mutation_errors() {
    let (scorer, _) = rug_pull_scorer(0.0);
    let monitor = monitor_with(Arc::new(StubChain::new()), scorer);

    monitor.add_monitored_address("0xAbC", 1, "user", vec![]).await.unwrap();

    let duplicate = monitor.add_monitored_address("0xabc", 1, "other", vec![]).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let malformed = monitor.add_monitored_address("not-an-address", 1, "user", vec![]).await;
    assert!(matches!(malformed, Err(AppError::ValidationError(_))));

    let missing = monitor.remove_monitored_address("0xdef", 1).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let rule = AlertRule::new(HIGH_RISK_SCORE_RULE, "dup", AlertPriority::Low, Duration::zero());
    assert!(matches!(monitor.add_alert_rule(rule).await, Err(AppError::AlreadyExists(_))));

    let removed = monitor.remove_monitored_address("0xABC", 1).await.unwrap();
    assert_eq!(removed.address, "0xAbC");
    assert!(monitor.monitored_addresses().await.is_empty());
}

#[tokio::test]
async fn test_alert_lifecycle_and_subscription() {
    let chain = Arc::new(StubChain::new().with_contract("0xc", 1));
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain, scorer);
    let mut alerts_rx = monitor.subscribe_alerts();
    monitor
        .add_monitored_address("0xc", 1, "user", vec![HIGH_RISK_SCORE_RULE.to_string()])
        .await
        .unwrap();

    monitor.sweep_once().await;

    let received = alerts_rx.recv().await.unwrap();
    let acknowledged = monitor.acknowledge_alert(received.id).await.unwrap();
    assert_eq!(acknowledged.status, AlertStatus::Acknowledged);

    let resolved = monitor.resolve_alert(received.id).await.unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    assert!(matches!(
        monitor.resolve_alert(received.id).await,
        Err(AppError::InvalidStateTransition(_))
    ));
    assert!(matches!(
        monitor.acknowledge_alert(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_alert_history_is_bounded() {
    let chain = Arc::new(StubChain::new().with_contract("0xc", 1));
    let (scorer, _) = rug_pull_scorer(0.85);
    let settings = MonitorSettings {
        alert_history_limit: 2,
        ..Default::default()
    };
    let monitor = monitor_with_settings(settings, chain, scorer);
    monitor
        .add_alert_rule(AlertRule::new("every_time", "Every time", AlertPriority::Low, Duration::zero()))
        .await
        .unwrap();
    monitor
        .add_monitored_address("0xc", 1, "user", vec!["every_time".to_string()])
        .await
        .unwrap();

    let start = Utc::now();
    for i in 0..4 {
        monitor.sweep_at(start + Duration::minutes(10 * i)).await;
    }

    let recent = monitor.recent_alerts(10).await;
    assert_eq!(recent.len(), 2);
    assert!(recent[0].triggered_at > recent[1].triggered_at);
    assert_eq!(monitor.stats().await.alerts_fired, 4);
}

#[tokio::test]
async fn test_start_and_stop_transitions() {
    let chain = Arc::new(StubChain::new().with_contract("0xc", 1));
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain.clone(), scorer);
    monitor.add_monitored_address("0xc", 1, "user", vec![]).await.unwrap();

    assert!(matches!(monitor.stop(), Err(AppError::InvalidStateTransition(_))));

    monitor.start().unwrap();
    assert!(monitor.is_running());
    assert!(matches!(monitor.start(), Err(AppError::InvalidStateTransition(_))));

    // The first tick fires immediately
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let stats = monitor.stats().await;
    assert!(stats.sweeps_completed >= 1);
    assert_eq!(stats.addresses_checked, 1);

    monitor.stop().unwrap();
    assert!(!monitor.is_running());
    assert!(matches!(monitor.stop(), Err(AppError::InvalidStateTransition(_))));

    // Restart after stop is allowed
    monitor.start().unwrap();
    monitor.stop().unwrap();
}

#[tokio::test]
async fn test_no_sweeps_after_stop() {
    let chain = Arc::new(StubChain::new().with_contract("0xc", 1));
    let (scorer, _) = rug_pull_scorer(0.0);
    let settings = MonitorSettings {
        sweep_interval_seconds: 1,
        ..Default::default()
    };
    let monitor = monitor_with_settings(settings, chain.clone(), scorer);
    monitor.add_monitored_address("0xc", 1, "user", vec![]).await.unwrap();

    monitor.start().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    monitor.stop().unwrap();

    let before = monitor.stats().await.sweeps_completed;
    assert!(before >= 1);
    let calls = chain.calls();

    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
    let stats = monitor.stats().await;
    assert!(!stats.running);
    assert_eq!(stats.sweeps_completed, before);
    assert_eq!(chain.calls(), calls);
}

#[tokio::test]
async fn test_stop_mid_sweep_finishes_current_address_only() {
    let chain = Arc::new(
        StubChain::new()
            .with_contract("0xa1", 1)
            .with_contract("0xa2", 1)
            .with_contract("0xa3", 1)
            .with_delay(std::time::Duration::from_millis(400)),
    );
    let (scorer, _) = rug_pull_scorer(0.0);
    let monitor = monitor_with(chain.clone(), scorer);
    for address in ["0xa1", "0xa2", "0xa3"] {
        monitor.add_monitored_address(address, 1, "user", vec![]).await.unwrap();
    }

    monitor.start().unwrap();
    // First tick is immediate; 0xa1 is in flight.
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    monitor.stop().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(800)).await;

    assert_eq!(chain.calls(), 1);
    assert!(monitor.get_monitored_address("0xa1", 1).await.unwrap().last_checked.is_some());
    assert!(monitor.get_monitored_address("0xa2", 1).await.unwrap().last_checked.is_none());
    assert!(monitor.get_monitored_address("0xa3", 1).await.unwrap().last_checked.is_none());

    let stats = monitor.stats().await;
    assert_eq!(stats.sweeps_completed, 1);
    assert_eq!(stats.addresses_checked, 1);
    let summary = stats.last_summary.unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.checked, 1);
}

#[tokio::test]
async fn test_oversized_cooldown_is_rejected_and_longest_cooldown_sweeps() {
    let chain = Arc::new(StubChain::new().with_contract("0xc", 1));
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain, scorer);

    let mut oversized = AlertRule::new("forever", "Forever", AlertPriority::Low, Duration::zero());
    oversized.cooldown_seconds = 10_000_000_000_000_000;
    assert!(matches!(
        monitor.add_alert_rule(oversized).await,
        Err(AppError::ValidationError(_))
    ));

    let mut longest = AlertRule::new("longest", "Longest", AlertPriority::Low, Duration::zero());
    longest.cooldown_seconds = MAX_DURATION_SECONDS;
    monitor.add_alert_rule(longest).await.unwrap();
    monitor
        .add_monitored_address("0xc", 1, "user", vec!["longest".to_string()])
        .await
        .unwrap();

    let now = Utc::now();
    assert_eq!(monitor.sweep_at(now).await.alerts_fired, 1);
    let second = monitor.sweep_at(now + Duration::minutes(10)).await;
    assert_eq!(second.checked, 1);
    assert_eq!(second.alerts_fired, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mutations_and_sweeps() {
    let chain = Arc::new(StubChain::new());
    for i in 0..50 {
        chain.set_code(&format!("0x{:040x}", i), 1, common::CONTRACT_CODE.to_vec());
    }
    let (scorer, _) = rug_pull_scorer(0.85);
    let monitor = monitor_with(chain, scorer);

    let mut handles = Vec::new();
    for i in 0..50 {
        let monitor = monitor.clone();
        handles.push(tokio::spawn(async move {
            monitor
                .add_monitored_address(&format!("0x{:040x}", i), 1, "user", vec![HIGH_RISK_SCORE_RULE.to_string()])
                .await
        }));
    }
    for _ in 0..5 {
        let monitor = monitor.clone();
        handles.push(tokio::spawn(async move {
            monitor.sweep_once().await;
            Ok::<_, AppError>(address_risk_monitor::models::MonitoredAddress::new("0x0", 1, "sweep", vec![]))
        }));
    }
    // The same address raced from many tasks is accepted exactly once
    for _ in 0..10 {
        let monitor = monitor.clone();
        handles.push(tokio::spawn(async move {
            monitor.add_monitored_address("0xrace", 1, "user", vec![]).await
        }));
    }

    let mut race_wins = 0;
    for handle in handles {
        if let Ok(added) = handle.await.unwrap() {
            if added.address == "0xrace" {
                race_wins += 1;
            }
        }
    }

    assert_eq!(race_wins, 1);
    assert_eq!(monitor.monitored_addresses().await.len(), 51);

    monitor.sweep_once().await;
    // One shared rule, one cooldown: a single alert across every sweep
    assert_eq!(monitor.stats().await.alerts_fired, 1);
}
