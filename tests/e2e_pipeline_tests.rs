//! End-to-end tests for the daily gazette run
//!
//! Runs the real HTTP gazette source and Brevo mailer against local mock
//! servers, with a SQLite registry in a temporary directory.

mod common;

use common::*;
use gazette_watcher::mail::{FAILURE_SUBJECT, MATCH_SUBJECT};
use gazette_watcher::pipeline::{
    RunOutcome, RunTrigger, SkipReason, LAST_COMPLETED_RUN_DATE_KEY, RUN_LEASE_KEY,
};
use gazette_watcher::registry::{PersonRegistry, RegistryAdmin, RunStateStore};
use std::time::Duration;

#[tokio::test]
async fn test_matched_person_is_emailed_and_recorded() {
    let env = TestEnv::spawn().await;
    env.gazette.publish(
        "DECRETO Nº 1.234\nNomeia TEST USER 1 para o cargo\nde assessor especial.",
    );

    let outcome = env.pipeline.run_scheduled().await;

    assert_eq!(outcome, RunOutcome::Completed { matched: 1, notified: 1 });

    let received = env.brevo.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["to"][0]["email"], TEST_USER_1_EMAIL);
    assert_eq!(received[0]["subject"], MATCH_SUBJECT);
    assert!(received[0]["htmlContent"]
        .as_str()
        .unwrap()
        .contains(TEST_USER_1_NAME));
    assert_eq!(env.brevo.api_keys(), vec![Some(TEST_API_KEY.to_string())]);

    let selections = env.registry.get_selections(10).unwrap();
    assert_eq!(selections.len(), 1);
    let people = env.registry.list_people().unwrap();
    let user_1 = people.iter().find(|p| p.email == TEST_USER_1_EMAIL).unwrap();
    assert_eq!(selections[0].person_id, user_1.id);

    assert_eq!(
        env.registry
            .get_state(LAST_COMPLETED_RUN_DATE_KEY)
            .unwrap()
            .as_deref(),
        Some("2024-07-26")
    );
}

#[tokio::test]
async fn test_name_wrapped_across_lines_in_upper_case_matches() {
    let env = TestEnv::spawn().await;
    env.gazette.publish("Exonera MARIA DA\n   CONCEIÇÃO do cargo");

    let outcome = env.pipeline.run_scheduled().await;

    assert_eq!(outcome, RunOutcome::Completed { matched: 1, notified: 1 });
    assert_eq!(env.brevo.received()[0]["to"][0]["email"], TEST_USER_2_EMAIL);
}

#[tokio::test]
async fn test_no_match_sends_nothing_but_completes_the_day() {
    let env = TestEnv::spawn().await;
    env.gazette.publish("Nenhum ato de nomeação nesta edição.");

    let outcome = env.pipeline.run_scheduled().await;

    assert_eq!(outcome, RunOutcome::Completed { matched: 0, notified: 0 });
    assert!(env.brevo.received().is_empty());
    assert!(env.registry.get_selections(10).unwrap().is_empty());

    let again = env.pipeline.run_scheduled().await;
    assert!(matches!(
        again,
        RunOutcome::Skipped(SkipReason::AlreadyCompleted(_))
    ));
    assert_eq!(env.gazette.landing_hits(), 1);
}

#[tokio::test]
async fn test_unavailable_gazette_broadcasts_failure_after_all_attempts() {
    let env = TestEnv::spawn().await;

    let outcome = env.pipeline.run_scheduled().await;

    assert_eq!(
        outcome,
        RunOutcome::FailureBroadcast {
            attempts: 3,
            recipients: 2,
            sent: 2
        }
    );
    assert_eq!(env.gazette.landing_hits(), 3);

    let received = env.brevo.received();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|body| body["subject"] == FAILURE_SUBJECT));
    assert!(env.registry.get_selections(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_email_still_records_selection() {
    let env = TestEnv::spawn().await;
    env.brevo.reject(TEST_USER_1_EMAIL);
    env.gazette
        .publish("Nomeia TEST USER 1 e MARIA DA CONCEIÇÃO para a comissão.");

    let outcome = env.pipeline.run_scheduled().await;

    assert_eq!(outcome, RunOutcome::Completed { matched: 2, notified: 1 });
    assert_eq!(env.brevo.received().len(), 2);
    assert_eq!(env.registry.get_selections(10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_sunday_is_skipped_unless_forced() {
    let env = TestEnv::spawn_at(sunday_morning()).await;
    env.gazette.publish("Nomeia TEST USER 1.");

    let scheduled = env.pipeline.run_scheduled().await;
    assert!(matches!(scheduled, RunOutcome::Skipped(SkipReason::NonRunDay(_))));

    let manual = env.pipeline.run(RunTrigger::Manual { force: false }).await;
    assert!(matches!(manual, RunOutcome::Skipped(SkipReason::NonRunDay(_))));
    assert_eq!(env.gazette.landing_hits(), 0);

    let forced = env.pipeline.run(RunTrigger::Manual { force: true }).await;
    assert_eq!(forced, RunOutcome::Completed { matched: 1, notified: 1 });
}

#[tokio::test]
async fn test_removed_person_is_no_longer_matched() {
    let env = TestEnv::spawn().await;
    let people = env.registry.list_people().unwrap();
    let user_1 = people.iter().find(|p| p.email == TEST_USER_1_EMAIL).unwrap();
    env.registry.remove_person(&user_1.id).unwrap();
    env.gazette.publish("Nomeia TEST USER 1.");

    let outcome = env.pipeline.run_scheduled().await;

    assert_eq!(outcome, RunOutcome::Completed { matched: 0, notified: 0 });
    assert!(env.brevo.received().is_empty());
}

#[tokio::test]
async fn test_run_waits_for_lease_held_by_another_process() {
    let env = TestEnv::spawn().await;
    env.gazette.publish("Nomeia TEST USER 1.");
    assert!(env
        .registry
        .try_claim(RUN_LEASE_KEY, "pid-1-cafebabe", Duration::from_secs(3600))
        .unwrap());

    let refused = env.pipeline.run(RunTrigger::Manual { force: true }).await;
    assert_eq!(refused, RunOutcome::AlreadyRunning);
    assert_eq!(env.gazette.landing_hits(), 0);

    env.registry
        .release_claim(RUN_LEASE_KEY, "pid-1-cafebabe")
        .unwrap();
    let outcome = env.pipeline.run(RunTrigger::Manual { force: true }).await;
    assert_eq!(outcome, RunOutcome::Completed { matched: 1, notified: 1 });
    assert_eq!(env.registry.get_state(RUN_LEASE_KEY).unwrap(), None);
}
