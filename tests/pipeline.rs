//! End-to-end flow: answer the survey, predict, resolve, submit.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use boussole::catalog::first_option_answers;
use boussole::model::bundle::{ArtifactBundle, BundleError, FEATURE_COLUMNS_FILE};
use boussole::model::{ModelAdapter, DEMO_CONFIDENCE, DEMO_DOMAIN};
use boussole::store::{SqliteStudentStore, StudentStore};
use boussole::submit::SubmitError;
use boussole::{resolve_with_schools, PredictionSource, SchoolDirectory, SubmissionCoordinator, SubmissionPath};

// Nothing listens on port 9; connection attempts fail immediately.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:9/api/submit";

async fn seeded_store(dir: &std::path::Path) -> (Arc<SqliteStudentStore>, String) {
    let store = SqliteStudentStore::new(dir.join("students.db")).await.unwrap();
    store.create_class("Terminale S1", "TS1").await.unwrap();
    let student_id = store.register_student("Yasmine Alaoui", "TS1").await.unwrap();
    (Arc::new(store), student_id)
}

#[tokio::test]
async fn full_flow_with_trained_model_and_offline_endpoint() {
    let dir = tempdir().unwrap();
    common::write_bundle(dir.path());

    let adapter = ModelAdapter::load(dir.path());
    assert!(!adapter.is_demo());

    let mut answers = first_option_answers();
    answers.set_choice(common::SCIENCES_PROMPT, "Oui, beaucoup");
    answers.set_choice(common::ARTS_PROMPT, "Non");
    answers.validate_complete().unwrap();

    let prediction = adapter.predict(&answers);
    assert_eq!(prediction.source, PredictionSource::Model);
    assert!(adapter.known_labels().contains(&prediction.domain));
    assert!((0.0..=100.0).contains(&prediction.confidence));
    // Science enthusiasm dominates the synthetic weights.
    assert_eq!(prediction.domain, "informatique / ingénierie");

    let resolution = resolve_with_schools(&prediction.domain, &SchoolDirectory::new(Vec::new()));
    assert!(!resolution.careers.is_empty());
    assert!(!resolution.description.is_empty());

    let (store, student_id) = seeded_store(dir.path()).await;
    let coordinator =
        SubmissionCoordinator::new(store.clone(), DEAD_ENDPOINT, Duration::from_millis(500))
            .unwrap();
    let outcome = coordinator
        .submit(&student_id, &prediction.domain, prediction.confidence, &answers)
        .await
        .unwrap();
    assert!(outcome.persisted);
    assert_eq!(outcome.via, SubmissionPath::Local);

    let saved = store.last_response(&student_id).await.unwrap().unwrap();
    assert_eq!(saved["domaine"], prediction.domain.as_str());
    assert_eq!(saved["local_backup"], true);
    assert_eq!(store.response_count(&student_id).await.unwrap(), 1);
}

#[tokio::test]
async fn demo_mode_still_completes_the_flow() {
    let dir = tempdir().unwrap();
    let adapter = ModelAdapter::load(&dir.path().join("no_model_here"));
    assert!(adapter.is_demo());

    let mut answers = first_option_answers();
    answers.validate_complete().unwrap();
    let prediction = adapter.predict(&answers);
    assert_eq!(prediction.source, PredictionSource::Fallback);
    assert_eq!(prediction.domain, DEMO_DOMAIN);
    assert_eq!(prediction.confidence, DEMO_CONFIDENCE);

    let resolution = resolve_with_schools(&prediction.domain, &SchoolDirectory::new(Vec::new()));
    assert_eq!(resolution.icon, "💻");

    let (store, student_id) = seeded_store(dir.path()).await;
    let coordinator =
        SubmissionCoordinator::new(store.clone(), DEAD_ENDPOINT, Duration::from_millis(500))
            .unwrap();
    let outcome = coordinator
        .submit(&student_id, &prediction.domain, prediction.confidence, &answers)
        .await
        .unwrap();
    assert_eq!(outcome.via, SubmissionPath::Local);
}

#[tokio::test]
async fn unknown_student_is_refused_before_any_network_call() {
    let dir = tempdir().unwrap();
    let (store, _) = seeded_store(dir.path()).await;
    // A hanging endpoint would make this test time out if the coordinator
    // contacted it first; the id check must short-circuit.
    let coordinator = SubmissionCoordinator::new(
        store,
        "http://192.0.2.1:80/api/submit",
        Duration::from_secs(30),
    )
    .unwrap();

    let answers = first_option_answers();
    let err = tokio::time::timeout(
        Duration::from_secs(2),
        coordinator.submit("etu_ghost", "sciences", 50.0, &answers),
    )
    .await
    .expect("refusal must not wait on the network")
    .unwrap_err();
    assert!(matches!(err, SubmitError::UnknownStudent(id) if id == "etu_ghost"));
}

#[tokio::test]
async fn reachable_endpoint_is_mirrored_locally() {
    let dir = tempdir().unwrap();
    let (store, student_id) = seeded_store(dir.path()).await;

    // Serve the HTTP API from the same store, then submit to it.
    let app = boussole::server::router(boussole::server::AppState { store: store.clone() });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let coordinator = SubmissionCoordinator::new(
        store.clone(),
        format!("http://{addr}/api/submit"),
        Duration::from_secs(5),
    )
    .unwrap();

    let mut answers = first_option_answers();
    answers.validate_complete().unwrap();
    let outcome = coordinator
        .submit(&student_id, "santé / social", 72.5, &answers)
        .await
        .unwrap();
    assert_eq!(outcome.via, SubmissionPath::Remote);

    // One record from the endpoint handler, one from the local mirror.
    assert_eq!(store.response_count(&student_id).await.unwrap(), 2);
    let saved = store.last_response(&student_id).await.unwrap().unwrap();
    assert_eq!(saved["domaine"], "santé / social");
    assert!(saved.get("local_backup").is_none());
}

#[tokio::test]
async fn reordered_feature_columns_are_rejected_as_drift() {
    let dir = tempdir().unwrap();
    common::write_bundle(dir.path());

    let mut columns = common::feature_columns();
    columns.swap(0, 3);
    std::fs::write(
        dir.path().join(FEATURE_COLUMNS_FILE),
        serde_json::to_string(&columns).unwrap(),
    )
    .unwrap();

    let err = ArtifactBundle::load(dir.path()).unwrap_err();
    assert!(matches!(err, BundleError::SchemaDrift { .. }));
    assert!(ModelAdapter::load(dir.path()).is_demo());
}

#[tokio::test]
async fn tampered_label_list_is_rejected() {
    let dir = tempdir().unwrap();
    common::write_bundle(dir.path());

    let mut labels = common::labels();
    labels.push("métiers imaginaires".to_string());
    std::fs::write(
        dir.path().join(boussole::model::bundle::LABELS_FILE),
        serde_json::to_string(&labels).unwrap(),
    )
    .unwrap();

    let err = ArtifactBundle::load(dir.path()).unwrap_err();
    assert!(matches!(err, BundleError::ClassListMismatch));
}

#[tokio::test]
async fn missing_artifacts_are_listed_by_name() {
    let dir = tempdir().unwrap();
    common::write_bundle(dir.path());
    std::fs::remove_file(dir.path().join(boussole::model::bundle::WEIGHTS_FILE)).unwrap();

    match ArtifactBundle::load(dir.path()) {
        Err(BundleError::MissingArtifacts(names)) => {
            assert_eq!(names, vec![boussole::model::bundle::WEIGHTS_FILE.to_string()]);
        }
        other => panic!("expected MissingArtifacts, got {other:?}"),
    }
}
