mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use complaint_pipeline::ingestion::Disposition;
use complaint_pipeline::messaging::ListQueue;
use complaint_pipeline::models::{ComplaintStatus, ProcessedReference};

#[tokio::test]
async fn test_draining_yields_one_terminal_outcome_per_item() {
    let pipeline = TestPipeline::new();
    let list = pipeline.registration_queue().to_string();

    let entries = vec![
        submission("u1", "Water Leakage", "pipe burst near the school").to_string(),
        submission("u2", "Water Leakage", "no supply since monday").to_string(),
        // Same as the first, flagged duplicate
        submission("u1", "Water Leakage", "pipe burst near the school").to_string(),
        // Missing required fields
        serde_json::json!({"submitterId": "u3"}).to_string(),
        submission("u4", "Drainage", "open drain overflowing").to_string(),
    ];
    for entry in &entries {
        pipeline.queue.push(&list, entry).await.unwrap();
    }

    let processor = &pipeline.components.processor;
    let mut dispositions = Vec::new();
    loop {
        let outcome = processor.process_next().await;
        if outcome.disposition == Disposition::Empty {
            break;
        }
        assert!(outcome.disposition.is_terminal(), "unexpected {outcome:?}");
        dispositions.push(outcome.disposition);
    }

    assert_eq!(dispositions.len(), entries.len());
    assert_eq!(
        dispositions,
        vec![
            Disposition::Persisted,
            Disposition::Persisted,
            Disposition::Duplicate,
            Disposition::InvalidRemoved,
            Disposition::Persisted,
        ]
    );
    assert_eq!(pipeline.queue.len(&list).await.unwrap(), 0);
    assert_eq!(pipeline.store.complaints().len(), 4);
}

#[tokio::test]
async fn test_duplicate_is_persisted_but_not_routed() {
    let pipeline = TestPipeline::new();
    let payload = submission("u1", "Water Leakage", "Pipe   burst near the SCHOOL").to_string();
    let repeat = submission("u1", "Water Leakage", "pipe burst near the school").to_string();
    pipeline.queue.push(pipeline.registration_queue(), &payload).await.unwrap();
    pipeline.queue.push(pipeline.registration_queue(), &repeat).await.unwrap();

    let first = pipeline.components.processor.process_next().await;
    let second = pipeline.components.processor.process_next().await;

    let first = first.result.unwrap();
    let second = second.result.unwrap();
    assert!(!first.is_duplicate);
    assert!(second.is_duplicate);
    assert!(second.seq > first.seq);

    let routed = pipeline.queue.items(pipeline.processed_queue());
    assert_eq!(routed.len(), 1);
    let reference = ProcessedReference::parse(&routed[0]).unwrap();
    assert_eq!(reference.id, first.id.to_string());
}

#[tokio::test]
async fn test_repeat_outside_window_is_not_duplicate() {
    let pipeline = TestPipeline::new();
    let payload = submission("u1", "Streetlight", "light out on lane 4").to_string();
    pipeline.queue.push(pipeline.registration_queue(), &payload).await.unwrap();
    let first = pipeline.components.processor.process_next().await.result.unwrap();

    pipeline
        .store
        .backdate_complaint(first.id, Utc::now() - ChronoDuration::hours(25));

    pipeline.queue.push(pipeline.registration_queue(), &payload).await.unwrap();
    let second = pipeline.components.processor.process_next().await;
    assert_eq!(second.disposition, Disposition::Persisted);
    assert_eq!(pipeline.queue.len(pipeline.processed_queue()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_different_sub_category_is_not_duplicate() {
    let pipeline = TestPipeline::new();
    for sub_category in ["Water Leakage", "Low Pressure"] {
        let payload = submission("u1", sub_category, "same words").to_string();
        pipeline.queue.push(pipeline.registration_queue(), &payload).await.unwrap();
    }

    let a = pipeline.components.processor.process_next().await;
    let b = pipeline.components.processor.process_next().await;
    assert_eq!(a.disposition, Disposition::Persisted);
    assert_eq!(b.disposition, Disposition::Persisted);
}

#[tokio::test]
async fn test_persisted_complaint_fields() {
    let pipeline = TestPipeline::new();
    let mut payload = submission("u9", "Water Leakage", "tap broken");
    payload["urgency"] = "HIGH".into();
    payload["location"]["latitude"] = 23.34.into();
    payload["location"]["longitude"] = 85.31.into();
    pipeline
        .queue
        .push(pipeline.registration_queue(), &payload.to_string())
        .await
        .unwrap();

    let outcome = pipeline.components.processor.process_next().await;
    let summary = outcome.result.unwrap();
    assert_eq!(summary.status, ComplaintStatus::Registered);

    let stored = pipeline.store.complaint(summary.id).unwrap();
    assert_eq!(stored.submitter_id, "u9");
    assert_eq!(stored.urgency.as_str(), "HIGH");
    assert!(!stored.is_assigned());
    let location = stored.location.unwrap();
    assert_eq!(location.district, "Ranchi");
    assert_eq!(location.latitude, Some(23.34));
}

#[tokio::test]
async fn test_invalid_values_are_removed_without_persisting() {
    let pipeline = TestPipeline::new();
    let mut bad_pin = submission("u1", "Water Leakage", "x");
    bad_pin["location"]["pin"] = "12AB".into();
    let mut bad_department = submission("u1", "Water Leakage", "y");
    bad_department["assignedDepartment"] = "SPACE_PROGRAM".into();

    for payload in [bad_pin, bad_department, serde_json::json!([1, 2, 3])] {
        pipeline
            .queue
            .push(pipeline.registration_queue(), &payload.to_string())
            .await
            .unwrap();
        let outcome = pipeline.components.processor.process_next().await;
        assert_eq!(outcome.disposition, Disposition::InvalidRemoved);
        assert!(!outcome.processed);
    }

    assert!(pipeline.store.complaints().is_empty());
    assert_eq!(pipeline.queue.len(pipeline.registration_queue()).await.unwrap(), 0);
    assert!(pipeline.queue.items(pipeline.dead_letter_queue()).is_empty());
}

#[tokio::test]
async fn test_invalid_entries_dead_lettered_when_enabled() {
    let mut config = test_config();
    config.ingestion.dead_letter_invalid = true;
    let pipeline = TestPipeline::with_config(config);
    let payload = serde_json::json!({"submitterId": "u1"}).to_string();
    pipeline.queue.push(pipeline.registration_queue(), &payload).await.unwrap();

    let outcome = pipeline.components.processor.process_next().await;
    assert_eq!(outcome.disposition, Disposition::InvalidRemoved);
    assert_eq!(pipeline.queue.items(pipeline.dead_letter_queue()), vec![payload]);
}
