use ollama_api::events::interpret_payload;
use ollama_api::{ChatMetrics, ChatStreamEvent};

#[test]
fn record_may_carry_both_channels_at_once() {
    let events = interpret_payload(r#"{"thinking":"checking the index","content":"Posts about"}"#)
        .expect("record should decode");

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        ChatStreamEvent::ReasoningDelta {
            text: "checking the index".to_string(),
        }
    );
    assert_eq!(
        events[1],
        ChatStreamEvent::ContentDelta {
            text: "Posts about".to_string(),
        }
    );
}

#[test]
fn done_record_carries_metrics() {
    let events = interpret_payload(
        r#"{"done":true,"metrics":{"eval_count":42,"eval_duration":1.5,"total_duration":2.0}}"#,
    )
    .expect("record should decode");

    let ChatStreamEvent::Done {
        metrics: Some(metrics),
    } = &events[0]
    else {
        panic!("expected done with metrics, got {events:?}");
    };
    assert_eq!(metrics.eval_count, 42);
    assert_eq!(metrics.tokens_per_second(), Some(28.0));
}

#[test]
fn done_without_metrics_still_completes() {
    let events = interpret_payload(r#"{"done":true}"#).expect("record should decode");
    assert_eq!(events, vec![ChatStreamEvent::Done { metrics: None }]);
}

#[test]
fn final_record_may_combine_content_and_done() {
    let events = interpret_payload(r#"{"content":"!","done":true}"#).expect("record should decode");

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], ChatStreamEvent::ContentDelta { .. }));
    assert!(matches!(events[1], ChatStreamEvent::Done { .. }));
}

#[test]
fn error_record_surfaces_server_message_verbatim() {
    let events = interpret_payload(r#"{"error":"model 'qwen3' not found"}"#)
        .expect("record should decode");

    assert_eq!(
        events,
        vec![ChatStreamEvent::Error {
            message: "model 'qwen3' not found".to_string(),
        }]
    );
}

#[test]
fn single_token_completion_has_no_rate() {
    let metrics = ChatMetrics {
        eval_count: 1,
        eval_duration: 0.05,
        total_duration: 0.1,
    };

    assert_eq!(metrics.tokens_per_second(), None);
    assert_eq!(metrics.rate_label(), "—");
}

#[test]
fn near_instant_duration_has_no_rate() {
    let metrics = ChatMetrics {
        eval_count: 50,
        eval_duration: 0.1,
        total_duration: 0.2,
    };

    assert_eq!(metrics.tokens_per_second(), None);
}

#[test]
fn meaningful_sample_reports_rate() {
    let metrics = ChatMetrics {
        eval_count: 128,
        eval_duration: 2.0,
        total_duration: 2.4,
    };

    assert_eq!(metrics.tokens_per_second(), Some(64.0));
    assert_eq!(metrics.rate_label(), "64.0 tok/s");
}
