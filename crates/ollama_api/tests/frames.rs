use ollama_api::{ChatStreamDecoder, ChatStreamEvent};

fn content(events: &[ChatStreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            ChatStreamEvent::ContentDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn framing_parses_deltas_and_done() {
    let body = concat!(
        "data: {\"thinking\":\"let me see\"}\n",
        "data: {\"content\":\"Hello\"}\n",
        "data: {\"done\":true,\"metrics\":{\"eval_count\":8,\"eval_duration\":0.4,\"total_duration\":0.9}}\n",
    );

    let events = ChatStreamDecoder::parse_lines(body);
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], ChatStreamEvent::ReasoningDelta { .. }));
    assert!(matches!(events[1], ChatStreamEvent::ContentDelta { .. }));
    assert!(matches!(events[2], ChatStreamEvent::Done { .. }));
}

#[test]
fn decoding_is_chunk_boundary_independent() {
    let body = concat!(
        "data: {\"thinking\":\"a\"}\n",
        "data: {\"content\":\"Hello, \"}\n",
        "data: {\"content\":\"world\"}\n",
        "data: {\"done\":true}\n",
    );
    let expected = ChatStreamDecoder::parse_lines(body);

    for split in 0..=body.len() {
        let (head, tail) = body.as_bytes().split_at(split);
        let mut decoder = ChatStreamDecoder::default();
        let mut events = decoder.feed(head);
        events.extend(decoder.feed(tail));

        assert_eq!(events, expected, "split at byte {split} diverged");
    }
}

#[test]
fn line_split_mid_payload_reassembles_content() {
    let mut decoder = ChatStreamDecoder::default();
    let mut events = decoder.feed(b"data: {\"content\":\"Hel");
    assert!(events.is_empty());

    events.extend(decoder.feed(b"lo\"}\n"));
    assert_eq!(content(&events), "Hello");
}

#[test]
fn blank_and_non_data_lines_are_dropped() {
    let body = concat!(
        "\n",
        ": keep-alive\n",
        "event: message\n",
        "data: {\"content\":\"kept\"}\n",
        "data: \n",
    );

    let events = ChatStreamDecoder::parse_lines(body);
    assert_eq!(content(&events), "kept");
}

#[test]
fn corrupt_record_is_skipped_and_stream_continues() {
    let body = concat!(
        "data: {broken-json\n",
        "data: {\"content\":\"after\"}\n",
    );

    let events = ChatStreamDecoder::parse_lines(body);
    assert_eq!(events.len(), 1);
    assert_eq!(content(&events), "after");
}

#[test]
fn trailing_partial_line_is_never_emitted() {
    let mut decoder = ChatStreamDecoder::default();
    let events = decoder.feed(b"data: {\"content\":\"truncated\"}");

    assert!(events.is_empty());
    assert!(!decoder.is_empty_buffer());
    decoder.finish();
}

#[test]
fn crlf_terminated_lines_decode() {
    let events = ChatStreamDecoder::parse_lines("data: {\"content\":\"windows\"}\r\n");
    assert_eq!(content(&events), "windows");
}
