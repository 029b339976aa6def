use chat_api::{ChatApiError, Citation, Role, SubmissionContext};
use nc_chatbot::{Message, SessionIdentity, TurnController, TurnPhase, TurnSnapshot};
use pretty_assertions::assert_eq;

fn controller() -> TurnController {
    TurnController::with_session(
        SubmissionContext::new("tenant-1", "user-2").with_ui("CP"),
        SessionIdentity::with_id("session-1"),
    )
}

#[test]
fn multi_record_chunk_yields_single_sealed_assistant_message() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");
    assert!(controller.on_stream_opened(ticket.turn_id));

    let report = controller.on_chunk(
        ticket.turn_id,
        concat!(
            "{\"type\":\"partial\",\"text\":\"Hi\"}\n",
            "{\"type\":\"partial\",\"text\":\"Hi there\"}\n",
            "{\"type\":\"final\",\"text\":\"Hi there\"}\n",
        ),
    );
    controller.on_stream_end(ticket.turn_id);

    assert_eq!(report.records, 3);
    assert_eq!(
        controller.transcript().messages(),
        &[Message::user("hello"), Message::assistant("Hi there", false)]
    );
    assert_eq!(controller.phase(), TurnPhase::Completed);
    assert!(!controller.pending());
}

#[test]
fn record_split_across_chunks_is_applied_once() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");

    let first = controller.on_chunk(ticket.turn_id, "{\"type\":\"partial\",\"te");
    assert_eq!(first.records, 0);
    assert_eq!(controller.transcript().len(), 1);

    controller.on_chunk(ticket.turn_id, "xt\":\"Hi\"}\n");
    assert_eq!(
        controller.transcript().last(),
        Some(&Message::assistant("Hi", true))
    );
}

#[test]
fn undelimited_remainder_is_flushed_on_stream_end() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");

    controller.on_chunk(ticket.turn_id, "{\"type\":\"final\",\"text\":\"Bye\"}");
    assert_eq!(controller.transcript().len(), 1);

    let report = controller.on_stream_end(ticket.turn_id);
    assert_eq!(report.records, 1);
    assert_eq!(
        controller.transcript().last(),
        Some(&Message::assistant("Bye", false))
    );
}

#[test]
fn decode_failure_skips_record_without_touching_pending() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");

    let report = controller.on_chunk(
        ticket.turn_id,
        "{\"type\":\"partial\",\"text\":\"A\"}\n{not json\n{\"type\":\"partial\",\"text\":\"AB\"}\n",
    );

    assert_eq!(report.records, 3);
    assert_eq!(report.decode_failures, 1);
    assert!(controller.pending());
    assert_eq!(controller.phase(), TurnPhase::Streaming);
    assert_eq!(
        controller.transcript().last(),
        Some(&Message::assistant("AB", true))
    );
}

#[test]
fn guardrail_notice_is_set_immediately_and_cleared_by_next_turn() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");

    let report = controller.on_chunk(
        ticket.turn_id,
        "{\"type\":\"guardrail\",\"data\":{\"guardrailAction\":\"BLOCK\"}}\n",
    );
    assert!(report.notice_changed);
    assert!(!report.transcript_changed);
    assert_eq!(controller.guardrail_notice(), Some("BLOCK"));
    assert_eq!(controller.transcript().len(), 1);

    controller.on_stream_end(ticket.turn_id);
    assert_eq!(controller.guardrail_notice(), Some("BLOCK"));

    controller.begin_turn("again").expect("turn should start");
    assert_eq!(controller.guardrail_notice(), None);
}

#[test]
fn final_metadata_guardrail_sets_notice_alongside_message() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");

    controller.on_chunk(
        ticket.turn_id,
        "{\"type\":\"FINAL\",\"text\":\"Redacted answer\",\"metadata\":{\"guardrailAction\":\"MASK\",\"citations\":[]}}\n",
    );

    assert_eq!(controller.guardrail_notice(), Some("MASK"));
    assert_eq!(
        controller.transcript().last(),
        Some(&Message::assistant("Redacted answer", false).with_citations(Vec::new()))
    );
    assert!(!controller.pending());
}

#[test]
fn odd_citation_shapes_never_cost_the_final_answer() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hi").expect("turn should start");

    let report = controller.on_chunk(
        ticket.turn_id,
        concat!(
            "{\"type\":\"partial\",\"text\":\"Draft\"}\n",
            "{\"type\":\"final\",\"text\":\"Final answer\",\"metadata\":{\"citations\":",
            "[{\"docId\":\"d1\",\"sourceId\":\"d1\",\"title\":\"Guide\",\"reference\":\"Guide p.1\",\"snippet\":\"intro\"}]}}\n",
        ),
    );

    assert_eq!(report.decode_failures, 0);
    assert_eq!(
        controller.transcript().messages(),
        &[
            Message::user("hi"),
            Message::assistant("Final answer", false).with_citations(vec![
                Citation::new("Guide", "Guide p.1", "intro").with_source_id("d1")
            ]),
        ]
    );

    let ticket = controller.begin_turn("again").expect("turn should start");
    let report = controller.on_chunk(
        ticket.turn_id,
        "{\"type\":\"final\",\"text\":\"Final answer\",\"data\":{\"citations\":[\"doc-1\"]}}\n",
    );

    assert_eq!(report.decode_failures, 0);
    assert_eq!(
        controller.transcript().last(),
        Some(&Message::assistant("Final answer", false))
    );
}

#[test]
fn allow_guardrail_action_sets_no_notice() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");

    controller.on_chunk(
        ticket.turn_id,
        "{\"type\":\"final\",\"text\":\"ok\",\"metadata\":{\"guardrailAction\":\"ALLOW\"}}\n",
    );
    assert_eq!(controller.guardrail_notice(), None);
}

#[test]
fn new_turn_supersedes_active_turn_and_invokes_its_cancel() {
    let mut controller = controller();
    let first = controller.begin_turn("one").expect("turn should start");
    controller.on_stream_opened(first.turn_id);
    controller.on_chunk(first.turn_id, "{\"type\":\"partial\",\"text\":\"draft\"}\n");

    let second = controller.begin_turn("two").expect("turn should start");

    assert!(first.cancel.load(std::sync::atomic::Ordering::Acquire));
    assert!(!second.cancel.load(std::sync::atomic::Ordering::Acquire));
    assert_eq!(controller.active_turn(), Some(second.turn_id));

    let late = controller.on_chunk(first.turn_id, "{\"type\":\"partial\",\"text\":\"draft more\"}\n");
    assert!(!late.changed());
    assert_eq!(
        controller.transcript().messages(),
        &[
            Message::user("one"),
            Message::assistant("draft", false),
            Message::user("two"),
        ]
    );
}

#[test]
fn explicit_cancel_is_silent_and_keeps_transcript() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");
    controller.on_chunk(ticket.turn_id, "{\"type\":\"partial\",\"text\":\"partial answer\"}\n");

    assert_eq!(controller.cancel_active(), Some(ticket.turn_id));
    assert!(!controller.on_transport_error(ticket.turn_id, &ChatApiError::Cancelled));

    assert_eq!(
        controller.snapshot(),
        TurnSnapshot {
            turn_id: Some(ticket.turn_id),
            phase: TurnPhase::Cancelled,
            pending: false,
            guardrail_notice: None,
            last_error: None,
        }
    );
    assert_eq!(
        controller.transcript().last(),
        Some(&Message::assistant("partial answer", true))
    );
    assert_eq!(controller.cancel_active(), None);
}

#[test]
fn transport_failure_is_recorded_and_clears_pending() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");
    controller.on_chunk(ticket.turn_id, "{\"type\":\"partial\",\"text\":\"Hi\"}\n");

    assert!(controller.on_transport_error(
        ticket.turn_id,
        &ChatApiError::StreamClosed("connection reset".to_owned()),
    ));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, TurnPhase::Failed);
    assert!(!snapshot.pending);
    assert!(snapshot
        .last_error
        .as_deref()
        .is_some_and(|error| error.contains("connection reset")));
    assert_eq!(controller.transcript().len(), 2);

    controller.begin_turn("retry by hand").expect("turn should start");
    assert_eq!(controller.last_error(), None);
    assert_eq!(controller.transcript().messages()[1].role, Role::Assistant);
    assert!(!controller.transcript().messages()[1].streaming);
}

#[test]
fn callbacks_after_completion_are_ignored() {
    let mut controller = controller();
    let ticket = controller.begin_turn("hello").expect("turn should start");
    controller.on_stream_end(ticket.turn_id);

    let report = controller.on_chunk(ticket.turn_id, "{\"type\":\"partial\",\"text\":\"late\"}\n");
    assert_eq!(report.records, 0);
    assert!(!controller.on_transport_error(
        ticket.turn_id,
        &ChatApiError::StreamClosed("late".to_owned()),
    ));
    assert_eq!(controller.phase(), TurnPhase::Completed);
}

#[test]
fn submission_carries_session_context_and_message_as_typed() {
    let mut controller = controller();
    let ticket = controller.begin_turn("  where is job 42?  ").expect("turn should start");

    assert_eq!(ticket.submission.session_id, "session-1");
    assert_eq!(ticket.submission.message, "  where is job 42?  ");
    assert_eq!(ticket.submission.context.ui.as_deref(), Some("CP"));
    assert_eq!(
        controller.transcript().messages(),
        &[Message::user("  where is job 42?  ")]
    );
}
