use std::time::Duration;

use application::{AnalysisService, IgnoreReason, TranscriptUpdate, TurnOutcome, TurnPhase};
use domain::{
    AnalysisResponse, Message, ReliabilityIndicator, ReliabilityVerdict, Role, SyncError,
    BOOTSTRAP_MESSAGE,
};
use serde_json::json;
use tests::{
    analytics_fixture, echoed_history, greeting, GatedTransport, ScriptedTransport,
    StalledTransport,
};

const URL: &str = "https://example.com/a";

async fn bootstrapped(replies: Vec<tests::Reply>) -> AnalysisService<ScriptedTransport> {
    let service = AnalysisService::new(ScriptedTransport::new(
        std::iter::once(greeting()).chain(replies),
    ));
    assert!(service.bootstrap().await.is_reconciled());
    service
}

#[tokio::test]
async fn bootstrap_seeds_greeting_without_analytics() {
    let service = AnalysisService::new(ScriptedTransport::new([greeting()]));
    let outcome = service.bootstrap().await;

    let TurnOutcome::Reconciled(report) = outcome else {
        panic!("bootstrap failed: {outcome:?}");
    };
    assert_eq!(report.transcript, TranscriptUpdate::Seeded(1));

    let view = service.view();
    assert_eq!(view.transcript, vec![Message::assistant("Hi, paste a URL")]);
    assert!(view.analytics.is_none());
    assert_eq!(view.phase, TurnPhase::Idle);

    let request = service.transport().last_request().unwrap();
    assert!(request.history.is_empty());
    assert_eq!(request.analytics, json!({}));
    assert_eq!(request.message, BOOTSTRAP_MESSAGE);
}

#[tokio::test]
async fn bootstrap_reply_form_seeds_single_message() {
    let service =
        AnalysisService::new(ScriptedTransport::new([Ok(AnalysisResponse::reply("Welcome!"))]));
    service.bootstrap().await;
    assert_eq!(service.view().transcript, vec![Message::assistant("Welcome!")]);
}

#[tokio::test]
async fn bootstrap_failure_shows_error_and_rolls_nothing_back() {
    let service = AnalysisService::new(ScriptedTransport::new([Err(
        SyncError::TransportFailure("connection refused".into()),
    )]));
    let outcome = service.bootstrap().await;
    assert!(matches!(outcome, TurnOutcome::Failed(_)));

    let view = service.view();
    assert!(view.transcript.is_empty());
    assert!(view.error.unwrap().contains("connection refused"));
    assert_eq!(view.phase, TurnPhase::Idle);
    assert!(!view.busy);
}

#[tokio::test]
async fn successful_analysis_turn() {
    let service = bootstrapped(vec![Ok(AnalysisResponse::with_history(&echoed_history(URL))
        .with_analytics(analytics_fixture())
        .with_url(URL))])
    .await;

    let TurnOutcome::Reconciled(report) = service.submit(URL).await else {
        panic!("turn failed");
    };
    assert!(report.analytics_replaced);
    assert!(report.warnings.is_empty());

    let view = service.view();
    let roles: Vec<Role> = view.transcript.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(view.reliability, ReliabilityVerdict::Real);
    assert_eq!(view.reliability_indicator(), ReliabilityIndicator::Reliable);
    assert!((view.readability_percent.unwrap() - 72.0).abs() < 1e-9);
    assert_eq!(view.current_url.as_deref(), Some(URL));
    assert!(view.error.is_none());
}

#[tokio::test]
async fn failed_turn_restores_transcript() {
    let service = bootstrapped(vec![Err(SyncError::TransportFailure("HTTP 503".into()))]).await;
    let before = service.view().transcript;

    let outcome = service.submit(URL).await;
    let TurnOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };

    let view = service.view();
    assert_eq!(view.transcript, before);
    assert_eq!(view.error.as_deref(), Some(message.as_str()));
    assert_eq!(view.phase, TurnPhase::Idle);
    assert!(!view.busy);
}

#[tokio::test]
async fn malformed_response_is_treated_like_transport_failure() {
    let service = bootstrapped(vec![
        Ok(AnalysisResponse::default().with_analytics(analytics_fixture())),
        Err(SyncError::MalformedResponse("not JSON".into())),
    ])
    .await;
    let before = service.view();

    for _ in 0..2 {
        assert!(matches!(service.submit(URL).await, TurnOutcome::Failed(_)));
        let view = service.view();
        assert_eq!(view.transcript, before.transcript);
        assert_eq!(view.analytics, before.analytics);
        assert!(view.error.is_some());
    }
}

#[tokio::test]
async fn request_carries_optimistic_history_and_raw_analytics() {
    let service = bootstrapped(vec![
        Ok(AnalysisResponse::with_history(&echoed_history(URL))
            .with_analytics(analytics_fixture())),
        Ok(AnalysisResponse::reply("It is formal.")),
    ])
    .await;
    service.submit(URL).await;
    service.submit("  What is the tone?  ").await;

    let request = service.transport().last_request().unwrap();
    assert_eq!(request.message, "What is the tone?");
    assert_eq!(request.history.last(), Some(&Message::user("What is the tone?")));
    assert_eq!(request.history.len(), 4);
    assert!(request.history.iter().all(|m| m.role != Role::System));
    assert_eq!(request.analytics, analytics_fixture());
}

#[tokio::test]
async fn omitted_analytics_keep_previous_snapshot() {
    let service = bootstrapped(vec![
        Ok(AnalysisResponse::with_history(&echoed_history(URL))
            .with_analytics(analytics_fixture())),
        Ok(AnalysisResponse::reply("It is formal.")),
        Ok(AnalysisResponse::reply("Neutral overall.").with_analytics(json!({}))),
    ])
    .await;
    service.submit(URL).await;
    let before = service.view().analytics;
    assert!(before.is_some());

    let TurnOutcome::Reconciled(report) = service.submit("What is the tone?").await else {
        panic!("turn failed");
    };
    assert_eq!(report.transcript, TranscriptUpdate::Appended);
    assert!(!report.analytics_replaced);
    assert_eq!(service.view().analytics, before);

    service.submit("And the sentiment?").await;
    let view = service.view();
    assert_eq!(view.analytics, before);
    assert_eq!(view.transcript.last(), Some(&Message::assistant("Neutral overall.")));
}

#[tokio::test]
async fn degenerate_history_keeps_transcript_but_applies_analytics() {
    let service = bootstrapped(vec![Ok(AnalysisResponse::with_history(&[])
        .with_analytics(analytics_fixture())
        .with_url(URL))])
    .await;

    let TurnOutcome::Reconciled(report) = service.submit(URL).await else {
        panic!("turn failed");
    };
    assert_eq!(report.transcript, TranscriptUpdate::Retained);
    assert!(matches!(report.warnings.as_slice(), [SyncError::DegenerateMerge(_)]));
    assert!(report.analytics_replaced);

    let view = service.view();
    assert_eq!(
        view.transcript,
        vec![Message::assistant("Hi, paste a URL"), Message::user(URL)]
    );
    assert!(view.error.is_none());
    assert_eq!(view.current_url.as_deref(), Some(URL));
}

#[tokio::test]
async fn degenerate_history_falls_back_to_reply() {
    let mut response = AnalysisResponse::reply("Here is the summary.");
    response.chat_history = Some(json!([{"role": "narrator", "content": "?"}]));
    let service = bootstrapped(vec![Ok(response)]).await;

    let TurnOutcome::Reconciled(report) = service.submit(URL).await else {
        panic!("turn failed");
    };
    assert_eq!(report.transcript, TranscriptUpdate::Appended);
    assert_eq!(
        service.view().transcript.last(),
        Some(&Message::assistant("Here is the summary."))
    );
}

fn no_adjacent_users(transcript: &[Message]) -> bool {
    transcript
        .windows(2)
        .all(|pair| !(pair[0].role == Role::User && pair[1].role == Role::User))
}

#[tokio::test]
async fn unconfirmed_message_is_replaced_by_next_turn() {
    let service = bootstrapped(vec![
        Ok(AnalysisResponse::with_history(&[])),
        Ok(AnalysisResponse::reply("answer")),
    ])
    .await;

    let TurnOutcome::Reconciled(report) = service.submit("q1").await else {
        panic!("turn failed");
    };
    assert_eq!(report.transcript, TranscriptUpdate::Retained);
    service.submit("q2").await;

    let request = service.transport().last_request().unwrap();
    assert_eq!(
        request.history,
        vec![Message::assistant("Hi, paste a URL"), Message::user("q2")]
    );

    let transcript = service.view().transcript;
    assert_eq!(
        transcript,
        vec![
            Message::assistant("Hi, paste a URL"),
            Message::user("q2"),
            Message::assistant("answer"),
        ]
    );
    assert!(no_adjacent_users(&transcript));
}

#[tokio::test]
async fn failed_turn_restores_unconfirmed_message() {
    let service = bootstrapped(vec![
        Ok(AnalysisResponse::with_history(&[])),
        Err(SyncError::TransportFailure("down".into())),
        Ok(AnalysisResponse::reply("answer")),
    ])
    .await;

    service.submit("q1").await;
    let before = service.view().transcript;
    assert!(matches!(service.submit("q2").await, TurnOutcome::Failed(_)));
    assert_eq!(service.view().transcript, before);

    service.submit("q3").await;
    let transcript = service.view().transcript;
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1], Message::user("q3"));
    assert!(no_adjacent_users(&transcript));
}

#[tokio::test]
async fn invalid_analytics_do_not_unwind_the_transcript() {
    let service = bootstrapped(vec![Ok(AnalysisResponse::with_history(&echoed_history(URL))
        .with_analytics(json!({"readability_score": "very"})))])
    .await;

    let TurnOutcome::Reconciled(report) = service.submit(URL).await else {
        panic!("turn failed");
    };
    assert!(matches!(report.transcript, TranscriptUpdate::Merged(3)));
    assert!(matches!(report.warnings.as_slice(), [SyncError::InvalidAnalytics(_)]));

    let view = service.view();
    assert_eq!(view.transcript.len(), 3);
    assert!(view.analytics.is_none());
    assert!(view.error.is_none());
}

#[tokio::test]
async fn url_is_last_write_wins() {
    let service = bootstrapped(vec![
        Ok(AnalysisResponse::reply("one").with_url("https://example.com/1")),
        Ok(AnalysisResponse::reply("two")),
        Ok(AnalysisResponse::reply("three").with_url("https://example.com/3")),
    ])
    .await;

    service.submit("first").await;
    assert_eq!(service.view().current_url.as_deref(), Some("https://example.com/1"));
    service.submit("second").await;
    assert_eq!(service.view().current_url.as_deref(), Some("https://example.com/1"));
    service.submit("third").await;
    assert_eq!(service.view().current_url.as_deref(), Some("https://example.com/3"));
}

#[tokio::test]
async fn system_messages_never_surface() {
    let history = vec![
        Message::system("a"),
        Message::assistant("b"),
        Message::system("c"),
        Message::user("d"),
        Message::system("e"),
        Message::user("d"),
        Message::assistant("f"),
        Message::system("g"),
    ];
    let service = bootstrapped(vec![Ok(AnalysisResponse::with_history(&history))]).await;
    service.submit("d").await;

    let view = service.view();
    assert!(view.transcript.iter().all(|m| m.role != Role::System));
    assert_eq!(
        view.transcript,
        vec![Message::assistant("b"), Message::user("d"), Message::assistant("f")]
    );
}

#[tokio::test]
async fn no_adjacent_user_messages_after_merge() {
    let mut history = vec![Message::assistant("hi")];
    history.extend(std::iter::repeat(Message::user("u")).take(5));
    history.push(Message::assistant("a"));
    history.extend(std::iter::repeat(Message::user("v")).take(3));
    let service = bootstrapped(vec![Ok(AnalysisResponse::with_history(&history))]).await;
    service.submit("v").await;

    let transcript = service.view().transcript;
    assert_eq!(transcript.len(), 4);
    assert!(transcript
        .windows(2)
        .all(|pair| !(pair[0].role == Role::User && pair[1].role == Role::User)));
}

#[tokio::test]
async fn error_clears_on_next_submission_and_on_dismiss() {
    let service = bootstrapped(vec![
        Err(SyncError::TransportFailure("down".into())),
        Ok(AnalysisResponse::reply("back")),
        Err(SyncError::TransportFailure("down again".into())),
    ])
    .await;

    service.submit("one").await;
    assert!(service.view().error.is_some());
    service.submit("two").await;
    assert!(service.view().error.is_none());

    service.submit("three").await;
    assert!(service.view().error.is_some());
    service.dismiss_error();
    assert!(service.view().error.is_none());
}

#[tokio::test]
async fn concurrent_submission_is_rejected_while_busy() {
    let service = AnalysisService::new(GatedTransport::new(Ok(AnalysisResponse::reply("done"))));

    let (first, (mid_flight, second)) = tokio::join!(service.submit("first"), async {
        let view = service.view();
        let outcome = service.submit("second").await;
        service.transport().release();
        (view, outcome)
    });

    assert!(first.is_reconciled());
    assert_eq!(second, TurnOutcome::Ignored(IgnoreReason::Busy));
    assert!(mid_flight.busy);
    assert_eq!(mid_flight.phase, TurnPhase::Sending);
    assert_eq!(mid_flight.transcript, vec![Message::user("first")]);

    let view = service.view();
    assert!(!view.busy);
    assert_eq!(
        view.transcript,
        vec![Message::user("first"), Message::assistant("done")]
    );
}

#[tokio::test]
async fn reset_is_refused_while_busy() {
    let service = AnalysisService::new(GatedTransport::new(Ok(AnalysisResponse::reply("done"))));
    let (_, refused) = tokio::join!(service.submit("first"), async {
        let refused = !service.reset();
        service.transport().release();
        refused
    });
    assert!(refused);
    assert!(service.reset());
    assert!(service.view().transcript.is_empty());
}

#[tokio::test]
async fn abandoned_turn_is_rolled_back() {
    let service = AnalysisService::new(StalledTransport);
    let before = service.view().transcript;

    let timed_out = tokio::time::timeout(Duration::from_millis(20), service.submit(URL)).await;
    assert!(timed_out.is_err());

    let view = service.view();
    assert_eq!(view.transcript, before);
    assert!(!view.busy);
    assert_eq!(view.phase, TurnPhase::Idle);
}

#[tokio::test]
async fn rollback_restores_any_prior_transcript() {
    for message in ["", "x", URL, "multi\nline", "   padded   ", "ünïcödé"] {
        let service = bootstrapped(vec![
            Ok(AnalysisResponse::reply("a1")),
            Err(SyncError::TransportFailure("down".into())),
        ])
        .await;
        service.submit("q1").await;
        let before = service.view().transcript;

        service.submit(message).await;
        assert_eq!(service.view().transcript, before, "{message:?}");
    }
}
