//! Timer-driven lifecycle integration tests.
//!
//! Exercises the full path: service mutation -> scheduler registration ->
//! virtual deadline -> transition engine -> aggregation and notification.
//! All on paused tokio time; no wall-clock waits.

mod common;

use chrono::Duration;
use conclave::clock::Clock;
use conclave::lifecycle::TimerKind;
use conclave::model::{Phase, SuggestionInput, VoteInput};
use conclave::push::PushEvent;
use conclave::types::ConclaveError;

use common::{start_instant, test_app};

// =============================================================================
// End-to-end: private consensus from creation to finish
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_private_consensus_full_lifecycle() {
    let app = test_app();
    let alice = app.user("alice");
    let bob = app.user("bob");

    let input = app.private_input("Team offsite", 10, 20, "hunter2");
    let created = app.state.consensus.create(input, &alice).unwrap();
    assert_eq!(created.phase, Phase::Pending);
    assert!(created.admin);
    assert!(created.has_access);
    assert!(created.following);

    // Bob joins with the correct secret before voting starts.
    let joined = app
        .state
        .consensus
        .request_access(
            created.id,
            &conclave::model::AccessRequest {
                secret: "hunter2".into(),
            },
            &bob,
        )
        .unwrap();
    assert!(joined.has_access);

    // Suggestions are accepted before the voting-start deadline.
    let suggestion = app
        .state
        .suggestions
        .create(
            created.id,
            SuggestionInput {
                title: "Mountain cabin".into(),
            },
            &alice,
        )
        .unwrap();

    // A vote before the voting-start deadline is a validation failure.
    let early = app
        .state
        .suggestions
        .vote(
            created.id,
            suggestion.id,
            VoteInput { acceptance: 5.0 },
            &alice,
        )
        .unwrap_err();
    assert!(matches!(early, ConclaveError::Validation(_)));

    // Cross the voting-start boundary.
    app.run_timers(11).await;

    let voting = app.state.consensus.get(created.id, Some(&alice)).unwrap();
    assert_eq!(voting.phase, Phase::Voting);
    assert!(!voting.finished);

    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, PushEvent::VotingStarted);
    assert_eq!(sent[0].consensus.title, "Team offsite");

    // Both users vote inside the window.
    let voted = app
        .state
        .suggestions
        .vote(
            created.id,
            suggestion.id,
            VoteInput { acceptance: 5.0 },
            &alice,
        )
        .unwrap();
    assert_eq!(voted.own_acceptance, Some(5.0));
    assert_eq!(voted.overall_acceptance, None);
    assert_eq!(voted.heavy_objections_count, None);

    app.state
        .suggestions
        .vote(
            created.id,
            suggestion.id,
            VoteInput { acceptance: 10.0 },
            &bob,
        )
        .unwrap();

    // New suggestions are no longer accepted during voting.
    let late_suggestion = app
        .state
        .suggestions
        .create(
            created.id,
            SuggestionInput {
                title: "Beach house".into(),
            },
            &alice,
        )
        .unwrap_err();
    assert!(matches!(late_suggestion, ConclaveError::Validation(_)));

    // Cross the finish boundary.
    app.run_timers(10).await;

    let finished = app.state.consensus.get(created.id, Some(&alice)).unwrap();
    assert_eq!(finished.phase, Phase::Finished);
    assert!(finished.finished);
    assert_eq!(finished.voters, vec!["alice", "bob"]);

    let settled = app
        .state
        .suggestions
        .get(created.id, suggestion.id, Some(&alice))
        .unwrap();
    assert_eq!(settled.overall_acceptance, Some(7.5));
    assert_eq!(settled.heavy_objections_count, Some(1));
    // The caller's own vote stays visible; it is their own data.
    assert_eq!(settled.own_acceptance, Some(5.0));

    // Voting after finish is rejected.
    let late_vote = app
        .state
        .suggestions
        .vote(
            created.id,
            suggestion.id,
            VoteInput { acceptance: 1.0 },
            &bob,
        )
        .unwrap_err();
    assert!(matches!(late_vote, ConclaveError::Validation(_)));

    // Editing a finished consensus is rejected as invalid.
    let input = app.consensus_input("Team offsite v2", 10, 20);
    let late_edit = app.state.consensus.update(created.id, input, &alice).unwrap_err();
    assert!(matches!(late_edit, ConclaveError::Validation(_)));

    // Finished notification went to both followers (bob followed by voting).
    let sent = app.push.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].event, PushEvent::Finished);
    assert_eq!(sent[1].tokens.len(), 2);
    assert!(sent[1].tokens.contains(&"token-alice".to_string()));
    assert!(sent[1].tokens.contains(&"token-bob".to_string()));

    // Registry is clean.
    assert_eq!(app.state.scheduler.pending_timers(), 0);
}

// =============================================================================
// Zero-suggestion short-circuit
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_zero_suggestions_short_circuits_to_finished() {
    let app = test_app();
    let alice = app.user("alice");

    let input = app.consensus_input("Silent topic", 10, 3600);
    let created = app.state.consensus.create(input, &alice).unwrap();
    assert_eq!(app.state.scheduler.pending_timers(), 2);

    app.run_timers(11).await;

    let finished = app.state.consensus.get(created.id, Some(&alice)).unwrap();
    assert!(finished.finished);
    assert_eq!(finished.phase, Phase::Finished);
    // Finished at the voting-start boundary, not the original end deadline.
    assert_eq!(finished.end_date, start_instant() + Duration::seconds(11));

    // No voting-started notification was ever exposed, and no finished
    // notification either: there were no suggestions.
    assert!(app.push.sent().is_empty());

    // Both timer slots are gone.
    assert_eq!(app.state.scheduler.pending_timers(), 0);
}

// =============================================================================
// Deadline edits and the single-timer invariant
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_edit_moves_deadline_to_exactly_one_timer() {
    let app = test_app();
    let alice = app.user("alice");

    let input = app.consensus_input("Slow burner", 5, 3600);
    let created = app.state.consensus.create(input, &alice).unwrap();
    app.state
        .suggestions
        .create(
            created.id,
            SuggestionInput {
                title: "Only option".into(),
            },
            &alice,
        )
        .unwrap();

    // Pull the end deadline in; repeat a few times like a nervous editor.
    for end_secs in [1800, 600, 20] {
        let update = app.consensus_input("Slow burner", 5, end_secs);
        app.state.consensus.update(created.id, update, &alice).unwrap();
        assert!(app.state.scheduler.has_timer(created.id, TimerKind::Finish));
        assert_eq!(app.state.scheduler.pending_timers(), 2);
    }

    // The surviving timer reflects the newest deadline (20s): nothing
    // fires at the old deadlines, the consensus is finished right after
    // the new one.
    app.run_timers(6).await; // voting start at 5s
    assert!(!app
        .state
        .consensus
        .get(created.id, None)
        .unwrap()
        .finished);

    app.run_timers(15).await; // past 20s
    assert!(app.state.consensus.get(created.id, None).unwrap().finished);
    assert_eq!(app.state.scheduler.pending_timers(), 0);
}

// =============================================================================
// Deletion races
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_delete_cancels_pending_timers() {
    let app = test_app();
    let alice = app.user("alice");

    let input = app.consensus_input("Doomed", 10, 20);
    let created = app.state.consensus.create(input, &alice).unwrap();
    assert_eq!(app.state.scheduler.pending_timers(), 2);

    app.state.consensus.delete(created.id, &alice).unwrap();
    assert_eq!(app.state.scheduler.pending_timers(), 0);

    // Nothing fires at the old deadlines.
    app.run_timers(30).await;
    assert!(app.push.sent().is_empty());
    assert!(matches!(
        app.state.consensus.get(created.id, None),
        Err(ConclaveError::NotFound)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_finish_transition_is_idempotent_via_engine() {
    let app = test_app();
    let alice = app.user("alice");

    let input = app.consensus_input("Once only", 10, 20);
    let created = app.state.consensus.create(input, &alice).unwrap();
    app.state
        .suggestions
        .create(
            created.id,
            SuggestionInput {
                title: "The option".into(),
            },
            &alice,
        )
        .unwrap();

    app.run_timers(25).await;
    assert!(app.state.consensus.get(created.id, None).unwrap().finished);

    // A straggler invocation (e.g. a timer that lost a cancellation race)
    // must not double-notify or re-mutate.
    assert!(!app.state.engine.on_finish_reached(created.id));
    app.run_timers(1).await;

    let finished_events = app
        .push
        .sent()
        .iter()
        .filter(|p| p.event == PushEvent::Finished)
        .count();
    assert_eq!(finished_events, 1);
}

// =============================================================================
// Restart recovery
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_recover_all_rebuilds_and_fires_timers() {
    let app = test_app();
    let alice = app.user("alice");

    // Simulate state loaded from storage after a restart: consensuses
    // exist, but no timers do (they are never persisted).
    let now = app.clock.now();
    let (overdue, upcoming) = app.state.store.write(|state| {
        let overdue = state.insert_consensus(
            conclave::model::ConsensusDraft {
                title: "Missed while down".into(),
                description: String::new(),
                is_public: true,
                end_date: now - Duration::seconds(30),
                voting_start_date: now - Duration::seconds(60),
                secret_hash: String::new(),
            },
            alice.id,
            now - Duration::seconds(120),
        );
        let upcoming = state.insert_consensus(
            conclave::model::ConsensusDraft {
                title: "Still ahead".into(),
                description: String::new(),
                is_public: true,
                end_date: now + Duration::seconds(60),
                voting_start_date: now + Duration::seconds(30),
                secret_hash: String::new(),
            },
            alice.id,
            now,
        );
        (overdue, upcoming)
    });

    assert_eq!(app.state.scheduler.pending_timers(), 0);
    app.state.recover();

    // Overdue finish fires immediately; the upcoming consensus got both
    // timers (its voting start is still ahead).
    app.run_timers(1).await;
    assert!(app.state.consensus.get(overdue.id, None).unwrap().finished);
    assert!(!app.state.consensus.get(upcoming.id, None).unwrap().finished);
    assert_eq!(app.state.scheduler.pending_timers(), 2);

    // And the upcoming one completes on its own schedule.
    app.run_timers(65).await;
    assert!(app.state.consensus.get(upcoming.id, None).unwrap().finished);
    assert_eq!(app.state.scheduler.pending_timers(), 0);
}
