//! Game flow tests driven by a scripted oracle.

use rondo_core::model::{ClosingScenario, MessageKind};
use rondo_core::session::{
    ASK_FAILED_LINE, DECLARE_FAILED_LINE, FORFEIT_TAUNT, LOAD_FAILED_LINE, UNKNOWN_VERDICT_LINE,
    VICTORY_LINE,
};
use rondo_core::testing::{
    assert_kind_count, assert_stage, assert_tail, instant_game, playing_game, reply,
    reply_with_fact, sample_mystery, verdict, OracleCall, Scripted, ScriptedOracle,
};
use rondo_core::{ActionError, Cue, Stage};
use std::sync::Arc;

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_new_game_seeds_banner() {
    let oracle = Arc::new(ScriptedOracle::new());
    oracle.queue_mystery(
        Scripted::terminal(sample_mystery())
            .with_note("Choosing a setting")
            .with_note("Hiding the trick"),
    );
    let mut game = instant_game(oracle.clone());

    game.new_game("a sealed manor").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Playing);
    assert_eq!(session.history()[0].text, "Game start: The Golden Manor");
    assert_tail(&session, &[MessageKind::System, MessageKind::Antagonist]);
    assert_eq!(session.history().len(), 2);
    assert_eq!(game.activity().current(), None);
    assert_eq!(
        oracle.calls(),
        vec![OracleCall::GenerateMystery("a sealed manor".into())]
    );
}

#[tokio::test]
async fn test_mystery_without_terminal_ends_with_placeholder() {
    let oracle = Arc::new(ScriptedOracle::new());
    oracle.queue_mystery(Scripted::silent().with_note("Pondering...").with_note("Still pondering"));
    let mut game = instant_game(oracle);

    game.new_game("").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Finished);
    assert_eq!(session.history().len(), 1);
    assert_kind_count(&session, MessageKind::Error, 1);
    assert_eq!(session.history()[0].text, LOAD_FAILED_LINE);
    assert!(session.hidden_truth().is_empty());
    assert!(session.magic_list().is_empty());
    assert!(session.available_facts().is_empty());
    assert!(session.used_facts().is_empty());
}

#[tokio::test]
async fn test_mystery_transport_failure_is_fatal_to_session() {
    let oracle = Arc::new(ScriptedOracle::new());
    oracle.queue_mystery(Scripted::refused("connection refused"));
    let mut game = instant_game(oracle);

    game.new_game("").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Finished);
    assert_tail(&session, &[MessageKind::Error]);
}

#[tokio::test]
async fn test_restart_after_finish_replaces_session() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    let first = game.snapshot();

    oracle.queue_closing(Scripted::failing("gone"));
    game.forfeit().await.unwrap();
    assert!(game.snapshot().is_finished());

    oracle.queue_mystery(Scripted::terminal(sample_mystery()));
    game.new_game("").await.unwrap();

    let second = game.snapshot();
    assert_stage(&second, Stage::Playing);
    assert_ne!(second.id(), first.id());
    assert_eq!(second.history().len(), 2);
}

#[tokio::test]
async fn test_new_game_refused_while_playing() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle).await;

    let err = game.new_game("").await.unwrap_err();
    assert_eq!(
        err,
        ActionError::NotAllowed {
            action: "new game",
            stage: Stage::Playing
        }
    );
}

// ============================================================================
// Ask
// ============================================================================

#[tokio::test]
async fn test_ask_without_fact_appends_one_antagonist_line() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_reply(Scripted::terminal(reply("How amusing.")));

    game.ask("Who locked the door?").await.unwrap();

    let session = game.snapshot();
    assert_eq!(session.history().len(), 4);
    assert_tail(&session, &[MessageKind::Human, MessageKind::Antagonist]);
    assert!(session.used_facts().is_empty());
    assert_stage(&session, Stage::Playing);
}

#[tokio::test]
async fn test_ask_with_fact_records_and_cues() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    let mut cues = game.cues().unwrap();
    oracle.queue_reply(Scripted::terminal(reply_with_fact(
        "Let me answer in red.",
        "No one entered the study after midnight",
    )));

    game.ask("Did someone sneak in?").await.unwrap();

    let session = game.snapshot();
    assert_tail(
        &session,
        &[
            MessageKind::Human,
            MessageKind::AbsoluteFact,
            MessageKind::Antagonist,
        ],
    );
    assert_eq!(session.used_facts(), &["No one entered the study after midnight"]);
    assert_eq!(session.available_facts(), vec!["The window was nailed shut".to_string()]);
    assert_eq!(cues.try_recv().unwrap(), Cue::AbsoluteFact);
}

#[tokio::test]
async fn test_ask_request_carries_prior_history() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_reply(Scripted::terminal(reply("Hmph.")));

    game.ask("  Was the maid awake?  ").await.unwrap();

    let requests = oracle.converse_requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.message, "Was the maid awake?");
    assert_eq!(request.history.len(), 2);
    assert_eq!(request.hidden_truth, sample_mystery().hidden_truth);
    assert_eq!(request.red_truth_pool, sample_mystery().red_truths);
    assert_eq!(request.magic_list, vec!["A".to_string(), "B".to_string()]);
    assert!(request.used_facts.is_empty());
}

#[tokio::test]
async fn test_ask_request_counts_duplicate_facts_once_per_use() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut mystery = sample_mystery();
    mystery.red_truths = vec!["The door was locked".to_string(); 2];
    oracle.queue_mystery(Scripted::terminal(mystery));
    let mut game = instant_game(oracle.clone());
    game.new_game("").await.unwrap();

    oracle
        .queue_reply(Scripted::terminal(reply_with_fact(
            "Hear it in red.",
            "The door was locked",
        )))
        .queue_reply(Scripted::terminal(reply("Still locked.")));
    game.ask("Was the door open?").await.unwrap();
    game.ask("Are you sure?").await.unwrap();

    let requests = oracle.converse_requests();
    assert_eq!(requests[0].available_facts.len(), 2);
    assert_eq!(requests[1].available_facts, vec!["The door was locked".to_string()]);
    assert_eq!(requests[1].available_facts, game.snapshot().available_facts());
}

#[tokio::test]
async fn test_ask_failure_is_recoverable() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_reply(Scripted::failing("connection reset").with_note("Thinking"));

    game.ask("Is the butler lying?").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Playing);
    assert_tail(&session, &[MessageKind::Human, MessageKind::Error]);
    assert_eq!(session.history().last().unwrap().text, ASK_FAILED_LINE);
    assert_eq!(game.activity().current(), None);

    oracle.queue_reply(Scripted::terminal(reply("Try again, then.")));
    game.ask("Is the butler lying?").await.unwrap();
    assert_tail(&game.snapshot(), &[MessageKind::Human, MessageKind::Antagonist]);
}

#[tokio::test]
async fn test_ask_empty_result_appends_error() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_reply(Scripted::silent());

    game.ask("Anything?").await.unwrap();

    assert_tail(&game.snapshot(), &[MessageKind::Human, MessageKind::Error]);
}

#[tokio::test]
async fn test_blank_and_out_of_stage_actions_are_refused() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut fresh = instant_game(oracle.clone());
    assert_eq!(
        fresh.ask("Hello?").await.unwrap_err(),
        ActionError::NotAllowed {
            action: "ask",
            stage: Stage::Start
        }
    );
    assert!(fresh.forfeit().await.is_err());
    assert!(fresh.declare_hypothesis("It was the cat").await.is_err());

    let mut game = playing_game(oracle.clone()).await;
    let before = game.snapshot();
    assert_eq!(game.ask("   ").await.unwrap_err(), ActionError::BlankInput);
    assert_eq!(
        game.declare_hypothesis("").await.unwrap_err(),
        ActionError::BlankInput
    );
    assert_eq!(game.snapshot(), before);
    assert!(oracle.converse_requests().is_empty());
}

// ============================================================================
// Declare
// ============================================================================

#[tokio::test]
async fn test_incomplete_then_accepted() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    let mut cues = game.cues().unwrap();

    oracle.queue_verdict(Scripted::terminal(verdict(
        "incomplete",
        None,
        Some("And what of B?"),
    )));
    game.declare_hypothesis("A was done with a thread.").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Playing);
    assert_tail(&session, &[MessageKind::Hypothesis, MessageKind::Antagonist]);
    assert_eq!(cues.try_recv().unwrap(), Cue::Declaration);

    oracle.queue_verdict(Scripted::terminal(verdict(
        "accepted",
        None,
        Some("I... resign."),
    )));
    game.declare_hypothesis("A was a thread and B was a mirror.")
        .await
        .unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Finished);
    assert_tail(
        &session,
        &[
            MessageKind::Hypothesis,
            MessageKind::Antagonist,
            MessageKind::System,
        ],
    );
    assert_eq!(session.history().last().unwrap().text, VICTORY_LINE);
    assert_eq!(cues.try_recv().unwrap(), Cue::Declaration);
    assert_eq!(cues.try_recv().unwrap(), Cue::Victory);

    let len = session.history().len();
    assert!(game.ask("One more thing...").await.is_err());
    assert!(game.declare_hypothesis("Another theory").await.is_err());
    assert_eq!(game.snapshot().history().len(), len);
}

#[tokio::test]
async fn test_refuted_records_fact() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_verdict(Scripted::terminal(verdict(
        "refuted",
        Some("The maid never left the kitchen"),
        None,
    )));

    game.declare_hypothesis("The maid did it.").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Playing);
    assert_tail(
        &session,
        &[
            MessageKind::Hypothesis,
            MessageKind::AbsoluteFact,
            MessageKind::Antagonist,
        ],
    );
    assert_eq!(session.used_facts(), &["The maid never left the kitchen"]);
    assert!(!session.history().last().unwrap().text.is_empty());

    let request = &oracle.judge_requests()[0];
    assert_eq!(request.hypothesis, "The maid did it.");
    assert_eq!(request.history.len(), 2);
}

#[tokio::test]
async fn test_mocked_appends_one_line() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_verdict(Scripted::terminal(verdict("mocked", None, Some("Worthless."))));

    game.declare_hypothesis("You are not a witch.").await.unwrap();

    let session = game.snapshot();
    assert_tail(&session, &[MessageKind::Hypothesis, MessageKind::Antagonist]);
    assert_eq!(session.history().last().unwrap().text, "Worthless.");
}

#[tokio::test]
async fn test_unknown_status_shows_error_only() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_verdict(Scripted::terminal(verdict(
        "triumphant",
        None,
        Some("partial text"),
    )));

    game.declare_hypothesis("A theory").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Playing);
    assert_tail(&session, &[MessageKind::Hypothesis, MessageKind::Error]);
    assert_eq!(session.history().last().unwrap().text, UNKNOWN_VERDICT_LINE);
    assert!(session.history().iter().all(|m| m.text != "partial text"));
    assert!(session.used_facts().is_empty());
}

#[tokio::test]
async fn test_refuted_without_fact_is_unrecognized() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_verdict(Scripted::terminal(verdict("refuted", None, Some("Ha!"))));

    game.declare_hypothesis("A theory").await.unwrap();

    assert_tail(&game.snapshot(), &[MessageKind::Hypothesis, MessageKind::Error]);
    assert!(game.snapshot().used_facts().is_empty());
}

#[tokio::test]
async fn test_declare_transport_failure() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_verdict(Scripted::refused("timeout"));

    game.declare_hypothesis("A theory").await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Playing);
    assert_eq!(session.history().last().unwrap().text, DECLARE_FAILED_LINE);
}

// ============================================================================
// Forfeit
// ============================================================================

#[tokio::test]
async fn test_forfeit_with_closing_scenario() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle.queue_closing(Scripted::terminal(ClosingScenario {
        taunt: "Kukuku.".into(),
        magical_truth: "A demon passed through the wall.".into(),
    }));

    game.forfeit().await.unwrap();

    let session = game.snapshot();
    assert_stage(&session, Stage::Finished);
    assert_eq!(session.history().len(), 5);
    assert_tail(
        &session,
        &[
            MessageKind::System,
            MessageKind::Antagonist,
            MessageKind::AntagonistTruth,
        ],
    );
    assert_eq!(session.history()[3].text, "Kukuku.");
    assert_eq!(session.history()[4].text, "A demon passed through the wall.");
}

#[tokio::test]
async fn test_forfeit_falls_back_on_failure() {
    for scripted in [
        Scripted::failing("reset"),
        Scripted::silent(),
        Scripted::refused("down"),
    ] {
        let oracle = Arc::new(ScriptedOracle::new());
        let mut game = playing_game(oracle.clone()).await;
        let mut cues = game.cues().unwrap();
        oracle.queue_closing(scripted);

        game.forfeit().await.unwrap();

        let session = game.snapshot();
        assert_stage(&session, Stage::Finished);
        assert_eq!(session.history().len(), 5);
        assert_tail(
            &session,
            &[
                MessageKind::System,
                MessageKind::Antagonist,
                MessageKind::AntagonistTruth,
            ],
        );
        assert_eq!(session.history()[3].text, FORFEIT_TAUNT);
        assert_eq!(session.history()[4].text, sample_mystery().hidden_truth);
        assert_eq!(cues.try_recv().unwrap(), Cue::AbsoluteFact);
        assert_eq!(game.activity().current(), None);
    }
}

// ============================================================================
// Ledger properties
// ============================================================================

#[tokio::test]
async fn test_ledger_only_grows_across_turns() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;

    oracle
        .queue_reply(Scripted::terminal(reply_with_fact(
            "Red!",
            "The window was nailed shut",
        )))
        .queue_reply(Scripted::failing("reset"))
        .queue_reply(Scripted::terminal(reply("No.")))
        .queue_reply(Scripted::terminal(reply_with_fact(
            "Again!",
            "The window was nailed shut",
        )));
    oracle
        .queue_verdict(Scripted::terminal(verdict(
            "refuted",
            Some("A fresh fact"),
            Some("Shattered!"),
        )))
        .queue_verdict(Scripted::terminal(verdict("mocked", None, None)));

    let mut observed: Vec<Vec<String>> = vec![game.snapshot().used_facts().to_vec()];
    for question in ["q1", "q2", "q3"] {
        game.ask(question).await.unwrap();
        observed.push(game.snapshot().used_facts().to_vec());
    }
    for hypothesis in ["h1", "h2"] {
        game.declare_hypothesis(hypothesis).await.unwrap();
        observed.push(game.snapshot().used_facts().to_vec());
    }
    game.ask("q4").await.unwrap();
    observed.push(game.snapshot().used_facts().to_vec());

    for pair in observed.windows(2) {
        assert!(pair[1].len() >= pair[0].len());
        assert_eq!(pair[1][..pair[0].len()], pair[0][..]);
    }

    let session = game.snapshot();
    assert_eq!(
        session.used_facts(),
        &[
            "The window was nailed shut",
            "A fresh fact",
            "The window was nailed shut"
        ]
    );
    assert_eq!(
        session.available_facts(),
        vec!["No one entered the study after midnight".to_string()]
    );
}

#[tokio::test]
async fn test_watchers_see_provisional_and_final_records() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    let mut rx = game.subscribe();
    rx.borrow_and_update();
    oracle.queue_reply(Scripted::terminal(reply("Indeed.")));

    game.ask("Is it magic?").await.unwrap();

    assert!(rx.has_changed().unwrap());
    let latest = rx.borrow_and_update().clone();
    assert_eq!(latest.history().len(), 4);
    assert_eq!(*latest, *game.snapshot());
}

#[tokio::test]
async fn test_cues_start_once_receiver_is_taken() {
    let oracle = Arc::new(ScriptedOracle::new());
    let mut game = playing_game(oracle.clone()).await;
    oracle
        .queue_reply(Scripted::terminal(reply_with_fact("Red!", "A fresh fact")))
        .queue_reply(Scripted::terminal(reply_with_fact("Again!", "Another fact")));

    game.ask("Before anyone listens?").await.unwrap();
    let mut cues = game.cues().unwrap();
    assert!(game.cues().is_none());
    assert!(cues.try_recv().is_err());

    game.ask("And now?").await.unwrap();
    assert_eq!(cues.try_recv().unwrap(), Cue::AbsoluteFact);
    assert!(cues.try_recv().is_err());
}
