//! Headless mode.
//!
//! A simple line-oriented protocol:
//! - Lines starting with `#` are commands (new, declare, forfeit, status, ...)
//! - Any other line is a question for the witch
//! - Chat lines are printed as `[TAG] text` as soon as they are committed

use crate::Args;
use rondo_core::{ActionError, ClaudeOracle, Game, GameSession, Stage, TutorialAction};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn print_help() {
    println!("Commands:");
    println!("  #new [theme]      - Start a new game (random theme when omitted)");
    println!("  #tutorial         - Play the tutorial");
    println!("  #declare <text>   - Declare a blue truth");
    println!("  #forfeit          - Give up and hear the witch's truth");
    println!("  #status           - Show the current game status");
    println!("  #facts            - List red truths declared so far");
    println!("  #magic            - List the magic you must explain");
    println!("  #truth            - Reveal the hidden truth (after the game ends)");
    println!("  #help             - Show this help");
    println!("  #quit             - Exit");
    println!("  <text>            - Ask the witch a question");
    println!();
    println!("In the tutorial, use #ask, #declare or #end when prompted.");
}

/// Print every committed chat line exactly once.
fn spawn_printer(mut rx: watch::Receiver<Arc<GameSession>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current = None;
        let mut printed = 0;
        loop {
            {
                let session = rx.borrow_and_update();
                if current != Some(session.id()) {
                    current = Some(session.id());
                    printed = 0;
                }
                for line in session.history().iter().skip(printed) {
                    println!("{line}");
                }
                printed = printed.max(session.history().len());
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

fn spawn_activity(mut rx: watch::Receiver<Option<String>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            if let Some(text) = rx.borrow_and_update().as_deref() {
                eprintln!("[THINKING] {text}");
            }
        }
    })
}

fn print_status(session: &GameSession) {
    println!("[STATUS] stage: {}", session.stage());
    if !session.title().is_empty() {
        println!("[STATUS] title: {}", session.title());
    }
    println!(
        "[STATUS] red truths declared: {}, unspent: {}",
        session.used_facts().len(),
        session.available_facts().len()
    );
}

fn print_list(tag: &str, items: &[String]) {
    if items.is_empty() {
        println!("[{tag}] (none)");
    }
    for (i, item) in items.iter().enumerate() {
        println!("[{tag}] {}. {item}", i + 1);
    }
}

fn report(result: Result<(), ActionError>) {
    if let Err(e) = result {
        println!("[ERROR] {e}");
    }
}

async fn continue_tutorial(game: &mut Game) {
    match game.run_tutorial().await {
        Ok(Some(TutorialAction::End)) => println!("[TUTORIAL] Type #end to finish."),
        Ok(Some(action)) => {
            let input = game.tutorial().map(|t| t.input().to_string()).unwrap_or_default();
            let command = match action {
                TutorialAction::Ask => "#ask",
                TutorialAction::Declare => "#declare",
                TutorialAction::End => "#end",
            };
            println!("[TUTORIAL] Input: {input}");
            println!("[TUTORIAL] Type {command} to continue.");
        }
        Ok(None) => {}
        Err(e) => println!("[ERROR] {e}"),
    }
}

async fn tutorial_command(game: &mut Game, command: &str) {
    let action = match command {
        "ask" => TutorialAction::Ask,
        "declare" => TutorialAction::Declare,
        "end" => TutorialAction::End,
        other => {
            println!("[ERROR] The tutorial only accepts #ask, #declare or #end, not #{other}");
            return;
        }
    };
    match game.tutorial_trigger(action).await {
        Ok(()) if action == TutorialAction::End => println!("[SYSTEM] Tutorial finished."),
        Ok(()) => continue_tutorial(game).await,
        Err(e) => println!("[ERROR] {e}"),
    }
}

/// Run the game in headless mode until `#quit` or end of input.
pub async fn run(oracle: ClaudeOracle, args: &Args) -> std::io::Result<()> {
    let mut game = Game::new(Arc::new(oracle));

    let printer = spawn_printer(game.subscribe());
    let activity = spawn_activity(game.activity().subscribe());
    let cues = game.cues().map(|mut rx| {
        tokio::spawn(async move {
            while let Some(cue) = rx.recv().await {
                println!("[CUE] {cue:?}");
            }
        })
    });

    println!("=== Rondo Headless Mode ===");
    print_help();
    println!();

    if args.tutorial {
        report(game.start_tutorial());
        continue_tutorial(&mut game).await;
    } else if let Some(theme) = &args.theme {
        report(game.new_game(theme).await);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('#') else {
            report(game.ask(line).await);
            continue;
        };
        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "help" => print_help(),
            "status" => print_status(&game.snapshot()),
            _ if game.snapshot().stage() == Stage::Tutorial => {
                tutorial_command(&mut game, name).await
            }
            "new" => report(game.new_game(rest).await),
            "tutorial" => {
                report(game.start_tutorial());
                if game.tutorial().is_some() {
                    continue_tutorial(&mut game).await;
                }
            }
            "declare" => report(game.declare_hypothesis(rest).await),
            "forfeit" => report(game.forfeit().await),
            "facts" => print_list("RED", game.snapshot().used_facts()),
            "magic" => print_list("MAGIC", game.snapshot().magic_list()),
            "truth" => {
                let session = game.snapshot();
                if session.is_finished() {
                    println!("[TRUTH] {}", session.hidden_truth());
                } else {
                    println!("[ERROR] The truth stays hidden until the game ends.");
                }
            }
            other => println!("[ERROR] Unknown command #{other}. Type #help for commands."),
        }
    }

    drop(game);
    let _ = printer.await;
    activity.abort();
    if let Some(cues) = cues {
        let _ = cues.await;
    }
    Ok(())
}
