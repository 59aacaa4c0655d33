// ============================================================================
// PairPad CLI — headless sync agent and state inspector
// ============================================================================
//
// Usage examples:
//   pairpad status
//   pairpad pull
//   pairpad watch --rounds 10
//   pairpad push-text --user niklas --text "bis später!"
//   pairpad export --user jovelyn --out jovelyn.png
//   pairpad --daily quiz
//
// No UI is involved; everything runs synchronously on the current thread
// against the same store file and remote endpoint the frontend uses.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::config::PadConfig;
use crate::io;
use crate::keys::{self, PageScope};
use crate::quiz::DailyQuiz;
use crate::remote::HttpRemote;
use crate::store::LocalStore;
use crate::sync::CloudSync;

/// PairPad headless sync agent.
#[derive(Parser, Debug)]
#[command(
    name = "pairpad",
    about = "PairPad headless sync agent and state inspector",
    long_about = "Inspect the local pad state, reconcile it with the remote\n\
                  key/value store, push note text, and export drawings —\n\
                  without opening the UI."
)]
pub struct CliArgs {
    /// Alternative config file (default: OS config dir).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Alternative local store file (default: OS data dir).
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Operate on the daily page's state instead of the start page.
    #[arg(long)]
    pub daily: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every stored key plus sync configuration.
    Status,
    /// Run one reconciling pull from the remote store.
    Pull,
    /// Poll loop: pull on the configured interval until interrupted.
    Watch {
        /// Stop after this many pulls (default: run forever).
        #[arg(long, value_name = "N")]
        rounds: Option<u64>,
    },
    /// Write and push a user's note text.
    PushText {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        text: String,
    },
    /// Export a user's current drawing to a PNG file.
    Export {
        #[arg(short, long)]
        user: String,
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Print today's quiz question and both users' answers.
    Quiz,
}

/// Run the requested command and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let config = match &args.config {
        Some(path) => PadConfig::load_from(path),
        None => PadConfig::load(),
    };
    let mut store = match &args.store {
        Some(path) => LocalStore::open(path.clone()),
        None => LocalStore::open_default(),
    };
    let scope = if args.daily { PageScope::Daily } else { PageScope::Main };
    let remote = HttpRemote::from_config(&config);
    let mut sync = CloudSync::new(Box::new(remote), config.pending_fresh_window());

    match args.command {
        Command::Status => {
            println!("server:  {}", config.server_base);
            println!("poll:    {} ms", config.poll_ms);
            println!("users:   {} / {}", config.users[0], config.users[1]);
            println!("keys:    {}", store.len());
            for key in store.keys() {
                let value = store.read(key).unwrap_or_default();
                println!("  {:<40} {}", key, preview(&value));
            }
            ExitCode::SUCCESS
        }
        Command::Pull => {
            sync.pull(&mut store);
            if sync.is_reachable() {
                println!("pull ok — {} keys in store", store.len());
                ExitCode::SUCCESS
            } else {
                eprintln!("error: remote store unreachable at {}", config.server_base);
                ExitCode::FAILURE
            }
        }
        Command::Watch { rounds } => {
            let interval = config.poll_interval();
            let mut round: u64 = 0;
            loop {
                store.reload();
                sync.pull(&mut store);
                round += 1;
                println!(
                    "[{}] {} — {} keys",
                    round,
                    if sync.is_reachable() { "ok" } else { "unreachable" },
                    store.len()
                );
                if rounds.is_some_and(|max| round >= max) {
                    break;
                }
                std::thread::sleep(interval);
            }
            ExitCode::SUCCESS
        }
        Command::PushText { user, text } => {
            let key = keys::text_key(&user);
            sync.push(&mut store, &key, &text);
            if sync.is_reachable() {
                println!("pushed {} ({} chars)", key, text.chars().count());
                ExitCode::SUCCESS
            } else {
                // The local write went through; only the transmit failed
                eprintln!("warning: stored locally, but the remote was unreachable");
                ExitCode::FAILURE
            }
        }
        Command::Export { user, out } => {
            let key = keys::drawing_key(&user, scope);
            let Some(payload) = store.read(&key) else {
                eprintln!("error: no drawing stored under {}", key);
                return ExitCode::FAILURE;
            };
            match io::decode_payload(&payload).and_then(|s| io::export_png(&s, &out)) {
                Ok(()) => {
                    println!("wrote {}", out.display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: export failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Quiz => {
            let quiz = DailyQuiz::new(config.quiz_questions.clone());
            match quiz.todays_question() {
                Some(question) => println!("Frage des Tages: {}", question),
                None => println!("(no quiz questions configured)"),
            }
            for user in &config.users {
                let answer = DailyQuiz::load_answer(&store, user);
                let answer = if answer.is_empty() { "—".to_string() } else { answer };
                println!("  {:<10} {}", user, answer);
            }
            ExitCode::SUCCESS
        }
    }
}

/// Shorten long values (raster payloads) for terminal display.
fn preview(value: &str) -> String {
    const MAX: usize = 48;
    if value.chars().count() <= MAX {
        value.to_string()
    } else {
        let head: String = value.chars().take(MAX).collect();
        format!("{}… ({} chars)", head, value.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_subcommands() {
        let args = CliArgs::parse_from(["pairpad", "status"]);
        assert!(matches!(args.command, Command::Status));
        assert!(!args.daily);

        let args = CliArgs::parse_from([
            "pairpad",
            "--daily",
            "export",
            "--user",
            "niklas",
            "--out",
            "bild.png",
        ]);
        assert!(args.daily);
        match args.command {
            Command::Export { user, out } => {
                assert_eq!(user, "niklas");
                assert_eq!(out, PathBuf::from("bild.png"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert!(shown.ends_with("(100 chars)"));
        assert!(shown.chars().count() < 70);
    }
}
