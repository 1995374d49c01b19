use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing_subscriber::EnvFilter;

use ragchat_application::ChatContext;
use ragchat_core::config::Endpoints;
use ragchat_core::filters::FilterKey;
use ragchat_core::message::MessageRole;

const COMMANDS: &[&str] = &[
    "/login",
    "/signup",
    "/sessions",
    "/open",
    "/delete",
    "/new",
    "/filter",
    "/history",
    "/logout",
    "/help",
    "/quit",
];

/// rustyline helper: completes and highlights the slash commands above
/// and hints the remainder of a command once it is unambiguous.
struct ReplHelper;

impl ReplHelper {
    fn matching(&self, prefix: &str) -> Vec<&'static str> {
        COMMANDS
            .iter()
            .copied()
            .filter(|cmd| cmd.starts_with(prefix))
            .collect()
    }

    fn is_command_prefix(typed: &str) -> bool {
        typed.starts_with('/') && !typed.contains(' ')
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        if !Self::is_command_prefix(typed) {
            return Ok((0, Vec::new()));
        }

        let candidates = self
            .matching(typed)
            .into_iter()
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match line.split_whitespace().next() {
            Some(word) if COMMANDS.iter().any(|cmd| *cmd == word) => {
                Owned(line.bright_cyan().to_string())
            }
            _ => Borrowed(line),
        }
    }

    fn highlight_char(&self, line: &str, _pos: usize, _forced: bool) -> bool {
        line.starts_with('/')
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let typed = &line[..pos];
        if !Self::is_command_prefix(typed) || typed.len() < 2 {
            return None;
        }

        // Hint only when a single command remains, so /s (sessions vs
        // signup) stays quiet.
        match self.matching(typed).as_slice() {
            [only] if only.len() > typed.len() => Some(only[typed.len()..].to_string()),
            _ => None,
        }
    }
}

impl Validator for ReplHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let endpoints = Endpoints::load().context("service endpoints are not configured")?;
    let ctx = Arc::new(ChatContext::from_endpoints(&endpoints));

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ReplHelper));

    println!("{}", "=== RAG Chat ===".bright_magenta().bold());
    println!(
        "{}",
        "Log in with '/login <user> <password>', then type a question. '/help' lists commands."
            .bright_black()
    );
    println!();

    loop {
        let prompt = format!("{} >> ", ctx.current_title().await);
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "/quit" || trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if trimmed.starts_with('/') {
                    handle_command(&ctx, trimmed).await;
                } else {
                    send_prompt(&ctx, trimmed).await;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

async fn handle_command(ctx: &ChatContext, line: &str) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match command {
        "/login" => match args.as_slice() {
            [user_id, password] => match ctx.login(user_id, password).await {
                Ok(session) => {
                    println!(
                        "{}",
                        format!("Logged in as {}", session.subject_id).bright_green()
                    );
                    show_sessions(ctx).await;
                }
                Err(err) => print_error(&err),
            },
            _ => println!("{}", "Usage: /login <user> <password>".bright_black()),
        },
        "/signup" => match args.as_slice() {
            [user_id, password] => match ctx.signup(user_id, password).await {
                Ok(Some(session)) => println!(
                    "{}",
                    format!("Account created, logged in as {}", session.subject_id).bright_green()
                ),
                Ok(None) => println!(
                    "{}",
                    "Account created. Log in with /login to continue.".bright_green()
                ),
                Err(err) => print_error(&err),
            },
            _ => println!("{}", "Usage: /signup <user> <password>".bright_black()),
        },
        "/sessions" => match ctx.refresh_sessions().await {
            Ok(_) => show_sessions(ctx).await,
            Err(err) => print_error(&err),
        },
        "/open" => match args.as_slice() {
            [session_id] => match ctx.open_session(session_id).await {
                Ok(()) => {
                    println!(
                        "{}",
                        format!("Opened '{}'", ctx.current_title().await).bright_green()
                    );
                    show_history(ctx).await;
                }
                Err(err) => print_error(&err),
            },
            _ => println!("{}", "Usage: /open <session-id>".bright_black()),
        },
        "/delete" => match args.as_slice() {
            [session_id] => match ctx.delete_session(session_id).await {
                Ok(true) => println!("{}", "Session deleted.".bright_green()),
                Ok(false) => println!("{}", "Session could not be deleted.".yellow()),
                Err(err) => print_error(&err),
            },
            _ => println!("{}", "Usage: /delete <session-id>".bright_black()),
        },
        "/new" => {
            ctx.new_chat().await;
            println!("{}", "Started a new chat.".bright_green());
        }
        "/filter" => handle_filter(ctx, &args).await,
        "/history" => show_history(ctx).await,
        "/logout" => {
            ctx.logout().await;
            println!("{}", "Logged out.".bright_green());
        }
        "/help" => {
            for cmd in COMMANDS {
                println!("  {}", cmd.bright_cyan());
            }
        }
        _ => println!("{}", "Unknown command".bright_black()),
    }
}

async fn handle_filter(ctx: &ChatContext, args: &[&str]) {
    match args {
        [] => {
            let filters = ctx.filters().await;
            if filters.is_empty() {
                println!("{}", "No filters set.".bright_black());
            } else {
                for (key, value) in filters.iter() {
                    println!("  {} = {}", key.as_str().bright_cyan(), value);
                }
            }
        }
        ["clear"] => {
            ctx.clear_filters().await;
            println!("{}", "Filters cleared.".bright_green());
        }
        [key, "-"] => match FilterKey::parse(key) {
            Some(key) => {
                ctx.remove_filter(key).await;
                println!("{}", format!("Removed filter '{}'", key.as_str()).bright_green());
            }
            None => print_filter_keys(),
        },
        [key, value @ ..] if !value.is_empty() => match FilterKey::parse(key) {
            Some(key) => {
                if ctx.set_filter(key, &value.join(" ")).await {
                    println!("{}", format!("Filter '{}' set.", key.as_str()).bright_green());
                } else {
                    println!("{}", "Filter value was empty after cleanup.".yellow());
                }
            }
            None => print_filter_keys(),
        },
        _ => println!(
            "{}",
            "Usage: /filter [<key> <value> | <key> - | clear]".bright_black()
        ),
    }
}

fn print_filter_keys() {
    let names: Vec<&str> = FilterKey::ALL.iter().map(|k| k.as_str()).collect();
    println!(
        "{}",
        format!("Unknown filter key. Known keys: {}", names.join(", ")).yellow()
    );
}

async fn send_prompt(ctx: &ChatContext, prompt: &str) {
    if !ctx.is_authenticated().await {
        println!("{}", "Log in first with /login <user> <password>.".yellow());
        return;
    }

    println!("{}", format!("> {}", prompt).green());

    match ctx.send(prompt).await {
        Ok(outcome) => {
            for line in outcome.reply.lines() {
                println!("{}", line.bright_blue());
            }
            if let Some(new_session) = &outcome.new_session {
                println!(
                    "{}",
                    format!("New session: {}", new_session.title).bright_magenta()
                );
            }
            print_citations(ctx, &outcome).await;
        }
        Err(err) => print_error(&err),
    }
}

async fn print_citations(ctx: &ChatContext, outcome: &ragchat_application::QueryOutcome) {
    for (i, citation) in outcome.citations.iter().enumerate() {
        let document = outcome.source_documents.get(i);
        match document {
            Some(doc) => {
                let link = ctx.resolve_file_url(&doc.source_uri, &doc.document_name).await;
                match link {
                    Some(url) => println!(
                        "  {} {} ({})",
                        format!("[{}]", i + 1).bright_magenta(),
                        citation,
                        url.bright_black()
                    ),
                    None => println!(
                        "  {} {} ({})",
                        format!("[{}]", i + 1).bright_magenta(),
                        citation,
                        doc.document_name.bright_black()
                    ),
                }
            }
            None => println!("  {} {}", format!("[{}]", i + 1).bright_magenta(), citation),
        }
    }
}

async fn show_sessions(ctx: &ChatContext) {
    let sessions = ctx.session_directory().await;
    if sessions.is_empty() {
        println!("{}", "No stored sessions.".bright_black());
        return;
    }
    for summary in sessions {
        println!(
            "  {} {}",
            summary.session_id.bright_cyan(),
            summary.display_title()
        );
    }
}

async fn show_history(ctx: &ChatContext) {
    for message in ctx.messages().await {
        match message.role {
            MessageRole::User => println!("{}", format!("> {}", message.content).green()),
            MessageRole::Assistant => {
                for line in message.content.lines() {
                    println!("{}", line.bright_blue());
                }
            }
        }
    }
}

fn print_error(err: &ragchat_core::error::ServiceError) {
    eprintln!("{}", err.user_message().red());
}
