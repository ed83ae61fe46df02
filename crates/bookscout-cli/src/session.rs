//! Interactive session: one long-lived client with the heartbeat running
//! in the background, driven by commands read from stdin.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use bookscout_core::{AppError, BookSource, CrawlJob, LivenessState};

use crate::host::{Client, is_yes};
use crate::render;

const HELP: &str = "\
commands:
  crawl <keyword> [limit]   crawl and show stored results (limit 0 = everything)
  list [keyword]            show stored books
  source [dangdang|fanqie]  show or switch the site for crawl and list
  next | prev | page <n>    move through the results
  clear                     clear the current search
  stats                     store totals
  status                    backend liveness
  help                      this text
  quit                      leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Crawl { keyword: String, limit: i64 },
    List(Option<String>),
    Source(Option<BookSource>),
    Next,
    Prev,
    Page(usize),
    Clear,
    Stats,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. A trailing integer on `crawl` is the limit;
    /// everything before it is the keyword, spaces included.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match head.to_lowercase().as_str() {
            "crawl" | "search" => {
                let (keyword, limit) = match rest.rsplit_once(char::is_whitespace) {
                    Some((keyword, last)) => match last.parse::<i64>() {
                        Ok(limit) => (keyword.trim(), limit),
                        Err(_) => (rest, 20),
                    },
                    None => (rest, 20),
                };
                Command::Crawl {
                    keyword: keyword.to_string(),
                    limit,
                }
            }
            "list" => Command::List(Some(rest.to_string()).filter(|k| !k.is_empty())),
            "source" | "site" if rest.is_empty() => Command::Source(None),
            "source" | "site" => {
                Command::Source(Some(rest.parse().map_err(|e: AppError| e.to_string())?))
            }
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Prev,
            "page" => Command::Page(
                rest.parse()
                    .map_err(|_| format!("not a page number: '{rest}'"))?,
            ),
            "clear" => Command::Clear,
            "stats" => Command::Stats,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

pub async fn run(client: Client) -> Result<()> {
    let Client {
        ctx,
        monitor,
        orchestrator,
        cancel,
        ..
    } = client;

    match monitor.start().await {
        LivenessState::Online => {
            let monitor = Arc::clone(&monitor);
            let token = cancel.child_token();
            tokio::spawn(async move { monitor.run(token).await });
        }
        LivenessState::Offline => {
            print!("{}", render::view(&ctx.snapshot()));
            cancel.cancelled().await;
            println!("Returning home.");
            return Ok(());
        }
    }

    println!("Connected to {}. Type 'help' for commands.", ctx.endpoint());
    let mut source = BookSource::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => {
                print!("{}", render::view(&ctx.snapshot()));
                println!("Returning home.");
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        match command {
            Command::Crawl { keyword, limit } => {
                if limit == 0 {
                    println!(
                        "A limit of 0 crawls every matching book and may take a long time. Continue? [y/N]"
                    );
                    let answer = lines.next_line().await?.unwrap_or_default();
                    orchestrator.gate().preapprove(is_yes(&answer));
                }
                println!("Crawling '{}'...", keyword.trim());
                let job = CrawlJob::new(keyword, limit).with_source(source);
                report(orchestrator.submit(job).await);
            }
            Command::List(keyword) => {
                report(orchestrator.list(source, keyword.as_deref()).await);
            }
            Command::Source(choice) => {
                if let Some(choice) = choice {
                    source = choice;
                }
                println!("source: {source}");
                continue;
            }
            Command::Next => {
                ctx.view().next_page();
            }
            Command::Prev => {
                ctx.view().prev_page();
            }
            Command::Page(n) => {
                if !ctx.view().go_to_page(n) {
                    println!("no page {n}");
                }
            }
            Command::Clear => ctx.view().clear(),
            Command::Stats => {
                match orchestrator.stats().await {
                    Ok(stats) => print!("{}", render::stats(&stats)),
                    Err(e) => println!("{}", e.user_message()),
                }
                continue;
            }
            Command::Status => {
                let stats = monitor.stats();
                println!(
                    "{} at {} ({} heartbeat, {} probes, {} outages)",
                    stats.state,
                    ctx.endpoint(),
                    stats.mode,
                    stats.probes,
                    stats.outages
                );
                continue;
            }
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
        }

        print!("{}", render::view(&ctx.snapshot()));
    }

    cancel.cancel();
    Ok(())
}

/// Errors already sit in the view as a notice; only log the cause.
fn report<T>(outcome: Result<T, AppError>) {
    if let Err(e) = outcome {
        tracing::debug!(error = %e, "Command failed");
    }
}
