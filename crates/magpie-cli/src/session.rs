use anyhow::{bail, Context, Result};
use bat::PrettyPrinter;
use cliclack::{confirm, input, spinner};
use console::style;

use magpie::client::AgentClient;
use magpie::config::RuntimeConfig;
use magpie::models::state::AppState;
use magpie::report;
use magpie::send::{send_message, SendProgress};
use magpie::sync;

/// Interactive chat session against the remote research agent.
pub struct Session {
    client: AgentClient,
    state: AppState,
}

impl Session {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let client = AgentClient::new(config).context("could not build the runtime client")?;
        Ok(Session {
            client,
            state: AppState::new(),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        self.startup().await?;

        println!(
            "Research agent session {}",
            style("- type \"exit\" to end, \"/help\" for commands").dim()
        );
        println!();

        loop {
            let line: String = input("Message:").placeholder("").multiline().interact()?;
            let line = line.trim().to_string();

            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("exit") {
                break;
            }

            if let Some(command) = line.strip_prefix('/') {
                self.handle_command(command).await?;
                continue;
            }

            self.send(&line).await?;
        }

        Ok(())
    }

    /// Health-gate startup: hydrate server history when the runtime is up,
    /// degrade to an empty thread list when it is not, then open a fresh
    /// working thread.
    async fn startup(&mut self) -> Result<()> {
        let spin = spinner();
        spin.start("checking the agent runtime");

        if self.client.health_check().await {
            sync::hydrate_threads(&self.client, &mut self.state).await;
            spin.stop(format!(
                "connected, {} existing thread(s)",
                self.state.registry.len()
            ));
        } else {
            spin.stop("runtime unreachable, continuing with an empty thread list");
        }

        match sync::start_new_thread(&self.client, &mut self.state).await {
            Ok(thread_id) => {
                let _ = cliclack::log::info(format!("new thread {thread_id}"));
                Ok(())
            }
            Err(err) => bail!("could not create a thread: {err}"),
        }
    }

    async fn handle_command(&mut self, command: &str) -> Result<()> {
        match command.split_once(' ') {
            Some(("deep", rest)) if !rest.trim().is_empty() => {
                let enriched = format!("[Deep Research] {}", rest.trim());
                self.send(&enriched).await?;
            }
            Some(("switch", rest)) if !rest.trim().is_empty() => {
                self.state.pending_switch = Some(rest.trim().to_string());
                if let Err(err) =
                    sync::process_pending_switch(&self.client, &mut self.state).await
                {
                    let _ = cliclack::log::warning(format!("switch failed: {err}"));
                }
            }
            _ => match command {
                "new" => {
                    match sync::start_new_thread(&self.client, &mut self.state).await {
                        Ok(thread_id) => {
                            let _ = cliclack::log::info(format!("new thread {thread_id}"));
                        }
                        Err(err) => {
                            let _ = cliclack::log::warning(format!("new thread failed: {err}"));
                        }
                    }
                }
                "threads" => self.show_threads(),
                "activity" => self.show_activity(),
                "report" => self.show_report(),
                "help" => show_help(),
                other => {
                    let _ = cliclack::log::warning(format!("unknown command: /{other}"));
                }
            },
        }
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        let Some(thread_id) = self.state.current_thread.clone() else {
            let _ = cliclack::log::warning("no active thread; use /new first");
            return Ok(());
        };

        let mut is_retry = false;
        loop {
            let outcome = tokio::select! {
                outcome = send_message(
                    &self.client,
                    &mut self.state,
                    &thread_id,
                    text,
                    is_retry,
                    render_progress,
                ) => outcome,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!("{}", style("interrupted; the run continues server-side").dim());
                    return Ok(());
                }
            };

            println!();
            render_markdown(&outcome.text);
            self.show_sources(&outcome.text);

            if outcome.retry_offered {
                if let Some(err) = &outcome.error {
                    let _ = cliclack::log::warning(format!("request failed: {err}"));
                }
                if confirm("Retry the same message once?").interact()? {
                    is_retry = true;
                    continue;
                }
            }
            return Ok(());
        }
    }

    fn show_sources(&self, text: &str) {
        let urls = report::extract_urls(text);
        if urls.is_empty() {
            return;
        }
        println!();
        println!("{}", style("Sources").bold());
        for source in report::build_sources(&urls) {
            println!(
                "  {}  {}",
                style(&source.title).cyan(),
                style(&source.url).dim()
            );
        }
    }

    fn show_threads(&self) {
        if self.state.registry.is_empty() {
            println!("{}", style("no known threads").dim());
            return;
        }

        let mut threads: Vec<_> = self.state.registry.iter().collect();
        threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        for thread in threads {
            let marker = if self.state.current_thread.as_deref() == Some(thread.id.as_str()) {
                "*"
            } else {
                " "
            };
            println!(
                "{} {}  {}  {}",
                marker,
                style(&thread.id).cyan(),
                thread.title,
                style(format!("({} messages)", thread.message_count)).dim()
            );
        }
    }

    fn show_activity(&self) {
        let Some(thread_id) = self.state.current_thread.as_deref() else {
            println!("{}", style("no active thread").dim());
            return;
        };

        for event in self.state.activity_for(thread_id) {
            println!(
                "{} {:?}: {}",
                style(event.timestamp.format("%H:%M:%S")).dim(),
                event.kind,
                truncate(&event.content, 100)
            );
        }
    }

    fn show_report(&self) {
        let Some(thread_id) = self.state.current_thread.as_deref() else {
            println!("{}", style("no active thread").dim());
            return;
        };
        let Some(thread) = self.state.registry.get(thread_id) else {
            println!("{}", style("no report yet").dim());
            return;
        };

        let sections = report::build_sections(&thread.messages, Some(thread_id));
        if sections.is_empty() {
            println!("{}", style("no report yet").dim());
            return;
        }

        let duration = report::duration_seconds(self.state.activity_for(thread_id));
        println!(
            "{}  {}",
            style(&thread.title).bold(),
            style(format!("~{duration}s")).dim()
        );
        for section in sections {
            println!();
            println!("{}", style(&section.title).bold().underlined());
            if !section.metrics.is_empty() {
                println!("{}", style(section.metrics.join(" · ")).dim());
            }
            render_markdown(&section.content);
        }
    }
}

fn render_progress(progress: SendProgress) {
    if let SendProgress::Log(line) = progress {
        println!("{}", style(line).dim());
    }
}

fn render_markdown(content: &str) {
    let rendered = PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print();
    if rendered.is_err() {
        println!("{content}");
    }
}

fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() > budget {
        let head: String = text.chars().take(budget).collect();
        format!("{head}…")
    } else {
        text.to_string()
    }
}

fn show_help() {
    println!("  /deep <message>   run a deep-research pass on the message");
    println!("  /new              start a fresh thread");
    println!("  /threads          list known threads");
    println!("  /switch <id>      load a thread from the server and make it current");
    println!("  /activity         show the current thread's timeline");
    println!("  /report           show the derived report for the current thread");
    println!("  exit              leave the session");
}
