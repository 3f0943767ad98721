use application::{AnalysisService, IgnoreReason, SessionView, TurnOutcome};
use clap::Parser;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};
use infrastructure::{AnalysisClient, Config};
use shared::confirmation::ask_confirmation;
use shared::types::Result;
use shared::utils::looks_like_url;

use crate::render;

#[derive(Parser, Debug)]
#[command(name = "newslens")]
#[command(about = "Chat with an article analysis service: summary, tone, sentiment and reliability")]
pub struct Cli {
    /// Base URL of the analysis service (overrides NEWSLENS_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Print the raw analytics JSON instead of the panel (one-shot mode)
    #[arg(long)]
    pub json: bool,

    /// Debug logging on stderr (RUST_LOG still wins)
    #[arg(short, long)]
    pub verbose: bool,

    /// Article URL or question to send once and exit; interactive chat if empty
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

/// Interactive commands recognised before anything is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Exit,
    Analytics,
    History,
    Copy,
    Reset,
    Dismiss,
    Help,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "exit" | "quit" | "/exit" | "/quit" => Some(Command::Exit),
            "/analytics" => Some(Command::Analytics),
            "/history" => Some(Command::History),
            "/copy" => Some(Command::Copy),
            "/reset" => Some(Command::Reset),
            "/dismiss" => Some(Command::Dismiss),
            "/help" => Some(Command::Help),
            _ => None,
        }
    }
}

const HELP: &str = "Paste an article URL to analyze it, or ask a follow-up question.\n\
Commands: /analytics  /history  /copy  /reset  /dismiss  /help  exit";

pub struct CliApp {
    service: AnalysisService<AnalysisClient>,
}

impl CliApp {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load();
        if let Some(url) = &cli.api_url {
            config = config.with_base_url(url.clone());
        }
        let client = AnalysisClient::new(&config)?;
        tracing::debug!(endpoint = client.endpoint(), "analysis client ready");
        Ok(Self {
            service: AnalysisService::new(client),
        })
    }

    pub async fn run(&mut self, cli: Cli) -> Result<()> {
        let args_str = cli.args.join(" ");
        if args_str.trim().is_empty() {
            self.handle_chat().await
        } else {
            self.handle_one_shot(&args_str, cli.json).await
        }
    }

    async fn handle_chat(&self) -> Result<()> {
        println!("{}", "Article analysis chat. Type /help for commands.".bold());
        self.greet().await;

        loop {
            let input: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("You")
                .allow_empty(true)
                .interact_text()?;

            match Command::parse(&input) {
                Some(Command::Exit) => break,
                Some(Command::Help) => println!("{}", HELP.dimmed()),
                Some(Command::Analytics) => self.print_analytics(&self.service.view()),
                Some(Command::History) => {
                    println!("{}", render::render_transcript(&self.service.view().transcript))
                }
                Some(Command::Copy) => self.copy_summary(),
                Some(Command::Dismiss) => self.service.dismiss_error(),
                Some(Command::Reset) => {
                    if ask_confirmation("Discard this conversation and start over?", false)? {
                        if self.service.reset() {
                            self.greet().await;
                        } else {
                            println!("{}", "A request is still running.".yellow());
                        }
                    }
                }
                None => self.send_turn(&input).await,
            }
        }
        Ok(())
    }

    async fn handle_one_shot(&self, input: &str, json: bool) -> Result<()> {
        if let TurnOutcome::Failed(message) = self.service.bootstrap().await {
            tracing::warn!(%message, "greeting failed; sending the turn anyway");
        }
        eprintln!("{}", progress_label(input));

        match self.service.submit(input).await {
            TurnOutcome::Reconciled(_) => {
                let view = self.service.view();
                println!("{}", render::render_transcript(view.latest_replies()));
                if json {
                    if let Some(snapshot) = &view.analytics {
                        println!("{}", serde_json::to_string_pretty(snapshot.raw())?);
                    }
                } else {
                    self.print_analytics(&view);
                }
                Ok(())
            }
            TurnOutcome::Failed(message) => Err(anyhow::anyhow!(message)),
            TurnOutcome::Ignored(_) => Err(anyhow::anyhow!("nothing to send")),
        }
    }

    async fn greet(&self) {
        match self.service.bootstrap().await {
            TurnOutcome::Reconciled(_) => {
                let view = self.service.view();
                if !view.transcript.is_empty() {
                    println!("{}", render::render_transcript(&view.transcript));
                }
            }
            TurnOutcome::Failed(message) => println!("{}", message.red()),
            TurnOutcome::Ignored(_) => {}
        }
    }

    async fn send_turn(&self, input: &str) {
        if input.trim().is_empty() {
            return;
        }
        eprintln!("{}", progress_label(input).dimmed());

        match self.service.submit(input).await {
            TurnOutcome::Reconciled(report) => {
                let view = self.service.view();
                println!("{}", render::render_transcript(view.latest_replies()));
                if report.analytics_replaced {
                    self.print_analytics(&view);
                }
            }
            TurnOutcome::Failed(message) => {
                println!("{} {}", message.red(), "(/dismiss to clear)".dimmed())
            }
            TurnOutcome::Ignored(IgnoreReason::Busy) => {
                println!("{}", "Still waiting for the previous reply.".yellow())
            }
            TurnOutcome::Ignored(IgnoreReason::Blank) => {}
        }
    }

    fn print_analytics(&self, view: &SessionView) {
        match render::render_analytics(view, render::terminal_width()) {
            Some(panel) => println!("{panel}"),
            None => println!("{}", "No article analyzed yet.".yellow()),
        }
    }

    fn copy_summary(&self) {
        let view = self.service.view();
        let Some(summary) = view
            .analytics
            .as_ref()
            .map(|a| a.summary.trim().to_string())
            .filter(|s| !s.is_empty())
        else {
            println!("{}", "No summary to copy.".yellow());
            return;
        };
        match arboard::Clipboard::new().and_then(|mut c| c.set_text(summary)) {
            Ok(()) => println!("{}", "Summary copied to clipboard.".green()),
            Err(e) => println!("{}", format!("Clipboard unavailable: {e}").red()),
        }
    }
}

fn progress_label(input: &str) -> &'static str {
    if looks_like_url(input) {
        "Analyzing article..."
    } else {
        "Thinking..."
    }
}
