//! Command-line interface for tadawul-chat
//!
//! # Usage
//!
//! ```bash
//! export GROQ_API_KEY="gsk_..."
//! export LLM_MODEL="llama-3.3-70b-versatile"
//! export MOCK_DATA=true   # or RAPID_API_V1_KEY / RAPID_API_V2_KEY / RAPID_API_HOST
//!
//! tadawul chat --message "How is Aramco doing?"
//! tadawul chat                 # interactive
//! tadawul dashboard
//! tadawul chart --company-id 14
//! ```

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use tadawul_chat::{
    AnswerContext, ChartLookup, ChatConfig, ChatError, ChatMessage, ChatRequest, ChatService,
};
use tadawul_utils::{LogFormat, init_tracing};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SUCCESS_MESSAGE: &str = "Chat message sent.";

#[derive(Parser, Debug)]
#[command(name = "tadawul")]
#[command(about = "Ask questions about Saudi Exchange equities", long_about = None)]
struct Cli {
    /// Seconds before an in-flight request is cancelled
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message, or start an interactive session
    Chat {
        /// Message to send; omit for an interactive session
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Today's top gainers followed by top losers
    Dashboard,
    /// Daily price chart for one company
    Chart(ChartArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ChartArgs {
    /// Tadawul instrument id, e.g. 2222
    #[arg(long)]
    tadawul_id: Option<String>,

    /// Company id from the company map
    #[arg(long)]
    company_id: Option<i64>,
}

impl ChartArgs {
    fn lookup(&self) -> Option<ChartLookup> {
        match (&self.tadawul_id, self.company_id) {
            (Some(id), _) => Some(ChartLookup::TadawulId(id.clone())),
            (None, Some(id)) => Some(ChartLookup::CompanyId(id)),
            (None, None) => None,
        }
    }
}

/// Body printed for every request
#[derive(Serialize)]
struct Output<T: Serialize> {
    data: Option<T>,
    message: String,
}

/// Cancels a child token when the timeout elapses
struct Deadline {
    token: CancellationToken,
    timer: Option<JoinHandle<()>>,
}

impl Deadline {
    fn start(parent: &CancellationToken, timeout: Duration) -> Self {
        let token = parent.child_token();
        let expiry = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(timeout_secs = timeout.as_secs(), "Request timed out");
            expiry.cancel();
        });

        Self {
            token,
            timer: Some(timer),
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn print_json<T: Serialize>(output: &Output<T>) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(output).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

/// Print the result envelope; returns whether the request succeeded
fn report<T: Serialize>(result: Result<T, ChatError>) -> anyhow::Result<bool> {
    match result {
        Ok(data) => {
            print_json(&Output {
                data: Some(data),
                message: SUCCESS_MESSAGE.to_string(),
            })?;
            Ok(true)
        }
        Err(err) => {
            error!(error = %err, "Request failed");
            print_json::<()>(&Output {
                data: None,
                message: err.user_message().to_string(),
            })?;
            Ok(false)
        }
    }
}

/// One read from the interactive prompt
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Wait for the next line, giving up as soon as `root` is cancelled
async fn next_input<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    root: &CancellationToken,
) -> io::Result<Input> {
    tokio::select! {
        biased;
        () = root.cancelled() => Ok(Input::Interrupted),
        line = lines.next_line() => Ok(line?.map_or(Input::Eof, Input::Line)),
    }
}

async fn run_chat_repl(
    service: &ChatService,
    root: &CancellationToken,
    timeout: Duration,
) -> anyhow::Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut context: Option<AnswerContext> = None;

    println!("Ask about Saudi stocks. Blank line drops the previous turn, Ctrl-D exits.");

    loop {
        print!("> ");
        stdout.flush()?;

        let input = match next_input(&mut lines, root).await? {
            Input::Line(line) => line,
            Input::Eof => {
                println!();
                return Ok(true);
            }
            Input::Interrupted => {
                println!();
                return Ok(false);
            }
        };
        let input = input.trim_end_matches('\r');
        if input == "/exit" {
            return Ok(true);
        }

        history.push(ChatMessage::user(input));
        let request = ChatRequest {
            messages: history.clone(),
            context: context.clone(),
        };

        let deadline = Deadline::start(root, timeout);
        match service.chat(&request, &deadline.token).await {
            Ok(envelope) => {
                history.push(ChatMessage::assistant(envelope.answer.clone()));
                if let Some(next) = envelope.answer_context() {
                    context = Some(next);
                }
                report(Ok(envelope))?;
            }
            Err(err) => {
                report::<()>(Err(err))?;
                if root.is_cancelled() {
                    return Ok(false);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(format, "warn,tadawul_chat=info,tadawul_cli=info");

    let config = ChatConfig::from_env().context("failed to load configuration")?;
    let timeout = cli
        .timeout
        .map_or(config.request_timeout, Duration::from_secs);
    let service = ChatService::from_config(&config).context("failed to start chat service")?;

    let root = CancellationToken::new();
    let interrupt = root.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling in-flight requests");
            interrupt.cancel();
        }
    });

    let succeeded = match cli.command {
        Command::Chat { message: Some(message) } => {
            let request = ChatRequest {
                messages: vec![ChatMessage::user(message)],
                context: None,
            };
            let deadline = Deadline::start(&root, timeout);
            report(service.chat(&request, &deadline.token).await)?
        }
        Command::Chat { message: None } => run_chat_repl(&service, &root, timeout).await?,
        Command::Dashboard => {
            let deadline = Deadline::start(&root, timeout);
            report(service.dashboard(&deadline.token).await)?
        }
        Command::Chart(args) => {
            let lookup = args
                .lookup()
                .context("either --tadawul-id or --company-id is required")?;
            let deadline = Deadline::start(&root, timeout);
            report(service.company_chart(&lookup, &deadline.token).await)?
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
