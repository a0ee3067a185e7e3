//! Ask a question about the image of the day from the terminal.
//!
//! ```bash
//! ask --question "What am I looking at?"
//! ask --image-url https://example.com/m31.jpg --question "How far away is it?" --html
//! ```

use std::io::{self, Write};

use answer_ox::{AnswerView, AskClient, Renderer};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ask")]
#[command(about = "Ask a question about an image and stream the answer")]
struct Args {
    /// Base URL of the relay
    #[arg(long, env = "ASK_SERVER", default_value = "http://localhost:3000")]
    server: String,

    #[arg(short, long)]
    question: String,

    /// Image to ask about; defaults to the current image of the day
    #[arg(long)]
    image_url: Option<String>,

    /// Print the sanitized HTML of the answer once it is complete
    #[arg(long)]
    html: bool,
}

/// Prints each new stretch of text as it arrives. The accumulated text only
/// grows, so everything before `printed` is already on screen.
#[derive(Default)]
struct TerminalView {
    printed: usize,
    html: Option<String>,
    failed: bool,
}

impl AnswerView for TerminalView {
    fn show_placeholder(&mut self, text: &str) {
        eprintln!("{text}");
    }

    fn set_text(&mut self, text: &str) {
        let fresh = text.get(self.printed..).unwrap_or(text);
        print!("{fresh}");
        let _ = io::stdout().flush();
        self.printed = text.len();
    }

    fn set_html(&mut self, html: &str) {
        println!();
        self.html = Some(html.to_string());
    }

    fn show_error(&mut self, message: &str) {
        if self.printed > 0 {
            println!();
        }
        eprintln!("{message}");
        self.failed = true;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "answer_ox=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let client = AskClient::new(&args.server);

    let image_url = match args.image_url {
        Some(url) => url,
        None => {
            let picture = client.picture().await?;
            eprintln!("{}\n{}\n", picture.title, picture.url);
            picture.url
        }
    };

    let mut renderer = Renderer::new(TerminalView::default());
    let outcome = client.ask(&args.question, &image_url, &mut renderer).await;
    let view = renderer.into_view();

    if args.html {
        if let Some(html) = &view.html {
            println!("{html}");
        }
    }

    match outcome {
        Ok(()) => Ok(()),
        Err(err) if view.failed => {
            tracing::debug!(error = %err, "ask failed");
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}
