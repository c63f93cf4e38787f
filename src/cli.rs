// src/cli.rs
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::ChatError;
use crate::services::chatbot::ChatEngine;
use crate::services::openai::OpenAiProvider;
use crate::services::schema::{ResponseSchema, ResponseVariant};

#[derive(Parser, Debug)]
#[command(name = "typed-chat-backend")]
#[command(version, about = "Chat service that answers with typed, structured replies")]
pub struct Cli {
    /// Host IP address
    #[arg(long, global = true, default_value = "127.0.0.1")]
    pub host: String,

    /// Port number
    #[arg(long, global = true, default_value_t = 8000)]
    pub port: u16,

    /// Provider model identifier (falls back to OPENAI_MODEL)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Seconds to wait for one provider answer
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout_secs: u64,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Chat from the terminal
    Repl {
        /// Only allow plain text replies
        #[arg(long)]
        text_only: bool,
    },
}

/// Build an engine talking to the configured OpenAI-compatible provider.
pub fn build_engine(config: &Config, schema: ResponseSchema) -> Result<ChatEngine, ChatError> {
    let provider = OpenAiProvider::new(config.provider_settings(), schema)?;
    ChatEngine::new(Arc::new(provider), config.engine_settings())
}

/// Terminal rendering of one reply.
pub fn render_reply(response: &ResponseVariant) -> String {
    let mut out = format!("AI: {}\n", response.text());
    match response {
        ResponseVariant::MultiSelect(m) => {
            for (i, option) in m.options.iter().enumerate() {
                out.push_str(&format!("  [{}] {option}\n", i + 1));
            }
        }
        ResponseVariant::Picker(m) => {
            for (i, option) in m.options.iter().enumerate() {
                out.push_str(&format!("  {}. {option}\n", i + 1));
            }
        }
        ResponseVariant::Rating(m) => {
            out.push_str(&format!("  (rate from {} to {})\n", m.range_low, m.range_high));
        }
        ResponseVariant::YesNo(_) => out.push_str("  (yes/no)\n"),
        ResponseVariant::Text(_) => {}
    }
    out
}

/// Interactive loop: one line in, one reply out, until `exit`, `quit` or EOF.
pub async fn run_repl<R, W>(engine: &ChatEngine, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"Welcome to the chat! Type 'exit' or 'quit' to end the chat.\n")
        .await?;
    let mut lines = input.lines();
    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            output.write_all(b"Please enter a message.\n").await?;
            continue;
        }

        match engine.chat(&line).await {
            Ok(response) => output.write_all(render_reply(&response).as_bytes()).await?,
            Err(err) => output.write_all(format!("Error: {err}\n").as_bytes()).await?,
        }
    }
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chatbot::EngineSettings;
    use crate::services::provider::ScriptedProvider;
    use crate::services::schema::{PickerMessage, TextMessage};

    #[test]
    fn parses_defaults_and_subcommands() {
        let cli = Cli::parse_from(["typed-chat-backend"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.command, None);

        let cli = Cli::parse_from(["typed-chat-backend", "repl", "--text-only", "--port", "1"]);
        assert_eq!(cli.command, Some(Command::Repl { text_only: true }));
        assert_eq!(cli.port, 1);
    }

    #[test]
    fn renders_picker_options() {
        let reply = ResponseVariant::Picker(PickerMessage {
            text: "choose".into(),
            options: vec!["red".into(), "blue".into()],
        });
        assert_eq!(render_reply(&reply), "AI: choose\n  1. red\n  2. blue\n");
    }

    #[tokio::test]
    async fn repl_skips_empty_input_and_stops_on_quit() {
        let provider = ScriptedProvider::new("scripted")
            .then_reply(ResponseVariant::Text(TextMessage { text: "hello back".into() }))
            .then_fail("quota exceeded");
        let engine = ChatEngine::new(Arc::new(provider), EngineSettings::default()).unwrap();

        let input: &[u8] = b"hello\n\nagain\nQUIT\nnever sent\n";
        let mut output = Vec::new();
        run_repl(&engine, input, &mut output).await.unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("AI: hello back"));
        assert!(transcript.contains("Please enter a message."));
        assert!(transcript.contains("Error: provider error: quota exceeded"));
        assert!(!transcript.contains("never sent"));
        assert_eq!(engine.history().await.len(), 2);
    }

    #[tokio::test]
    async fn repl_forwards_lines_untrimmed() {
        let provider = Arc::new(
            ScriptedProvider::new("scripted")
                .then_reply(ResponseVariant::Text(TextMessage { text: "blank".into() }))
                .then_reply(ResponseVariant::Text(TextMessage { text: "padded".into() })),
        );
        let engine = ChatEngine::new(provider, EngineSettings::default()).unwrap();

        let input: &[u8] = b"   \n quit \nexit\n";
        let mut output = Vec::new();
        run_repl(&engine, input, &mut output).await.unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(!transcript.contains("Please enter a message."));
        assert!(transcript.contains("AI: padded"));
        let history = engine.history().await;
        assert_eq!(history[0].text, "   ");
        assert_eq!(history[2].text, " quit ");
    }
}
