use anyhow::{Context, Result};
use chrono::Utc;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use tally_core::{ChatContext, Conversation};

use crate::llm::GeminiClient;

/// Append-only daily transcript: `~/.tally/chat/YYYY-MM-DD.md`.
pub struct ChatLog {
    path: PathBuf,
}

impl ChatLog {
    pub fn open_today() -> Result<Self> {
        Self::open_in(&crate::state::chat_dir()?)
    }

    pub fn open_in(dir: &Path) -> Result<Self> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        Ok(Self {
            path: dir.join(format!("{today}.md")),
        })
    }

    pub fn append_system(&mut self, msg: &str) -> Result<()> {
        self.append("system", msg)
    }

    pub fn append_user(&mut self, msg: &str) -> Result<()> {
        self.append("user", msg)
    }

    pub fn append_assistant(&mut self, msg: &str) -> Result<()> {
        self.append("assistant", msg)
    }

    fn append(&mut self, role: &str, msg: &str) -> Result<()> {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(
            f,
            "- {} [{}] {}",
            Utc::now().to_rfc3339(),
            role,
            msg.replace('\n', " ")
        )?;
        Ok(())
    }
}

/// One exchange. The user turn stays in the conversation either way; on
/// failure the apology is shown and recorded instead of a reply.
pub async fn exchange(
    client: &GeminiClient,
    ctx: &ChatContext,
    conversation: &mut Conversation,
    max_turns: usize,
    message: &str,
) -> (String, bool) {
    let system = ctx.system_instruction();
    let result = client
        .generate(&system, conversation.recent(max_turns), message)
        .await;
    conversation.push_user(message);

    match result {
        Ok(reply) => {
            conversation.push_model(reply.clone());
            (reply, true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "chat generation failed");
            let apology = conversation.apology().to_string();
            conversation.push_model(apology.clone());
            (apology, false)
        }
    }
}

/// Line-oriented chat on stdin/stdout. Empty line is ignored, `/quit` or EOF
/// ends the session.
pub async fn run_chat(
    client: &GeminiClient,
    ctx: &ChatContext,
    mut conversation: Conversation,
    max_turns: usize,
) -> Result<()> {
    let mut log = ChatLog::open_today()?;
    log.append_system("session_start")?;

    println!("{}\n", conversation.greeting());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(input) = next_input(&mut lines).await? {
        log.append_user(&input)?;
        let (reply, ok) = exchange(client, ctx, &mut conversation, max_turns, &input).await;
        if !ok {
            log.append_system("generation_failed")?;
        }
        log.append_assistant(&reply)?;
        println!("\n{reply}\n");
    }

    log.append_system("session_end")?;
    Ok(())
}

/// Prompt and read until a non-empty line. `None` on EOF, `/quit` or `/exit`.
async fn next_input<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Result<Option<String>> {
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("read stdin")? else {
            return Ok(None);
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => return Ok(None),
            input => return Ok(Some(input.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_next_input_skips_blanks_and_stops_at_quit() {
        let mut lines = BufReader::new(&b"\n   \n  Quanto gastei?  \n/quit\nnever read\n"[..]).lines();
        assert_eq!(next_input(&mut lines).await.unwrap().as_deref(), Some("Quanto gastei?"));
        assert_eq!(next_input(&mut lines).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_input_ends_at_eof() {
        let mut lines = BufReader::new(&b"oi"[..]).lines();
        assert_eq!(next_input(&mut lines).await.unwrap().as_deref(), Some("oi"));
        assert_eq!(next_input(&mut lines).await.unwrap(), None);
    }

    #[test]
    fn test_chat_log_appends_one_line_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ChatLog::open_in(dir.path()).unwrap();
        log.append_user("Quanto gastei\nno mês?").unwrap();
        log.append_assistant("R$ 500,00").unwrap();

        let text = std::fs::read_to_string(&log.path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[user] Quanto gastei no mês?"));
        assert!(lines[1].ends_with("[assistant] R$ 500,00"));
    }
}
