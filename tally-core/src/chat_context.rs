//! Assembles what the financial assistant is told: a summary of the user's
//! transactions, their personal context, and the conversation so far.

use serde::{Deserialize, Serialize};

use crate::filter::filter_by_period;
use crate::money::{render_summary, Locale, MoneyFormat};
use crate::period::DateRange;
use crate::settings::ChatSettings;
use crate::summary::summarize_with_fallback;
use crate::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    locale: Locale,
    summary_block: String,
    personal_context: Option<String>,
}

impl ChatContext {
    pub fn new(locale: Locale, summary_block: impl Into<String>, personal_context: Option<String>) -> Self {
        Self {
            locale,
            summary_block: summary_block.into(),
            personal_context,
        }
    }

    pub fn summary_block(&self) -> &str {
        &self.summary_block
    }

    /// Instruction text for the generation service; the summary block is
    /// embedded verbatim.
    pub fn system_instruction(&self) -> String {
        let pt = self.locale.is_portuguese();
        let mut parts: Vec<String> = Vec::new();

        parts.push(if pt {
            "Você é um assistente financeiro especializado em ajudar pessoas a entenderem melhor seus gastos e organizarem suas finanças.".to_string()
        } else {
            "You are a financial assistant who helps people understand their spending and organize their finances.".to_string()
        });

        parts.push(self.summary_block.clone());

        if let Some(ctx) = self.personal_context.as_deref() {
            parts.push(if pt {
                format!("Contexto pessoal do usuário: {ctx}")
            } else {
                format!("User's personal context: {ctx}")
            });
        }

        if pt {
            parts.push("Seja amigável e direto nas respostas, use os dados financeiros do usuário para dar conselhos mais precisos e personalizados.".to_string());
            parts.push("Use emojis e quebras de linha para melhorar a legibilidade das respostas.".to_string());
            parts.push("Nunca use markdown, HTML ou outras formatações.".to_string());
        } else {
            parts.push("Be friendly and direct, and use the user's financial data to give precise, personal advice.".to_string());
            parts.push("Use emojis and line breaks to keep answers readable.".to_string());
            parts.push("Never use markdown, HTML or any other markup.".to_string());
        }

        parts.join("\n\n")
    }
}

/// Filter (when a range is given), summarize with the locale's fallback
/// category, and render the summary for the assistant.
pub fn build_chat_context(
    transactions: &[Transaction],
    range: Option<&DateRange>,
    money: &MoneyFormat,
    settings: &ChatSettings,
) -> ChatContext {
    let summary = match range {
        Some(r) => summarize_with_fallback(
            &filter_by_period(transactions, r),
            money.locale().fallback_category(),
        ),
        None => summarize_with_fallback(transactions, money.locale().fallback_category()),
    };

    tracing::debug!(
        transactions = transactions.len(),
        categories = summary.category_totals.len(),
        "built chat context"
    );

    ChatContext::new(
        money.locale(),
        render_summary(&summary, money),
        settings.personal_context.clone(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Chat history. The greeting is shown to the user but never sent as
/// history.
#[derive(Debug, Clone)]
pub struct Conversation {
    locale: Locale,
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            turns: Vec::new(),
        }
    }

    pub fn greeting(&self) -> &'static str {
        if self.locale.is_portuguese() {
            "Olá! Sou seu assistente financeiro. Posso ajudar você a entender melhor seus gastos, criar orçamentos e dar dicas para economizar. Como posso ajudar hoje?"
        } else {
            "Hi! I'm your financial assistant. I can help you understand your spending, build budgets and find ways to save. How can I help today?"
        }
    }

    /// Reply shown when the assistant could not answer.
    pub fn apology(&self) -> &'static str {
        if self.locale.is_portuguese() {
            "Desculpe, ocorreu um erro ao processar sua mensagem."
        } else {
            "Sorry, something went wrong while processing your message."
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role: Role::User,
            text: text.into(),
        });
    }

    pub fn push_model(&mut self, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role: Role::Model,
            text: text.into(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The newest `max_turns` turns, oldest first.
    pub fn recent(&self, max_turns: usize) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(max_turns);
        &self.turns[start..]
    }
}
