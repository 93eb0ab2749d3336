//! Localized currency rendering and the fixed-template summary text that is
//! handed to the assistant.

use numfmt::{Formatter, Precision};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::summary::Summary;

const NBSP: char = '\u{a0}';
const NARROW_NBSP: char = '\u{202f}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    PtBr,
    EnUs,
    EnGb,
    DeDe,
    FrFr,
}

impl Locale {
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::PtBr => "pt-BR",
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::DeDe => "de-DE",
            Locale::FrFr => "fr-FR",
        }
    }

    /// Label for expenses without a category.
    pub fn fallback_category(&self) -> &'static str {
        match self {
            Locale::PtBr => "Outros",
            _ => crate::summary::FALLBACK_CATEGORY,
        }
    }

    pub fn is_portuguese(&self) -> bool {
        matches!(self, Locale::PtBr)
    }

    fn group_separator(&self) -> char {
        match self {
            Locale::PtBr | Locale::DeDe => '.',
            Locale::EnUs | Locale::EnGb => ',',
            Locale::FrFr => NARROW_NBSP,
        }
    }

    fn decimal_separator(&self) -> char {
        match self {
            Locale::EnUs | Locale::EnGb => '.',
            Locale::PtBr | Locale::DeDe | Locale::FrFr => ',',
        }
    }

    fn labels(&self) -> SummaryLabels {
        if self.is_portuguese() {
            SummaryLabels {
                heading: "Resumo financeiro do usuário:",
                income: "Receita total",
                expenses: "Despesas totais",
                balance: "Saldo atual",
                categories: "Principais categorias de gastos:",
            }
        } else {
            SummaryLabels {
                heading: "User's financial summary:",
                income: "Total income",
                expenses: "Total expenses",
                balance: "Net balance",
                categories: "Main spending categories:",
            }
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().replace('_', "-").to_ascii_lowercase().as_str() {
            "pt-br" => Ok(Locale::PtBr),
            "en-us" => Ok(Locale::EnUs),
            "en-gb" => Ok(Locale::EnGb),
            "de-de" => Ok(Locale::DeDe),
            "fr-fr" => Ok(Locale::FrFr),
            _ => Err(Error::UnsupportedLocale(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Brl,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    /// Symbol as written in `locale`; the dollar is disambiguated outside
    /// the US.
    pub fn symbol(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Currency::Brl, _) => "R$",
            (Currency::Usd, Locale::EnUs) => "$",
            (Currency::Usd, _) => "US$",
            (Currency::Eur, _) => "€",
            (Currency::Gbp, _) => "£",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRL" => Ok(Currency::Brl),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            _ => Err(Error::UnsupportedCurrency(s.to_string())),
        }
    }
}

/// A locale/currency pair able to render amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyFormat {
    locale: Locale,
    currency: Currency,
}

impl MoneyFormat {
    pub fn new(locale: Locale, currency: Currency) -> Self {
        Self { locale, currency }
    }

    /// Look up a pair by tag and code, e.g. `("pt-BR", "BRL")`.
    pub fn parse(locale: &str, currency: &str) -> Result<Self> {
        Ok(Self::new(locale.parse()?, currency.parse()?))
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Symbol, grouped thousands and two decimals, rounded half away from
    /// zero. Negative amounts get a leading `-`.
    pub fn format(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded < Decimal::ZERO { "-" } else { "" };

        let (group, decimal) = (self.locale.group_separator(), self.locale.decimal_separator());
        let number: String = grouped_amount(rounded.abs())
            .chars()
            .map(|c| match c {
                ',' => group,
                '.' => decimal,
                c => c,
            })
            .collect();

        let symbol = self.currency.symbol(self.locale);
        match self.locale {
            Locale::PtBr => format!("{sign}{symbol}{NBSP}{number}"),
            Locale::EnUs | Locale::EnGb => format!("{sign}{symbol}{number}"),
            Locale::DeDe | Locale::FrFr => format!("{sign}{number}{NBSP}{symbol}"),
        }
    }
}

/// `1,234.50` for a non-negative two-decimal amount; the caller swaps in
/// the locale's separators.
fn grouped_amount(value: Decimal) -> String {
    static FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let fmt = FMT.get_or_init(|| {
        Formatter::currency("")
            .ok()
            .map(|f| f.precision(Precision::Decimals(2)))
    });

    let formatted = match (fmt, value.to_f64()) {
        // Zero is hardcoded as "0" by numfmt
        _ if value.is_zero() => "0.00".to_owned(),
        (Some(fmt), Some(v)) => fmt.fmt_string(v),
        _ => format!("{value:.2}"),
    };
    // Past its cutoff numfmt switches to scientific notation
    let formatted = if formatted.contains('e') {
        format!("{value:.2}")
    } else {
        formatted
    };

    // numfmt omits trailing zeros, "12.30" comes out as "12.3"
    match formatted.split_once('.') {
        Some((int, frac)) => format!("{int}.{frac:0<2}"),
        None => format!("{formatted}.00"),
    }
}

struct SummaryLabels {
    heading: &'static str,
    income: &'static str,
    expenses: &'static str,
    balance: &'static str,
    categories: &'static str,
}

/// Render the summary as the multi-line block embedded in the assistant's
/// instructions. Categories keep the summary's order.
pub fn render_summary(summary: &Summary, money: &MoneyFormat) -> String {
    let labels = money.locale().labels();

    let mut lines = vec![
        labels.heading.to_string(),
        format!("- {}: {}", labels.income, money.format(summary.total_income)),
        format!("- {}: {}", labels.expenses, money.format(summary.total_expenses)),
        format!("- {}: {}", labels.balance, money.format(summary.net_balance)),
        String::new(),
        labels.categories.to_string(),
    ];
    lines.extend(
        summary
            .category_totals
            .iter()
            .map(|c| format!("- {}: {}", c.category, money.format(c.amount))),
    );

    lines.join("\n")
}

/// [`render_summary`] for a locale tag and currency code; fails when the
/// pair cannot be formatted.
pub fn render_summary_for(summary: &Summary, locale: &str, currency: &str) -> Result<String> {
    let money = MoneyFormat::parse(locale, currency)?;
    Ok(render_summary(summary, &money))
}
