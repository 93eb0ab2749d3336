use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::America::Sao_Paulo;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::{
    build_chat_context, filter_by_period, render_summary, summarize, ChatSettings, Currency,
    Locale, MoneyFormat, Period, Transaction, UserId,
};

fn now() -> DateTime<Tz> {
    Sao_Paulo.with_ymd_and_hms(2026, 10, 19, 14, 0, 0).unwrap()
}

fn tx(id: &str, amount: Decimal, date: DateTime<Tz>, category: Option<&str>) -> Transaction {
    let t = Transaction::new(id, UserId::new("u1"), id, amount, date.with_timezone(&Utc));
    match category {
        Some(c) => t.with_category(c),
        None => t,
    }
}

/// Scenario A: income plus a categorized and an uncategorized expense today.
#[test]
fn test_day_summary_with_fallback_bucket() {
    let morning = Sao_Paulo.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
    let txs = vec![
        tx("salary", dec!(1000), morning, None),
        tx("lunch", dec!(-250), morning, Some("Food")),
        tx("misc", dec!(-50), morning, Some("")),
    ];

    let range = Period::Day.resolve(&now());
    let s = summarize(&filter_by_period(&txs, &range));

    assert_eq!(s.total_income, dec!(1000));
    assert_eq!(s.total_expenses, dec!(300));
    assert_eq!(s.net_balance, dec!(700));
    assert_eq!(s.category_totals.len(), 2);
    assert_eq!(s.category_total("Food"), Some(dec!(250)));
    assert_eq!(s.category_total("Other"), Some(dec!(50)));
}

/// Scenario B: nothing recorded, every period yields zeros.
#[test]
fn test_empty_history_all_periods() {
    for period in Period::ALL {
        let range = period.resolve(&now());
        let s = summarize(&filter_by_period(&[], &range));
        assert_eq!(s.total_income, Decimal::ZERO);
        assert_eq!(s.total_expenses, Decimal::ZERO);
        assert_eq!(s.net_balance, Decimal::ZERO);
        assert!(s.category_totals.is_empty());
    }
}

/// Scenario C: eight days ago is outside the week but inside the month.
#[test]
fn test_eight_days_ago_week_vs_month() {
    let txs = vec![tx("old", dec!(-40), now() - TimeDelta::days(8), Some("Fuel"))];

    let week = filter_by_period(&txs, &Period::Week.resolve(&now()));
    let month = filter_by_period(&txs, &Period::Month.resolve(&now()));

    assert!(week.is_empty());
    assert_eq!(month.len(), 1);
    assert_eq!(summarize(&month).category_total("Fuel"), Some(dec!(40)));
}

/// Scenario D: a zero amount creates a zero-valued category entry.
#[test]
fn test_zero_amount_creates_zero_entry() {
    let txs = vec![tx("adj", dec!(0), now(), Some("Adjustments"))];
    let s = summarize(&txs);

    assert_eq!(s.total_income, Decimal::ZERO);
    assert_eq!(s.total_expenses, Decimal::ZERO);
    assert_eq!(s.category_total("Adjustments"), Some(Decimal::ZERO));
}

#[test]
fn test_boundaries_are_inclusive() {
    let range = Period::Week.resolve(&now());
    let txs = vec![
        tx("start", dec!(-1), range.start.with_timezone(&Sao_Paulo), None),
        tx("end", dec!(-2), range.end.with_timezone(&Sao_Paulo), None),
        tx("just-before", dec!(-4), (range.start - TimeDelta::milliseconds(1)).with_timezone(&Sao_Paulo), None),
    ];
    let kept: Vec<_> = filter_by_period(&txs, &range).into_iter().map(|t| t.id).collect();
    assert_eq!(kept, vec!["start", "end"]);
}

#[test]
fn test_rendered_block_for_month() {
    let txs = vec![
        tx("pay", dec!(5200), now() - TimeDelta::days(3), None),
        tx("rent", dec!(-1800), now() - TimeDelta::days(10), Some("Moradia")),
        tx("market", dec!(-612.35), now() - TimeDelta::days(2), Some("Compras")),
        tx("last-year", dec!(-999), now() - TimeDelta::days(400), Some("Viagem")),
    ];
    let money = MoneyFormat::new(Locale::PtBr, Currency::Brl);
    let range = Period::Month.resolve(&now());

    let text = render_summary(&summarize(&filter_by_period(&txs, &range)), &money);
    assert_eq!(
        text,
        "Resumo financeiro do usuário:\n\
- Receita total: R$\u{a0}5.200,00\n\
- Despesas totais: R$\u{a0}2.412,35\n\
- Saldo atual: R$\u{a0}2.787,65\n\
\n\
Principais categorias de gastos:\n\
- Moradia: R$\u{a0}1.800,00\n\
- Compras: R$\u{a0}612,35"
    );

    let ctx = build_chat_context(&txs, Some(&range), &money, &ChatSettings::default());
    assert!(ctx.system_instruction().contains(&text));
}
