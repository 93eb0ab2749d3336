//! Property tests for the aggregation engine.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_core::{filter_by_period, summarize, Period, Transaction, UserId};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
}

fn arb_category() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[A-Z][a-z]{2,8}".prop_map(Some),
    ]
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        -5_000_000i64..5_000_000, // cents
        -400i64 * 86_400..400 * 86_400, // seconds around base
        arb_category(),
    )
        .prop_map(|(cents, offset, category)| {
            let mut t = Transaction::new(
                "t",
                UserId::new("u1"),
                "t",
                Decimal::new(cents, 2),
                base() + TimeDelta::seconds(offset),
            );
            t.category = category;
            t
        })
}

fn arb_period() -> impl Strategy<Value = Period> {
    prop_oneof![
        Just(Period::Day),
        Just(Period::Week),
        Just(Period::Month),
        Just(Period::Year),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_net_balance_is_income_minus_expenses(txs in proptest::collection::vec(arb_transaction(), 0..60)) {
        let s = summarize(&txs);
        prop_assert_eq!(s.net_balance, s.total_income - s.total_expenses);
    }

    #[test]
    fn prop_category_totals_sum_to_expenses(txs in proptest::collection::vec(arb_transaction(), 0..60)) {
        let s = summarize(&txs);
        let by_category: Decimal = s.category_totals.iter().map(|c| c.amount).sum();
        prop_assert_eq!(by_category, s.total_expenses);
    }

    #[test]
    fn prop_filter_is_idempotent(
        txs in proptest::collection::vec(arb_transaction(), 0..60),
        period in arb_period(),
    ) {
        let range = period.resolve(&base());
        let once = filter_by_period(&txs, &range);
        let twice = filter_by_period(&once, &range);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_filter_keeps_only_in_range(
        txs in proptest::collection::vec(arb_transaction(), 0..60),
        period in arb_period(),
    ) {
        let range = period.resolve(&base());
        let kept = filter_by_period(&txs, &range);
        let expected = txs.iter().filter(|t| t.date >= range.start && t.date <= range.end).count();
        prop_assert_eq!(kept.len(), expected);
    }
}
