#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::errors::{Error, LedgerError};
    use crate::ledger::{
        plan_posting, replay_balances, verify_ledger, AccountProjection, LedgerBalances,
        PostingAttributes, EVENT_TYPE_COPY_TRADE_PROFIT, EVENT_TYPE_DEPOSIT,
        EVENT_TYPE_FUNDED_PROFIT, EVENT_TYPE_TRADE_BUY, EVENT_TYPE_TRADE_SELL,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 30, 0).unwrap()
    }

    fn seeded(cash: Decimal) -> AccountProjection {
        AccountProjection::seeded("acc-1", LedgerBalances::from_cash(cash), now())
    }

    fn buy(amount: Decimal) -> PostingAttributes {
        PostingAttributes {
            cash_delta: Some(-amount),
            holding_delta: Some(amount),
            ..Default::default()
        }
    }

    // ==================== Posting scenarios ====================

    #[test]
    fn test_buy_then_profitable_sell() {
        let start = seeded(dec!(1000));

        let first = plan_posting(&start, 1, "trade_buy", &buy(dec!(200)), now()).unwrap();
        assert_eq!(first.projection.balances.cash, dec!(800));
        assert_eq!(first.projection.balances.holdings, dec!(200));
        assert_eq!(first.projection.investing_total, dec!(200));
        assert_eq!(first.projection.pnl_percent, dec!(0));

        let sell = PostingAttributes {
            cash_delta: Some(dec!(50)),
            profit_delta: Some(dec!(50)),
            ..Default::default()
        };
        let second = plan_posting(&first.projection, 2, "trade_sell", &sell, now()).unwrap();
        let p = &second.projection;
        assert_eq!(p.balances.cash, dec!(850));
        assert_eq!(p.balances.profit, dec!(50));
        assert_eq!(p.investing_total, dec!(250));
        assert_eq!(p.pnl_percent, dec!(25));
        assert!(p.derived_fields_consistent());
    }

    #[test]
    fn test_event_carries_deltas_and_resulting_balances() {
        let start = seeded(dec!(1000));
        let attrs = PostingAttributes {
            source_type: Some("order".to_string()),
            source_id: Some("1234".to_string()),
            admin_id: Some("admin-7".to_string()),
            metadata: Some(serde_json::json!({"symbol": "AAPL"})),
            ..buy(dec!(200))
        };
        let planned = plan_posting(&start, 1, "trade_buy", &attrs, now()).unwrap();
        let event = &planned.event;

        assert_eq!(event.account_id, "acc-1");
        assert_eq!(event.projection_id, start.id);
        assert_eq!(event.sequence, 1);
        assert_eq!(event.status, "posted");
        assert_eq!(event.source_ref().as_deref(), Some("order:1234"));
        assert_eq!(event.admin_id.as_deref(), Some("admin-7"));
        assert_eq!(event.deltas.cash, dec!(-200));
        assert_eq!(event.resulting, planned.projection.balances);
        assert_eq!(event.previous_balances(), start.balances);
    }

    #[test]
    fn test_omitted_deltas_default_to_zero() {
        let start = seeded(dec!(10));
        let planned =
            plan_posting(&start, 1, "noop", &PostingAttributes::default(), now()).unwrap();
        assert!(planned.event.deltas.is_zero());
        assert_eq!(planned.projection.balances, start.balances);
    }

    #[test]
    fn test_deltas_rounded_to_eight_digits() {
        let start = seeded(dec!(0));
        let attrs = PostingAttributes {
            cash_delta: Some(dec!(0.123456789)),
            ..Default::default()
        };
        let planned = plan_posting(&start, 1, EVENT_TYPE_DEPOSIT, &attrs, now()).unwrap();
        assert_eq!(planned.event.deltas.cash, dec!(0.12345679));
        assert_eq!(planned.projection.balances.cash, dec!(0.12345679));
    }

    #[test]
    fn test_occurred_at_uses_caller_timestamp_when_parseable() {
        let start = seeded(dec!(0));
        let attrs = PostingAttributes {
            occurred_at: Some("2024-03-31 23:59:00".to_string()),
            cash_delta: Some(dec!(5)),
            ..Default::default()
        };
        let planned = plan_posting(&start, 1, EVENT_TYPE_DEPOSIT, &attrs, now()).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap();
        assert_eq!(planned.event.occurred_at, expected);
        assert_eq!(planned.projection.as_of, expected);

        let garbage = PostingAttributes {
            occurred_at: Some("last tuesday".to_string()),
            ..attrs
        };
        let planned = plan_posting(&start, 1, EVENT_TYPE_DEPOSIT, &garbage, now()).unwrap();
        assert_eq!(planned.event.occurred_at, now());
    }

    #[test]
    fn test_custom_status_is_kept() {
        let start = seeded(dec!(0));
        let attrs = PostingAttributes {
            status: Some("pending_review".to_string()),
            ..Default::default()
        };
        let planned = plan_posting(&start, 1, EVENT_TYPE_DEPOSIT, &attrs, now()).unwrap();
        assert_eq!(planned.event.status, "pending_review");
    }

    #[test]
    fn test_overdraft_rejected() {
        let start = seeded(dec!(100));
        let err = plan_posting(&start, 1, "withdrawal", &buy(dec!(150)), now()).unwrap_err();
        match err {
            Error::Ledger(LedgerError::InsufficientFunds {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, dec!(100));
                assert_eq!(requested, dec!(150));
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
    }

    #[test]
    fn test_overdraft_allowed_when_flagged() {
        let start = seeded(dec!(100));
        let attrs = PostingAttributes {
            allow_overdraft: true,
            ..buy(dec!(150))
        };
        let planned = plan_posting(&start, 1, "admin_adjustment", &attrs, now()).unwrap();
        assert_eq!(planned.projection.balances.cash, dec!(-50));
    }

    #[test]
    fn test_credit_on_negative_cash_is_not_an_overdraft() {
        let mut start = seeded(dec!(0));
        start.balances.cash = dec!(-20);
        let attrs = PostingAttributes {
            cash_delta: Some(dec!(5)),
            ..Default::default()
        };
        assert!(plan_posting(&start, 1, EVENT_TYPE_DEPOSIT, &attrs, now()).is_ok());
    }

    #[test]
    fn test_empty_event_type_rejected() {
        let start = seeded(dec!(0));
        let err = plan_posting(&start, 1, "  ", &PostingAttributes::default(), now()).unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::InvalidAttributes(_))
        ));
    }

    #[test]
    fn test_overflowing_credit_rejected() {
        let start = seeded(Decimal::MAX - dec!(1));
        let attrs = PostingAttributes {
            cash_delta: Some(dec!(10)),
            ..Default::default()
        };
        let err = plan_posting(&start, 1, EVENT_TYPE_DEPOSIT, &attrs, now()).unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::InvalidAttributes(_))
        ));
    }

    #[test]
    fn test_overflowing_investing_total_rejected() {
        let start = seeded(dec!(0));
        let attrs = PostingAttributes {
            holding_delta: Some(Decimal::MAX),
            profit_delta: Some(Decimal::MAX),
            ..Default::default()
        };
        let err = plan_posting(&start, 1, EVENT_TYPE_DEPOSIT, &attrs, now()).unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::InvalidAttributes(_))
        ));
    }

    #[test]
    fn test_replay_saturates_instead_of_panicking() {
        let balances = LedgerBalances::from_cash(Decimal::MAX);
        let next = balances.apply(&LedgerBalances::from_cash(Decimal::MAX));
        assert_eq!(next.cash, Decimal::MAX);
        assert!(balances
            .checked_apply(&LedgerBalances::from_cash(Decimal::MAX))
            .is_none());
    }

    #[test]
    fn test_pnl_percent_zero_when_holdings_near_zero() {
        let balances = LedgerBalances {
            holdings: dec!(0.000000001),
            profit: dec!(10),
            ..Default::default()
        };
        assert_eq!(balances.pnl_percent(), dec!(0));
    }

    #[test]
    fn test_attributes_deserialize_from_flat_map() {
        let attrs: PostingAttributes = serde_json::from_value(serde_json::json!({
            "cash_delta": -200,
            "holding_delta": 200.5,
            "source_type": "order",
            "source_id": "42",
        }))
        .unwrap();
        let deltas = attrs.deltas();
        assert_eq!(deltas.cash, dec!(-200));
        assert_eq!(deltas.holdings, dec!(200.5));
        assert_eq!(deltas.profit, dec!(0));
        assert!(!attrs.suppress_mirror);
    }

    // ==================== Replay and verification ====================

    #[test]
    fn test_replay_reproduces_projection() {
        let mut projection = seeded(dec!(1000));
        let mut events = Vec::new();
        let postings = [
            (EVENT_TYPE_TRADE_BUY, buy(dec!(200))),
            (
                EVENT_TYPE_TRADE_SELL,
                PostingAttributes {
                    cash_delta: Some(dec!(50)),
                    profit_delta: Some(dec!(50)),
                    asset_profit_delta: Some(dec!(7)),
                    ..Default::default()
                },
            ),
            (
                EVENT_TYPE_COPY_TRADE_PROFIT,
                PostingAttributes {
                    copy_profit_delta: Some(dec!(3.3)),
                    ..Default::default()
                },
            ),
            (
                EVENT_TYPE_FUNDED_PROFIT,
                PostingAttributes {
                    funded_profit_delta: Some(dec!(-1.1)),
                    ..Default::default()
                },
            ),
        ];
        for (i, (event_type, attrs)) in postings.iter().enumerate() {
            let planned =
                plan_posting(&projection, i as i64 + 1, event_type, attrs, now()).unwrap();
            projection = planned.projection;
            events.push(planned.event);
        }

        let seed = LedgerBalances::from_cash(dec!(1000));
        assert_eq!(replay_balances(&seed, &events), projection.balances);

        let verification = verify_ledger("acc-1", &projection, &events);
        assert!(verification.is_consistent(), "{:?}", verification);
        assert_eq!(verification.event_count, 4);
        assert_eq!(events[2].event_type, "copy_trade_profit");
        assert_eq!(projection.balances.funded_profit, dec!(-1.1));
        assert_eq!(verification.replayed, projection.balances);
    }

    #[test]
    fn test_verify_reports_drift_and_broken_links() {
        let start = seeded(dec!(1000));
        let first = plan_posting(&start, 1, "trade_buy", &buy(dec!(200)), now()).unwrap();
        let mut second = plan_posting(&first.projection, 2, "trade_buy", &buy(dec!(100)), now())
            .unwrap();

        // A tampered event whose resulting cash no longer follows from its delta.
        second.event.resulting.cash = dec!(650);
        let mut projection = second.projection.clone();
        projection.balances.cash = dec!(690);

        let verification =
            verify_ledger("acc-1", &projection, &[first.event.clone(), second.event]);
        assert!(!verification.is_consistent());
        assert_eq!(verification.broken_links, vec![2]);
        assert_eq!(verification.drift.len(), 1);
        assert_eq!(verification.drift[0].field, "cash");
        assert_eq!(verification.drift[0].expected, dec!(700));
        assert_eq!(verification.drift[0].actual, dec!(690));
    }

    #[test]
    fn test_verify_without_events_is_consistent() {
        let projection = seeded(dec!(42));
        let verification = verify_ledger("acc-1", &projection, &[]);
        assert!(verification.is_consistent());
        assert_eq!(verification.event_count, 0);
    }
}
