//! Tests for listing, cancel and queue-edit subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use shuttle_core::job_db::PriorityTier;

#[test]
fn cli_parse_show_and_queue() {
    match parse(&["shuttle", "show", "42"]) {
        CliCommand::Show { id } => assert_eq!(id, 42),
        _ => panic!("expected Show"),
    }
    match parse(&["shuttle", "queue"]) {
        CliCommand::Queue { json } => assert!(!json),
        _ => panic!("expected Queue"),
    }
}

#[test]
fn cli_parse_history_paging() {
    match parse(&["shuttle", "history"]) {
        CliCommand::History {
            limit,
            offset,
            json,
        } => {
            assert_eq!(limit, 50);
            assert_eq!(offset, 0);
            assert!(!json);
        }
        _ => panic!("expected History"),
    }
    match parse(&["shuttle", "history", "--limit", "10", "--offset", "20", "--json"]) {
        CliCommand::History {
            limit,
            offset,
            json,
        } => {
            assert_eq!(limit, 10);
            assert_eq!(offset, 20);
            assert!(json);
        }
        _ => panic!("expected History with paging"),
    }
}

#[test]
fn cli_parse_cancel_variants() {
    match parse(&["shuttle", "cancel", "7"]) {
        CliCommand::Cancel { id } => assert_eq!(id, 7),
        _ => panic!("expected Cancel"),
    }
    assert!(matches!(parse(&["shuttle", "cancel-all"]), CliCommand::CancelAll));
    assert!(Cli::try_parse_from(["shuttle", "cancel", "seven"]).is_err());
}

#[test]
fn cli_parse_priority() {
    match parse(&["shuttle", "priority", "3", "low"]) {
        CliCommand::Priority { id, tier } => {
            assert_eq!(id, 3);
            assert_eq!(tier, PriorityTier::Low);
        }
        _ => panic!("expected Priority"),
    }
}

#[test]
fn cli_parse_reorder_needs_ids() {
    match parse(&["shuttle", "reorder", "5", "2", "9"]) {
        CliCommand::Reorder { ids } => assert_eq!(ids, vec![5, 2, 9]),
        _ => panic!("expected Reorder"),
    }
    assert!(Cli::try_parse_from(["shuttle", "reorder"]).is_err());
}

#[test]
fn cli_parse_retry() {
    match parse(&["shuttle", "retry", "11"]) {
        CliCommand::Retry { id } => assert_eq!(id, 11),
        _ => panic!("expected Retry"),
    }
}

#[test]
fn cli_parse_stats_and_notify_test() {
    match parse(&["shuttle", "stats"]) {
        CliCommand::Stats { json } => assert!(!json),
        _ => panic!("expected Stats"),
    }
    match parse(&["shuttle", "stats", "--json"]) {
        CliCommand::Stats { json } => assert!(json),
        _ => panic!("expected Stats"),
    }
    assert!(matches!(
        parse(&["shuttle", "notify-test"]),
        CliCommand::NotifyTest
    ));
    assert!(Cli::try_parse_from(["shuttle", "notify-test", "extra"]).is_err());
}
