#![allow(dead_code)]

use paged_aggregator::{FilterName, FilterState};
use std::ops::Range;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub id: u32,
    pub issuer: String,
}

pub fn badges(issuer: &str, ids: Range<u32>) -> Vec<Badge> {
    ids.map(|id| Badge {
        id,
        issuer: issuer.to_string(),
    })
    .collect()
}

pub fn issuer(name: &str) -> FilterState {
    FilterState::new()
        .with(FilterName::Issuer, name)
        .expect("issuer is a text filter")
}
