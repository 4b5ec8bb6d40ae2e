#![forbid(unsafe_code)]

//! `proptest` strategies for driving bound endpoints.

use proptest::prelude::*;

/// Which endpoint a generated write lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

/// One generated write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    pub side: Side,
    pub value: i32,
}

pub fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Source), Just(Side::Target)]
}

pub fn write() -> impl Strategy<Value = Write> {
    (side(), any::<i32>()).prop_map(|(side, value)| Write { side, value })
}

/// Between one and `max` writes.
pub fn writes(max: usize) -> impl Strategy<Value = Vec<Write>> {
    prop::collection::vec(write(), 1..=max.max(1))
}

/// Text that is sometimes a number, sometimes not, sometimes absent.
pub fn maybe_numeric_text() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        3 => any::<i32>().prop_map(|n| Some(n.to_string())),
        1 => "[a-zA-Z]{1,8}".prop_map(Some),
        1 => Just(None),
    ]
}
