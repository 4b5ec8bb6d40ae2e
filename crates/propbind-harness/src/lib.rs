#![forbid(unsafe_code)]

//! Reference fixtures for exercising propbind.
//!
//! - [`BindingTestObject`]: a change-notifying endpoint with numeric, text,
//!   read-only, and panicking properties.
//! - [`TextToNumberConverter`]: `Option<String>` ↔ `i32`, failing on text
//!   that is not a number. [`NumberToTextConverter`] is the same pair with
//!   the sides swapped.
//! - [`CountingDispatcher`]: an inline dispatcher that counts hand-offs and
//!   records the threads it ran on.
//! - [`LogCapture`]: a `tracing` layer that records events and span names for
//!   assertions.
//! - [`strategies`]: `proptest` strategies for write sequences.

pub mod capture;
pub mod converter;
pub mod dispatch;
pub mod fixture;
pub mod strategies;

pub use capture::{CapturedEvent, LogCapture};
pub use converter::{NumberToTextConverter, TextToNumberConverter};
pub use dispatch::CountingDispatcher;
pub use fixture::{BindingTestObject, FRAGILE_PANIC};
