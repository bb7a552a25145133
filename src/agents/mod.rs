//! Tool handlers the router can dispatch to: a safe calculator, a weather
//! lookup, a web search, and a persistent TODO list. Each tool owns its own
//! input normalization and returns display-ready text.

pub mod calculator;
pub mod todo;
pub mod weather;
pub mod websearch;
