pub mod alert;

pub use alert::{Alert, AlertError, Condition, TradingPair, evaluate, parse_threshold};
