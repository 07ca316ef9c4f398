pub mod backtest_handler;

pub use backtest_handler::{router, ApiError, SharedStore};
