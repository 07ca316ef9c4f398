pub mod backtest_client;
