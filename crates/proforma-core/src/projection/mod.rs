pub mod balance_sheet;
pub mod free_cash_flow;
pub mod income_statement;
