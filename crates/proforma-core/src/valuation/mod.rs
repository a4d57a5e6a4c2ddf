pub mod dcf;
pub mod discount_rate;
