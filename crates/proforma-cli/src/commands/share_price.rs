use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use proforma_core::valuation::dcf::share_price;

/// Arguments for the EV-to-equity bridge
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SharePriceArgs {
    /// Enterprise value
    #[arg(long)]
    pub enterprise_value: Decimal,

    /// Net debt (debt less cash and short-term investments)
    #[arg(long)]
    pub net_debt: Decimal,

    /// Shares outstanding
    #[arg(long)]
    pub shares: Decimal,
}

pub fn run_share_price(args: SharePriceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let price = share_price(args.enterprise_value, args.net_debt, args.shares)?;
    Ok(json!({
        "result": {
            "share_price": price,
            "equity_value": args.enterprise_value - args.net_debt,
            "enterprise_value": args.enterprise_value,
            "net_debt": args.net_debt,
            "shares_outstanding": args.shares,
        },
        "methodology": "Equity value per share: (EV - net debt) / shares",
        "warnings": [],
    }))
}
