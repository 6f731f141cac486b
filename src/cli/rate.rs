use super::ui;
use crate::core::currency::CurrencyPair;
use crate::core::fx::{FxResult, FxService};
use anyhow::{Result, bail};
use comfy_table::Cell;
use futures::future::join_all;
use std::str::FromStr;

/// Parses pairs given either as single tokens (`USD/EUR`, `USDEUR`) or as
/// two consecutive codes (`USD EUR`).
pub fn parse_pairs(tokens: &[String]) -> Result<Vec<CurrencyPair>> {
    let mut pairs = Vec::new();
    let mut pending: Option<&str> = None;

    for token in tokens {
        let token = token.trim();
        if let Some(base) = pending.take() {
            pairs.push(CurrencyPair::new(base, token)?);
            continue;
        }
        if token.len() == 3 {
            pending = Some(token);
            continue;
        }
        pairs.push(CurrencyPair::from_str(token)?);
    }

    if let Some(base) = pending {
        bail!("Currency code '{base}' is missing its counterpart");
    }
    if pairs.is_empty() {
        bail!("No currency pairs given");
    }
    Ok(pairs)
}

pub fn display_rates(rows: &[(CurrencyPair, FxResult)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Provider"),
        ui::header_cell("As of"),
    ]);

    for (pair, result) in rows {
        let fallback = result.is_fallback();
        table.add_row(vec![
            Cell::new(pair.to_string()),
            ui::rate_cell(result.rate, fallback),
            ui::provider_cell(&result.provider, fallback),
            Cell::new(result.date.format("%Y-%m-%d").to_string()),
        ]);
    }

    let mut output = ui::style_text("Exchange rates", ui::StyleType::Title);
    output.push_str("\n\n");
    output.push_str(&table.to_string());

    if rows.iter().any(|(_, r)| r.is_fallback()) {
        output.push_str("\n\n");
        output.push_str(&ui::style_text(
            "Some rates are estimates: no live provider answered.",
            ui::StyleType::Warning,
        ));
    }
    output
}

pub async fn run(fx: &FxService, tokens: &[String]) -> Result<()> {
    let pairs = parse_pairs(tokens)?;

    let pb = ui::new_progress_bar(pairs.len() as u64, false);
    let lookups = pairs.iter().map(|pair| {
        let pb = pb.clone();
        async move {
            let result = fx.get_pair_rate(pair).await;
            pb.inc(1);
            (pair.clone(), result)
        }
    });
    let rows = join_all(lookups).await;
    pb.finish_and_clear();

    println!("{}", display_rates(&rows));
    Ok(())
}
