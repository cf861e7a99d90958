use std::fmt::{self, Write};

use super::SimulateResponse;

const BAR_WIDTH: u64 = 40;

pub fn render_text_report(response: &SimulateResponse) -> String {
    let mut out = String::new();
    write_report(&mut out, response).expect("writing to a String cannot fail");
    out
}

fn write_report(out: &mut impl Write, response: &SimulateResponse) -> fmt::Result {
    let params = &response.params;
    let start = params.starting_wealth;

    writeln!(
        out,
        "Investment growth simulation: {} trials x {} months (seed {})",
        params.trial_count, params.periods, response.seed
    )?;
    writeln!(
        out,
        "Monthly return {:.2}%, volatility {:.2}%, starting money {}",
        params.mean_return * 100.0,
        params.volatility * 100.0,
        money(start)
    )?;

    writeln!(out, "\nSummary Statistics")?;
    let summary = &response.summary;
    for (label, value) in [
        ("Mean Final Amount", summary.mean),
        ("Median Final Amount", summary.median),
        ("Standard Deviation", summary.standard_deviation),
        ("Minimum", summary.minimum),
        ("Maximum", summary.maximum),
        ("10th Percentile", response.percentiles.p10),
        ("90th Percentile", response.percentiles.p90),
    ] {
        writeln!(out, "  {label:<22}{:>16}", money(value))?;
    }
    writeln!(
        out,
        "  {:<22}{:>15.1}%",
        "Probability of Loss",
        response.probability_of_loss * 100.0
    )?;

    writeln!(
        out,
        "\nDistribution of Final Amounts after {} Months",
        params.periods
    )?;
    let hist = &response.histogram;
    let peak = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    for (i, &count) in hist.counts.iter().enumerate() {
        let lo = hist.bin_edges[i];
        let hi = hist.bin_edges[i + 1];
        let bar = "#".repeat((count * BAR_WIDTH / peak) as usize);
        let marker = if lo <= start && start < hi { " <- start" } else { "" };
        writeln!(
            out,
            "  {:>14} .. {:<14}{count:>7} {bar}{marker}",
            money(lo),
            money(hi)
        )?;
    }

    writeln!(out, "\nSample Investment Path (Last Simulation)")?;
    for (month, wealth) in response.sample_path.iter().enumerate() {
        let marker = if *wealth < start { " (below start)" } else { "" };
        writeln!(out, "  month {month:>4}  {:>16}{marker}", money(*wealth))?;
    }

    Ok(())
}

fn money(value: f64) -> String {
    format!("${value:.2}")
}
