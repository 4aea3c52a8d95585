//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (see the snapshot tests below)

use crate::fit::SamplerState;
use crate::report::ParameterSummary;

/// Format the full run summary (data + sampler configuration + diagnostics).
pub fn format_run_summary(label: &str, state: &SamplerState) -> String {
    let mut out = String::new();
    let info = &state.info;

    out.push_str("=== sedfit - Synchrotron + IC SED fit ===\n");
    out.push_str(&format!("Label: {label}\n"));
    let n_ul = state.data.rows().iter().filter(|r| r.ul).count();
    out.push_str(&format!(
        "Data: n={} ({n_ul} upper limits) | {} flux in {} | cl={}\n",
        state.data.len(),
        if state.data.is_sed() { "SED" } else { "differential" },
        state.data.flux_unit(),
        state.data.cl(),
    ));
    out.push_str(&format!(
        "Sampler: walkers={} burn={} run={} threads={} seed={}\n",
        info.n_walkers, info.n_burn, info.n_run, info.threads, info.seed
    ));
    out.push_str(&format!(
        "Time: {} -> {}\n",
        info.started.format("%Y-%m-%d %H:%M:%S"),
        info.finished.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("p0: {}\n", fmt_vec(&info.p0)));
    out.push_str(&format!("Burn-in median: {}\n", fmt_vec(&info.p0_burn_median)));

    out.push_str("\nDiagnostics:\n");
    out.push_str(&format!("- acceptance fraction: {:.3}\n", state.mean_acceptance_fraction()));
    let tau = state.chain.autocorr_time();
    if tau.is_empty() {
        out.push_str("- autocorrelation time: n/a (fewer than 10 steps)\n");
    } else {
        out.push_str(&format!("- autocorrelation time: {}\n", fmt_vec(&tau)));
    }
    match state.chain.max_ln_prob() {
        Some(ml) => {
            out.push_str(&format!("- max ln-likelihood: {:.3}\n", ml.ln_prob));
            out.push_str("- ML parameters:\n");
            for (name, value) in state.labels.iter().zip(&ml.params) {
                out.push_str(&format!("    {name:<16} {value:.6e}\n"));
            }
        }
        None => out.push_str("- max ln-likelihood: none (no finite samples)\n"),
    }
    out.push('\n');

    out
}

/// Format the posterior summary table.
pub fn format_results_table(rows: &[ParameterSummary]) -> String {
    let mut out = String::new();
    out.push_str("Posterior (median, 16th/84th percentiles):\n");
    out.push_str(
        format!("{:<16} {:>13} {:>13} {:>13}", "label", "median", "unc_lo", "unc_hi")
            .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<13} {:-<13} {:-<13}", "", "", "", "").trim_end());
    out.push('\n');
    for r in rows {
        out.push_str(&format!(
            "{:<16} {:>13.6e} {:>13.6e} {:>13.6e}\n",
            truncate(&r.label, 16),
            r.median,
            r.unc_lo,
            r.unc_hi
        ));
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('.');
    out
}
