// 🖨️ Terminal messages
// Every command outcome (and every MacvenError) becomes one block of text here.

use crate::commands::{LookupOutcome, RefreshOutcome};
use crate::error::MacvenError;
use crate::normalizer::ACCEPTED_FORMATS;
use chrono::Duration;
use colored::Colorize;
use std::path::Path;

/// "12.5 mins" / "3.2 hours", truncated to one decimal
pub fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    if secs < 3600 {
        let tenths = secs * 10 / 60;
        format!("{}.{} mins", tenths / 10, tenths % 10)
    } else {
        let tenths = secs * 10 / 3600;
        format!("{}.{} hours", tenths / 10, tenths % 10)
    }
}

fn age_phrase(age: Option<Duration>) -> String {
    match age {
        Some(age) => format!("{} ago", format_age(age)),
        None => "never".to_string(),
    }
}

pub fn help_text() -> String {
    let formats = ACCEPTED_FORMATS.join(", ");
    format!(
        "\n{}\n\
         Resolve MAC address prefixes to vendor names using the IEEE OUI registry.\n\n\
         {} :\n  \
         > Downloads the registry and saves it to the configured store (csv_path).\n  \
         > Will NOT update if the store was refreshed within the last 24 hours.\n\n\
         {} :\n  \
         > Returns the vendor for the given MAC address.\n  \
         > Accepts all common formats (eg. {})\n  \
         > Accepts both full MAC addresses and the first six chars.\n",
        "macven".red().bold(),
        "macven -u".bold(),
        "macven <MAC address>".bold(),
        formats
    )
}

pub fn extraneous_warning() -> String {
    format!(
        "\n{}{}\n",
        "EXTRANEOUS ARGUMENT(S) - ".yellow().bold(),
        "Enter \"macven\" to see list of commands.".yellow()
    )
}

pub fn refresh_success(outcome: &RefreshOutcome) -> String {
    let mut out = format!(
        "\n{}{}\n",
        "RETRIEVAL COMPLETE - ".green().bold(),
        format!(
            "{} records saved to {}.",
            outcome.records,
            outcome.store_path.display()
        )
        .green()
    );

    if !outcome.anomalies.is_empty() {
        out.push_str(&format!(
            "{}\n",
            format!(
                "  > {} malformed registry row(s) skipped (first at line {}).",
                outcome.anomalies.len(),
                outcome.anomalies[0].line
            )
            .yellow()
        ));
    }
    if outcome.discarded > 0 {
        out.push_str(&format!(
            "{}\n",
            format!(
                "  > {} record(s) without a vendor name dropped.",
                outcome.discarded
            )
            .yellow()
        ));
    }
    out
}

pub fn lookup_success(outcome: &LookupOutcome) -> String {
    let width = outcome
        .variants
        .iter()
        .map(|v| v.text.len())
        .max()
        .unwrap_or(0)
        .max("Variation".len());

    let mut out = format!(
        "\n{}{}{}{}\n\n",
        "SUCCESS - ".green().bold(),
        "MAC address ".green(),
        outcome.input.underline(),
        " found.".green()
    );
    out.push_str(&format!("{:<width$} ┃ Vendor\n", "Variation", width = width));
    out.push_str(&format!(
        "{}╋{}\n",
        "━".repeat(width + 1),
        "━".repeat(outcome.record.vendor_name.chars().count().max(6) + 1)
    ));
    for variant in &outcome.variants {
        out.push_str(&format!(
            "{:<width$} ┃ {}\n",
            variant.text,
            outcome.record.vendor_name,
            width = width
        ));
    }
    if let Some(address) = &outcome.record.address {
        out.push_str(&format!("\n{}\n", address.dimmed()));
    }
    out.push_str(&format!(
        "{}\n",
        format!(
            "{} last updated {}.",
            outcome.store_path.display(),
            age_phrase(outcome.data_age)
        )
        .cyan()
    ));
    out
}

/// Message for a failed command; `input` is the MAC argument when there was one
pub fn error_message(err: &MacvenError, input: Option<&str>, store_path: &Path) -> String {
    let input = input.unwrap_or("");
    match err {
        MacvenError::InvalidInput { reason, .. } => format!(
            "\n{}{}{}{}\n  > {}.\n  > macven accepts all common formats (eg. {})\n  > macven accepts both full MAC addresses and the first six chars.\n",
            "INVALID INPUT - ".red().bold(),
            "Inputted MAC address ".red(),
            input.underline(),
            " produced an error.".red(),
            reason,
            ACCEPTED_FORMATS.join(", ")
        ),
        MacvenError::NotFound { prefix, data_age } => format!(
            "\n{}{}{}{}\n  > No vendor is registered for prefix {}.\n  > The data may be stale: {} was last updated {}.\n  > Check input, you inputted {}.\n",
            "NOT FOUND - ".red().bold(),
            "Inputted MAC address ".red(),
            input.underline(),
            " produced no match.".red(),
            prefix,
            store_path.display(),
            age_phrase(*data_age),
            input.underline()
        ),
        MacvenError::Network { url, reason } => format!(
            "\n{}{}\n  > {}\n  > Check network connection.\n",
            "NETWORK ERROR - ".red().bold(),
            format!("bad response from {}", url).red(),
            reason
        ),
        MacvenError::CooldownActive { elapsed, remaining } => format!(
            "\n{}{}\n",
            "DATA NOT MATURE - ".yellow().bold(),
            format!(
                "{} was updated {} ago. Wait {} before refreshing again.",
                store_path.display(),
                format_age(*elapsed),
                format_age(*remaining)
            )
            .yellow()
        ),
        MacvenError::ConcurrentWriteConflict { path } => format!(
            "\n{}{}\n  > Registry data may have been saved, but the refresh time was not recorded.\n  > Try again in a bit.\n  > Check existing cron jobs.\n",
            "CONCURRENT WRITE ATTEMPT - ".red().bold(),
            format!("{} was being written at the same time.", path.display()).red()
        ),
        MacvenError::StoreMissing { path } => format!(
            "\n{}{}\n  > Run \"macven -u\" to download the registry first.\n",
            "NO LOCAL DATA - ".yellow().bold(),
            format!("{} does not exist yet.", path.display()).yellow()
        ),
        other => format!("\n{}{}\n", "ERROR - ".red().bold(), other.to_string().red()),
    }
}
