//! Console output for the analysis results

use crate::pipeline::{AnalysisReport, NamedItemSales, NamedRule};

/// Confidence-style ratio as a rounded whole percentage, e.g. `0.667 -> "67%"`
///
/// Halves round to the even neighbour, so `0.125` prints as `12%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", (value * 100.0).round_ties_even() as i64)
}

fn format_names(names: &[String]) -> String {
    format!("[{}]", names.join(", "))
}

/// Print the best-selling items with their total amount
pub fn print_top_items(items: &[NamedItemSales]) {
    println!("Top {} best-selling items (by total amount):", items.len());
    if items.is_empty() {
        println!("  (no items in the selected period)");
        return;
    }

    let width = items
        .iter()
        .map(|item| item.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Item".len());
    println!("  {:>3} | {:<width$} | {:>10}", "#", "Item", "Amount");
    println!("  {}", "-".repeat(width + 19));
    for (rank, item) in items.iter().enumerate() {
        println!(
            "  {:>3} | {:<width$} | {:>10.2}",
            rank + 1,
            item.name,
            item.amount
        );
    }
}

/// Print the ranked rules with confidence as a whole percentage
pub fn print_rules(rules: &[NamedRule]) {
    println!("\nItem suggestions (if a basket holds the left side, suggest the right side):");
    if rules.is_empty() {
        println!("  (no rules met the support and confidence thresholds)");
        return;
    }

    for named in rules {
        println!(
            "  {} -> {}  confidence {}  lift {:.2}  support {:.3}",
            format_names(&named.antecedent_names),
            format_names(&named.consequent_names),
            format_percent(named.rule.confidence),
            named.rule.lift,
            named.rule.support
        );
    }
}

/// Print the full report: top sellers, mining summary and rules
pub fn print_report(report: &AnalysisReport) {
    print_top_items(&report.top_items);

    println!("\n=== Frequent Itemsets ===");
    println!("Transactions analysed: {}", report.n_transactions);
    println!("Frequent itemsets: {}", report.itemsets.len());
    for size in 1..=report.itemsets.max_size() {
        println!("  size {}: {}", size, report.itemsets.of_size(size).count());
    }

    print_rules(&report.rules);
}
