//! Debtor display formatting

use crate::ledger::{Amount, Debtor};

/// Format debtors with balances as a table, with a total row
pub fn format_debtor_list(debtors: &[Debtor]) -> String {
    if debtors.is_empty() {
        return "No debtors found.".to_string();
    }

    let name_width = debtors
        .iter()
        .map(|d| d.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(5);

    let mut output = String::new();
    output.push_str(&format!(
        "{:>5}  {:<name_width$}  {:>12}  {}\n",
        "ID",
        "Name",
        "Balance",
        "Phone",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:->5}  {:-<name_width$}  {:->12}  {:-<10}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for debtor in debtors {
        output.push_str(&format!(
            "{:>5}  {:<name_width$}  {:>12}  {}\n",
            debtor.id,
            debtor.name,
            debtor.balance.to_string(),
            debtor.phone_numbers.first().map(String::as_str).unwrap_or(""),
            name_width = name_width,
        ));
    }

    let total: Amount = debtors.iter().map(|d| d.balance).sum();
    output.push_str(&format!(
        "{:>5}  {:<name_width$}  {:>12}\n",
        "",
        "TOTAL",
        total.to_string(),
        name_width = name_width,
    ));

    output
}

/// Format a single debtor's details
pub fn format_debtor_details(debtor: &Debtor) -> String {
    let mut output = String::new();

    output.push_str(&format!("Debtor: {}\n", debtor.name));
    output.push_str(&format!("  ID:       {}\n", debtor.id));
    output.push_str(&format!("  Balance:  {}\n", debtor.balance));

    if debtor.phone_numbers.is_empty() {
        output.push_str("  Phone:    (none)\n");
    } else {
        for (i, phone) in debtor.phone_numbers.iter().enumerate() {
            let label = if i == 0 { "Phone:" } else { "" };
            output.push_str(&format!("  {:<9} {}\n", label, phone));
        }
    }

    if let Some(created) = &debtor.created_at {
        output.push_str(&format!("  Created:  {}\n", created));
    }
    if let Some(updated) = &debtor.updated_at {
        output.push_str(&format!("  Updated:  {}\n", updated));
    }

    output
}
