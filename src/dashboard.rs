//! Text rendering of a finished consultation.

use crate::types::{DebtCategory, DebtItem, VehicleConsultation};
use std::fmt;

const BAR_WIDTH: usize = 30;
const TOP_DEBTS: usize = 5;
const MAX_DESCRIPTION: usize = 40;

/// Brazilian real, e.g. `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let units = (cents / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}

/// Per-category sums, in the order each category first appears.
pub fn category_breakdown(items: &[DebtItem]) -> Vec<(DebtCategory, f64)> {
    let mut breakdown: Vec<(DebtCategory, f64)> = Vec::new();
    for item in items {
        match breakdown.iter_mut().find(|(c, _)| *c == item.category) {
            Some((_, sum)) => *sum += item.value,
            None => breakdown.push((item.category, item.value)),
        }
    }
    breakdown
}

/// The `n` largest items by value; ties keep their original order.
pub fn top_debts(items: &[DebtItem], n: usize) -> Vec<&DebtItem> {
    let mut sorted: Vec<&DebtItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(n);
    sorted
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.min(BAR_WIDTH))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

pub struct Dashboard<'a>(pub &'a VehicleConsultation);

impl fmt::Display for Dashboard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.0;
        writeln!(f, "TOTAL DEBTS   {}", format_brl(c.total_debts))?;
        writeln!(f, "              sum of every open item")?;
        writeln!(
            f,
            "VEHICLE       {}  [{}]",
            c.vehicle_model.as_deref().unwrap_or("N/A"),
            c.plate
        )?;
        writeln!(
            f,
            "OWNER         {}",
            c.owner_name.as_deref().unwrap_or("Not identified")
        )?;
        writeln!(
            f,
            "CONSULTED     {}",
            c.consulted_at.format("%d/%m/%Y %H:%M UTC")
        )?;

        if c.items.is_empty() {
            writeln!(f)?;
            return writeln!(f, "No open debts on record.");
        }

        writeln!(f)?;
        writeln!(f, "BY CATEGORY")?;
        let breakdown = category_breakdown(&c.items);
        let largest = breakdown.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        for (category, sum) in &breakdown {
            let share = if c.total_debts > 0.0 {
                sum / c.total_debts * 100.0
            } else {
                0.0
            };
            writeln!(
                f,
                "  {:<14}{:>16} {:>5.1}%  {}",
                category.label(),
                format_brl(*sum),
                share,
                bar(*sum, largest)
            )?;
        }

        writeln!(f)?;
        writeln!(f, "LARGEST DEBTS")?;
        let top = top_debts(&c.items, TOP_DEBTS);
        let largest = top.first().map(|item| item.value).unwrap_or(0.0);
        for item in &top {
            writeln!(
                f,
                "  {:<30}{:>16}  {}",
                truncate(&item.description, 30),
                format_brl(item.value),
                bar(item.value, largest)
            )?;
        }

        writeln!(f)?;
        writeln!(f, "FULL BREAKDOWN")?;
        let width = c
            .items
            .iter()
            .map(|item| item.description.chars().count())
            .max()
            .unwrap_or(0)
            .max("DESCRIPTION".len())
            .min(MAX_DESCRIPTION);
        writeln!(
            f,
            "  {:<width$}  {:<14}  {:<10}  {:>16}",
            "DESCRIPTION",
            "CATEGORY",
            "DUE",
            "VALUE",
            width = width
        )?;
        for item in &c.items {
            writeln!(
                f,
                "  {:<width$}  {:<14}  {:<10}  {:>16}",
                truncate(&item.description, width),
                item.category.label(),
                item.due_date.as_deref().unwrap_or("--/--/----"),
                format_brl(item.value),
                width = width
            )?;
        }
        writeln!(
            f,
            "  {:>width$}  {:>16}",
            "TOTAL",
            format_brl(c.total_debts),
            width = width + 2 + 14 + 2 + 10
        )
    }
}
