use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::board::{column_length, ColumnSet, COLUMNS};
use crate::oracle::{sum_probability, CombinationOdds, RollOdds};
use crate::stats::{MatchupReport, SoloReport, Summary, WinRateMatrix};
use crate::strategy::PolicySpec;

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

pub fn success_bar(p: f64, width: usize) -> String {
    let filled = ((p.clamp(0.0, 1.0)) * width as f64) as usize;
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    let label = pct(p);

    if p >= 0.8 {
        format!("{} {}", bar.green(), label)
    } else if p >= 0.6 {
        format!("{} {}", bar.yellow(), label)
    } else {
        format!("{} {}", bar.red(), label)
    }
}

pub fn odds_table(active: ColumnSet, blocked: ColumnSet, odds: &RollOdds, enumerated: f64) -> String {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Metric").set_alignment(CellAlignment::Left),
        Cell::new("Value").set_alignment(CellAlignment::Right),
    ]);

    let rows = [
        ("Runners", active.to_string()),
        ("Blocked", blocked.to_string()),
        ("P(success)", pct(odds.success)),
        ("P(bust)", pct(odds.bust())),
        ("Enumerated success", pct(enumerated)),
        ("Q (steps per roll)", format!("{:.3}", odds.expected_progress)),
        ("Clean move", pct(odds.clean)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label.bold().to_string()), right(value)]);
    }
    table.to_string()
}

pub fn combos_table(rows: &[CombinationOdds], limit: usize) -> String {
    let mut table = new_table();
    table.set_header(vec!["#", "Columns", "Success", "Bust", "Clean", "Q"]);
    for (i, row) in rows.iter().take(limit).enumerate() {
        table.add_row(vec![
            right((i + 1).to_string()),
            Cell::new(row.columns.to_string()),
            Cell::new(success_bar(row.success, 20)),
            right(pct(row.bust)),
            right(pct(row.clean)),
            right(format!("{:.2}", row.expected_progress)),
        ]);
    }
    table.to_string()
}

pub fn sums_table() -> String {
    let mut table = new_table();
    table.set_header(vec!["Column", "Length", "P(sum on a roll)"]);
    for &c in COLUMNS.iter() {
        table.add_row(vec![
            right(c.to_string()),
            right(column_length(c).to_string()),
            Cell::new(success_bar(sum_probability(c), 20)),
        ]);
    }
    table.to_string()
}

pub fn policies_table(specs: &[PolicySpec]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Spec", "Pairing", "Stop"]);
    for spec in specs {
        table.add_row(vec![
            Cell::new(spec.name.bold().to_string()),
            Cell::new(format!("{:?}", spec.pairing)),
            Cell::new(format!("{:?}", spec.stop)),
        ]);
    }
    table.to_string()
}

fn summary_row(label: &str, s: &Summary) -> Vec<Cell> {
    if s.count == 0 {
        return vec![Cell::new(label), right("-".into()), right("0".into())];
    }
    vec![
        Cell::new(label),
        right(format!("{:.2}", s.mean)),
        right(s.count.to_string()),
        right(format!("{:.1}", s.median)),
        right(format!("{:.2}", s.std_dev)),
        right(format!("{:.0}", s.p10)),
        right(format!("{:.0}", s.p90)),
        right(format!("{:.0}-{:.0}", s.min, s.max)),
    ]
}

fn summary_header() -> Vec<&'static str> {
    vec!["", "Mean", "n", "Median", "Std", "p10", "p90", "Range"]
}

pub fn solo_table(report: &SoloReport) -> String {
    let mut table = new_table();
    table.set_header(summary_header());
    table.add_row(summary_row("Turns to 1 column", &report.turns_to_1));
    table.add_row(summary_row("Turns to 2 columns", &report.turns_to_2));
    table.add_row(summary_row("Turns to 3 columns", &report.turns_to_3));
    table.add_row(summary_row("Turns played", &report.turns));
    table.add_row(summary_row("Rolls", &report.rolls));
    table.add_row(summary_row("Busts", &report.busts));

    let mut usage = new_table();
    usage.set_header(vec!["Column", "Commits"]);
    for (c, n) in &report.column_usage {
        usage.add_row(vec![right(c.to_string()), right(n.to_string())]);
    }

    format!(
        "  {}: reached {} column(s) in {}/{} runs\n{}\n{}",
        report.policy.bold(),
        report.target_columns,
        report.reached_target,
        report.trials,
        table,
        usage
    )
}

pub fn matchup_table(report: &MatchupReport) -> String {
    let mut table = new_table();
    table.set_header(summary_header());
    table.add_row(summary_row("Turns", &report.turns));
    table.add_row(summary_row(&format!("Columns ({})", report.first), &report.completed[0]));
    table.add_row(summary_row(&format!("Columns ({})", report.second), &report.completed[1]));
    table.add_row(summary_row(&format!("Busts ({})", report.first), &report.busts[0]));
    table.add_row(summary_row(&format!("Busts ({})", report.second), &report.busts[1]));

    format!(
        "  {} vs {}: {} - {} over {} games ({} settled at the turn cap)\n  First mover {}\n{}",
        report.first.bold(),
        report.second.bold(),
        report.wins[0],
        report.wins[1],
        report.games,
        report.turn_capped,
        success_bar(report.first_win_rate, 30),
        table
    )
}

pub fn matrix_table(matrix: &WinRateMatrix) -> String {
    let mut table = new_table();
    let mut header = vec![Cell::new("first \\ second")];
    for (j, _) in matrix.policies.iter().enumerate() {
        header.push(Cell::new(format!("#{}", j + 1)).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    for (i, name) in matrix.policies.iter().enumerate() {
        let mut row = vec![Cell::new(format!("#{} {}", i + 1, name).bold().to_string())];
        for j in 0..matrix.policies.len() {
            let rate = matrix.rate(i, j).unwrap_or(0.0);
            let text = format!("{:.0}", rate * 100.0);
            let styled = if rate >= 0.55 {
                text.green().to_string()
            } else if rate <= 0.45 {
                text.red().to_string()
            } else {
                text
            };
            row.push(right(styled));
        }
        table.add_row(row);
    }

    let mut ranking = new_table();
    ranking.set_header(vec!["Rank", "Policy", "Overall"]);
    for (k, (name, rate)) in matrix.ranking().iter().enumerate() {
        ranking.add_row(vec![
            right((k + 1).to_string()),
            Cell::new(name),
            Cell::new(success_bar(*rate, 20)),
        ]);
    }

    format!("{}\n{}", table, ranking)
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}
