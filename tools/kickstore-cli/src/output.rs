//! Output formatting for the CLI.

use console::style;
use kickstore_commerce::checkout::OrderStatus;
use kickstore_commerce::payment::PaymentStatus;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a step in a process.
    pub fn step(&self, num: usize, total: usize, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style(format!("[{}/{}]", num, total)).dim(), msg);
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(&self, item: &str) {
        if self.json {
            return;
        }
        println!("  {} {}", style("•").dim(), item);
    }

    /// Print a table row.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        println!("  {}", format_row(cols, widths));
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

fn format_row(cols: &[&str], widths: &[usize]) -> String {
    cols.iter()
        .zip(widths.iter())
        .map(|(col, width)| format!("{:width$}", col, width = width))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Colored order status.
pub fn order_badge(status: OrderStatus) -> String {
    let label = status.display_name();
    match status {
        OrderStatus::Delivered | OrderStatus::Processing => style(label).green().to_string(),
        OrderStatus::Pending | OrderStatus::Shipped => style(label).yellow().to_string(),
        OrderStatus::Cancelled => style(label).red().to_string(),
    }
}

/// Colored payment status.
pub fn payment_badge(status: PaymentStatus) -> String {
    let label = status.as_str();
    match status {
        PaymentStatus::Approved => style(label).green().to_string(),
        PaymentStatus::Pending => style(label).yellow().to_string(),
        PaymentStatus::Declined | PaymentStatus::Expired => style(label).red().to_string(),
        PaymentStatus::Cancelled => style(label).dim().to_string(),
    }
}
