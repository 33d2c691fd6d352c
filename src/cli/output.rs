//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::Task;
use crate::storage::OutputFormat;

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        if let Ok(json) = rendered {
            println!("{}", json);
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a header and a one-line-per-task table
    pub fn task_table<'a>(&self, heading: &str, tasks: impl IntoIterator<Item = &'a Task>) {
        println!("{}", heading);
        println!("{:<12} {:<12} {:<8} TITLE", "ID", "STATUS", "PRIORITY");
        println!("{}", "-".repeat(60));
        for task in tasks {
            println!(
                "{:<12} {:<12} {:<8} {}",
                task.id,
                task.status.as_str(),
                task.priority.as_str(),
                task.title
            );
        }
    }
}
