use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Local;
use taskhub_shared::{Session, Task, TaskChange};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;

pub const COLOR_KEY: &str = "color";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get(COLOR_KEY).unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn print_task_table(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }
        write_table(&mut out, task_headers(), self.task_rows(tasks))?;
        Ok(())
    }

    pub fn print_change(&self, change: &TaskChange) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let (label, code) = match change {
            TaskChange::Inserted(_) => ("inserted", "32"),
            TaskChange::Updated(_) => ("updated", "33"),
            TaskChange::Deleted { .. } => ("deleted", "31"),
        };
        writeln!(out, "{} task {}", self.paint(label, code), change.task_id())?;
        Ok(())
    }

    pub fn print_session(&self, session: &Session) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Signed in as {}", self.paint(session.email(), "36"))?;
        Ok(())
    }

    pub fn print_notice(&self, text: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", self.paint(text, "32"))?;
        Ok(())
    }

    fn task_rows(&self, tasks: &[Task]) -> Vec<Vec<String>> {
        tasks
            .iter()
            .map(|task| {
                let created = task
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string();
                let image = task
                    .image_url
                    .as_deref()
                    .map(|_| self.paint("yes", "36"))
                    .unwrap_or_default();

                vec![
                    self.paint(&task.id.to_string(), "33"),
                    created,
                    task.title.clone(),
                    task.description.clone(),
                    task.email.clone(),
                    image,
                ]
            })
            .collect()
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn task_headers() -> Vec<String> {
    ["ID", "Created", "Title", "Description", "Owner", "Image"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h)).collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ", width = *width)?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let padding = width.saturating_sub(visible_width(cell));
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }
        if ch == '\x1b' {
            escaped = true;
            continue;
        }
        out.push(ch);
    }

    out
}
