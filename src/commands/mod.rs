pub mod reindex;
pub mod status;
pub mod sync;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    /// Plain `key=value` rendering for terminals.
    pub fn to_text(&self) -> String {
        let mut out = format!("command={}\nok={}\n", self.command, self.ok);
        for detail in &self.details {
            out.push_str(detail);
            out.push('\n');
        }
        for issue in &self.issues {
            out.push_str(&format!("issue={issue}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_flip_ok_and_render_last() {
        let mut report = CommandReport::new("sync");
        report.detail("channels=dev");
        assert!(report.ok);
        report.issue("channel ops failed");
        assert!(!report.ok);
        assert_eq!(
            report.to_text(),
            "command=sync\nok=false\nchannels=dev\nissue=channel ops failed\n"
        );
    }
}
