// Platewatch operator console
// Line commands read from stdin while a camera stream is running

use anyhow::Result;
use platewatch_eye::{CameraStatus, PlatePipeline};
use std::sync::Arc;
use tokio::sync::watch;

/// One parsed operator line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Correct(String),
    Status,
    Help,
    Quit,
}

impl OperatorCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "correct" | "c" => {
                if rest.is_empty() {
                    Err("Usage: correct <PLATE>".to_string())
                } else {
                    Ok(Self::Correct(rest.to_string()))
                }
            }
            "status" | "s" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("Unknown command: {} (type 'help')", other)),
        }
    }
}

pub enum CommandResult {
    Continue,
    Exit,
    Success(String),
    Error(String),
    Output(String),
}

pub struct OperatorConsole {
    pipeline: Arc<PlatePipeline>,
    camera_status: watch::Receiver<CameraStatus>,
}

impl OperatorConsole {
    pub fn new(pipeline: Arc<PlatePipeline>, camera_status: watch::Receiver<CameraStatus>) -> Self {
        Self {
            pipeline,
            camera_status,
        }
    }

    pub fn print_help(&self) {
        println!("Commands:");
        println!("  correct <PLATE>   replace the last committed plate");
        println!("  status            show camera, buffer and last record");
        println!("  help              show this help");
        println!("  quit              stop the stream");
    }

    pub async fn handle_line(&self, line: &str) -> Result<CommandResult> {
        if line.trim().is_empty() {
            return Ok(CommandResult::Continue);
        }
        let command = match OperatorCommand::parse(line) {
            Ok(command) => command,
            Err(msg) => return Ok(CommandResult::Error(msg)),
        };

        match command {
            OperatorCommand::Correct(plate) => match self.pipeline.manual_override(&plate).await {
                Ok(outcome) => {
                    let replaced = outcome.superseded.as_deref().unwrap_or("nothing");
                    let mut msg = format!(
                        "{} recorded (replaced {})",
                        outcome.record.plate_number, replaced
                    );
                    if !outcome.remote_ok {
                        msg.push_str(", store unreachable: kept in local log only");
                    }
                    Ok(CommandResult::Success(msg))
                }
                Err(e) => Ok(CommandResult::Error(e.to_string())),
            },
            OperatorCommand::Status => Ok(CommandResult::Output(self.status().await)),
            OperatorCommand::Help => {
                self.print_help();
                Ok(CommandResult::Continue)
            }
            OperatorCommand::Quit => Ok(CommandResult::Exit),
        }
    }

    async fn status(&self) -> String {
        let display = self.pipeline.display().await;
        let buffered = self.pipeline.buffered_plates().await;
        let camera = self.camera_status.borrow().clone();

        let mut out = String::new();
        out.push_str(&format!("Camera:  {:?}\n", camera));
        match &display.plate {
            Some(plate) => out.push_str(&format!(
                "Plate:   {}{}\nColor:   {}\nDist:    {:.1}m / {:.1}m\n",
                plate,
                if display.manual { " (M)" } else { "" },
                display.color.as_deref().unwrap_or("-"),
                display.distance_m,
                display.height_m
            )),
            None => out.push_str("Plate:   -\n"),
        }
        out.push_str(&format!("Buffer:  [{}]", buffered.join(", ")));
        out
    }

    pub fn render(result: CommandResult) -> bool {
        match result {
            CommandResult::Continue => {}
            CommandResult::Exit => return false,
            CommandResult::Success(msg) => println!("✅ {}", msg),
            CommandResult::Error(msg) => println!("❌ Error: {}", msg),
            CommandResult::Output(out) => println!("{}", out),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platewatch_core::Scope;
    use platewatch_eye::{
        Collaborators, PipelineConfig, RecordCommitter, ReplayCollaborators, ReplayScript,
    };
    use platewatch_storage::{BackupLog, MemoryStore};

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            OperatorCommand::parse("correct abd 123").unwrap(),
            OperatorCommand::Correct("abd 123".to_string())
        );
        assert_eq!(OperatorCommand::parse("  STATUS ").unwrap(), OperatorCommand::Status);
        assert_eq!(OperatorCommand::parse("q").unwrap(), OperatorCommand::Quit);
        assert!(OperatorCommand::parse("correct").is_err());
        assert!(OperatorCommand::parse("delete all").is_err());
    }

    #[tokio::test]
    async fn test_correct_command() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let scope = Scope::new("u1", "cam");
        let committer = RecordCommitter::new(
            scope.clone(),
            store.clone(),
            Arc::new(BackupLog::open(dir.path()).unwrap()),
            None,
        );
        let pipeline = Arc::new(
            PlatePipeline::new(
                PipelineConfig::default(),
                Collaborators::replay(ReplayCollaborators::new(ReplayScript::default())),
                committer,
            )
            .unwrap(),
        );
        let (_tx, rx) = watch::channel(CameraStatus::Streaming);
        let console = OperatorConsole::new(pipeline, rx);

        match console.handle_line("correct wwa 1234").await.unwrap() {
            CommandResult::Success(msg) => assert!(msg.starts_with("WWA1234")),
            _ => panic!("expected success"),
        }
        assert_eq!(store.keys(&scope), vec!["WWA1234".to_string()]);

        match console.handle_line("status").await.unwrap() {
            CommandResult::Output(out) => assert!(out.contains("WWA1234 (M)")),
            _ => panic!("expected status output"),
        }
        assert!(matches!(
            console.handle_line("quit").await.unwrap(),
            CommandResult::Exit
        ));
    }
}
