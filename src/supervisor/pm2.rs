//! pm2-backed supervisor
//!
//! Shells out to the `pm2` process manager. Argument lists are built by pure
//! functions so they can be checked without pm2 installed.

use crate::supervisor::{Supervisor, SupervisorError};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Output;
use tokio::process::Command;

/// Supervisor that drives a `pm2` executable
#[derive(Debug, Clone)]
pub struct Pm2 {
    program: String,
    /// Delete any existing process with the same name before starting
    single_instance: bool,
}

impl Pm2 {
    pub fn new() -> Self {
        Self {
            program: "pm2".to_string(),
            single_instance: true,
        }
    }

    /// Uses a different pm2 executable (for example an absolute path)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn allow_multiple_instances(mut self) -> Self {
        self.single_instance = false;
        self
    }

    async fn exec(&self, args: &[String]) -> Result<Output, SupervisorError> {
        tracing::debug!("Running {} {}", self.program, args.join(" "));

        Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SupervisorError::NotInstalled(self.program.clone()),
                _ => SupervisorError::Io(e),
            })
    }

    async fn exec_checked(&self, args: &[String]) -> Result<Output, SupervisorError> {
        let output = self.exec(args).await?;
        if output.status.success() {
            return Ok(output);
        }

        Err(SupervisorError::CommandFailed {
            command: format!("{} {}", self.program, args.join(" ")),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Default for Pm2 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Supervisor for Pm2 {
    async fn start(&self, name: &str, command: &[String]) -> Result<(), SupervisorError> {
        if self.single_instance {
            // Absent process is fine here
            let _ = self.exec(&delete_args(name)).await?;
        }

        self.exec_checked(&start_args(name, command)?).await?;
        self.exec_checked(&save_args()).await?;
        tracing::info!("Started {} under pm2", name);
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        self.exec_checked(&stop_args(name)).await?;
        tracing::info!("Stopped {}", name);
        Ok(())
    }

    async fn restart(&self, name: &str) -> Result<(), SupervisorError> {
        self.exec_checked(&restart_args(name)).await?;
        self.exec_checked(&save_args()).await?;
        tracing::info!("Restarted {} with updated environment", name);
        Ok(())
    }

    async fn is_running(&self, name: &str) -> Result<bool, SupervisorError> {
        let output = self.exec_checked(&["jlist".to_string()]).await?;
        let listing = String::from_utf8_lossy(&output.stdout);
        parse_is_running(&listing, name)
    }
}

fn delete_args(name: &str) -> Vec<String> {
    vec!["delete".to_string(), name.to_string()]
}

/// `pm2 start <program> --name <name> --interpreter none --update-env -f -- <args>`
fn start_args(name: &str, command: &[String]) -> Result<Vec<String>, SupervisorError> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| SupervisorError::InvalidCommand("empty command".to_string()))?;

    let mut args = vec![
        "start".to_string(),
        program.clone(),
        "--name".to_string(),
        name.to_string(),
        "--interpreter".to_string(),
        "none".to_string(),
        "--update-env".to_string(),
        "-f".to_string(),
    ];
    if !rest.is_empty() {
        args.push("--".to_string());
        args.extend(rest.iter().cloned());
    }
    Ok(args)
}

fn stop_args(name: &str) -> Vec<String> {
    vec!["stop".to_string(), name.to_string()]
}

fn restart_args(name: &str) -> Vec<String> {
    vec![
        "restart".to_string(),
        name.to_string(),
        "--update-env".to_string(),
    ]
}

fn save_args() -> Vec<String> {
    vec!["save".to_string()]
}

#[derive(Debug, Deserialize)]
struct Pm2Process {
    name: String,
    #[serde(default)]
    pm2_env: Option<Pm2Env>,
}

#[derive(Debug, Deserialize)]
struct Pm2Env {
    #[serde(default)]
    status: String,
}

/// Reads `pm2 jlist` output and reports whether `name` is online
fn parse_is_running(listing: &str, name: &str) -> Result<bool, SupervisorError> {
    let processes: Vec<Pm2Process> = serde_json::from_str(listing.trim())?;
    Ok(processes.iter().any(|p| {
        p.name == name
            && p
                .pm2_env
                .as_ref()
                .map(|env| env.status == "online")
                .unwrap_or(false)
    }))
}
