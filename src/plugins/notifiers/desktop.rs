use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::NotificationsConfig;
use crate::models::AlertEvent;
use crate::plugins::traits::{NotificationResult, NotifierPlugin};
use crate::utils::error::AppError;

const TOAST_TITLE: &str = "Ticket Watcher";

/// Which desktop channels fire for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopOptions {
    pub sound: bool,
    pub toast: bool,
    pub speech: bool,
}

impl DesktopOptions {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self {
            sound: config.sound,
            toast: config.desktop,
            speech: config.speech,
        }
    }
}

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl AlertCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Host-specific commands for each alert channel.
pub trait PlatformAlerter: Send + Sync {
    fn platform(&self) -> &'static str;
    fn sound(&self) -> AlertCommand;
    fn toast(&self, title: &str, body: &str) -> AlertCommand;
    fn speech(&self, text: &str) -> AlertCommand;
}

pub struct LinuxAlerter;

impl PlatformAlerter for LinuxAlerter {
    fn platform(&self) -> &'static str {
        "linux"
    }

    fn sound(&self) -> AlertCommand {
        AlertCommand::new("paplay", ["/usr/share/sounds/freedesktop/stereo/complete.oga"])
    }

    fn toast(&self, title: &str, body: &str) -> AlertCommand {
        AlertCommand::new("notify-send", ["--expire-time=10000", title, body])
    }

    fn speech(&self, text: &str) -> AlertCommand {
        AlertCommand::new("spd-say", [text])
    }
}

pub struct MacAlerter;

impl PlatformAlerter for MacAlerter {
    fn platform(&self) -> &'static str {
        "macos"
    }

    fn sound(&self) -> AlertCommand {
        AlertCommand::new("afplay", ["/System/Library/Sounds/Glass.aiff"])
    }

    fn toast(&self, title: &str, body: &str) -> AlertCommand {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            applescript_escape(body),
            applescript_escape(title)
        );
        AlertCommand::new("osascript", ["-e".to_string(), script])
    }

    fn speech(&self, text: &str) -> AlertCommand {
        AlertCommand::new("say", [text])
    }
}

pub struct WindowsAlerter;

impl WindowsAlerter {
    fn powershell(script: String) -> AlertCommand {
        AlertCommand::new("powershell", ["-NoProfile".to_string(), "-Command".to_string(), script])
    }
}

impl PlatformAlerter for WindowsAlerter {
    fn platform(&self) -> &'static str {
        "windows"
    }

    fn sound(&self) -> AlertCommand {
        Self::powershell("[System.Media.SystemSounds]::Exclamation.Play()".to_string())
    }

    fn toast(&self, title: &str, body: &str) -> AlertCommand {
        Self::powershell(format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $n = New-Object System.Windows.Forms.NotifyIcon; \
             $n.Icon = [System.Drawing.SystemIcons]::Information; \
             $n.Visible = $true; \
             $n.ShowBalloonTip(10000, '{}', '{}', 'Info'); \
             Start-Sleep -Seconds 10; $n.Dispose()",
            powershell_escape(title),
            powershell_escape(body)
        ))
    }

    fn speech(&self, text: &str) -> AlertCommand {
        Self::powershell(format!(
            "Add-Type -AssemblyName System.Speech; \
             (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{}')",
            powershell_escape(text)
        ))
    }
}

fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn powershell_escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Audible cue, desktop toast and optional speech through host commands.
pub struct DesktopNotifier {
    alerter: Box<dyn PlatformAlerter>,
    options: DesktopOptions,
}

impl DesktopNotifier {
    pub fn new(alerter: Box<dyn PlatformAlerter>, options: DesktopOptions) -> Self {
        Self { alerter, options }
    }

    /// Pick the alerter for the platform this binary was built for.
    pub fn for_host(options: DesktopOptions) -> Self {
        let alerter: Box<dyn PlatformAlerter> = if cfg!(target_os = "macos") {
            Box::new(MacAlerter)
        } else if cfg!(target_os = "windows") {
            Box::new(WindowsAlerter)
        } else {
            Box::new(LinuxAlerter)
        };
        Self::new(alerter, options)
    }

    pub fn platform(&self) -> &'static str {
        self.alerter.platform()
    }

    pub fn commands(&self, event: &AlertEvent) -> Vec<AlertCommand> {
        let mut commands = Vec::new();
        if self.options.sound {
            commands.push(self.alerter.sound());
        }
        if self.options.toast {
            commands.push(self.alerter.toast(TOAST_TITLE, &event.summary()));
        }
        if self.options.speech {
            commands.push(self.alerter.speech(event.reason.headline()));
        }
        commands
    }

    /// Start the command without waiting on it; a detached task reaps the child.
    fn spawn(command: &AlertCommand) -> std::io::Result<()> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let program = command.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => debug!("{} exited with {}", program, status),
                Ok(_) => {}
                Err(e) => debug!("Failed to reap {}: {}", program, e),
            }
        });
        Ok(())
    }
}

#[async_trait]
impl NotifierPlugin for DesktopNotifier {
    fn name(&self) -> &str {
        "Desktop Notifier"
    }

    fn plugin_type(&self) -> &str {
        "desktop"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<NotificationResult, AppError> {
        let commands = self.commands(event);
        if commands.is_empty() {
            return Ok(NotificationResult::delivered());
        }

        let mut failures = Vec::new();
        for command in &commands {
            if let Err(e) = Self::spawn(command) {
                warn!("Could not start {}: {}", command.program, e);
                failures.push(command.program.clone());
            }
        }

        if failures.len() == commands.len() {
            return Err(AppError::Notification {
                notifier: self.plugin_type().to_string(),
                message: format!("no alert command could be started ({})", failures.join(", ")),
            });
        }

        Ok(NotificationResult::delivered())
    }
}
