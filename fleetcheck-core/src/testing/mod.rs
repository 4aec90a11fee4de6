//! Scripted session provider for exercising runs without a network.
//!
//! Each target gets a [`TargetScript`] describing how opening a session
//! behaves and what each command returns. [`ProviderStats`] records opens,
//! closes, peak concurrency and the commands each target received.
//! [`RecordingSink`] captures notification intents instead of sending them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DeliveryError, SessionError, SessionResult};
use crate::models::TargetDescriptor;
use crate::notify::{NotificationIntent, NotificationSink};
use crate::session::{RemoteSession, SessionProvider};

/// Scripted response to one command
#[derive(Debug, Clone)]
struct CommandScript {
    delay: Duration,
    outcome: Result<String, SessionError>,
}

/// How a scripted target behaves
#[derive(Debug, Clone, Default)]
pub struct TargetScript {
    open_delay: Duration,
    open_error: Option<SessionError>,
    commands: HashMap<String, CommandScript>,
    fallback: Option<String>,
}

impl TargetScript {
    /// A target that opens instantly and fails every unscripted command
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays session open
    #[must_use]
    pub const fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Makes session open fail (after any open delay)
    #[must_use]
    pub fn open_fails(mut self, error: SessionError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Returns `output` for `command`
    #[must_use]
    pub fn respond(self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.respond_after(command, output, Duration::ZERO)
    }

    /// Returns `output` for `command` after `delay`
    #[must_use]
    pub fn respond_after(
        mut self,
        command: impl Into<String>,
        output: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.commands.insert(
            command.into(),
            CommandScript {
                delay,
                outcome: Ok(output.into()),
            },
        );
        self
    }

    /// Fails `command` with `error`
    #[must_use]
    pub fn fail(mut self, command: impl Into<String>, error: SessionError) -> Self {
        self.commands.insert(
            command.into(),
            CommandScript {
                delay: Duration::ZERO,
                outcome: Err(error),
            },
        );
        self
    }

    /// Returns `output` for every command without its own script
    #[must_use]
    pub fn fallback(mut self, output: impl Into<String>) -> Self {
        self.fallback = Some(output.into());
        self
    }

    fn outcome_for(&self, command: &str) -> CommandScript {
        self.commands.get(command).cloned().unwrap_or_else(|| CommandScript {
            delay: Duration::ZERO,
            outcome: self.fallback.clone().ok_or_else(|| {
                SessionError::other(format!("No scripted response for '{command}'"))
            }),
        })
    }
}

/// Counters shared between a provider and its sessions
#[derive(Debug, Default)]
pub struct ProviderStats {
    opens: AtomicUsize,
    closes: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    commands: Mutex<Vec<(String, String)>>,
}

impl ProviderStats {
    /// Open attempts, successful or not
    #[must_use]
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Sessions closed
    #[must_use]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Peak number of targets being opened or holding an open session
    #[must_use]
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Commands sent to `target_id`, in order
    #[must_use]
    pub fn commands_for(&self, target_id: &str) -> Vec<String> {
        self.commands
            .lock()
            .map(|log| {
                log.iter()
                    .filter(|(id, _)| id == target_id)
                    .map(|(_, cmd)| cmd.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn record(&self, target_id: &str, command: &str) {
        if let Ok(mut log) = self.commands.lock() {
            log.push((target_id.to_string(), command.to_string()));
        }
    }
}

/// Session provider driven by per-target scripts
#[derive(Debug, Default)]
pub struct ScriptedSessionProvider {
    scripts: HashMap<String, TargetScript>,
    default_script: TargetScript,
    stats: Arc<ProviderStats>,
}

impl ScriptedSessionProvider {
    /// A provider where every target opens and every command fails
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the script for one target
    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<String>, script: TargetScript) -> Self {
        self.scripts.insert(target_id.into(), script);
        self
    }

    /// Sets the script for targets without their own
    #[must_use]
    pub fn with_default(mut self, script: TargetScript) -> Self {
        self.default_script = script;
        self
    }

    /// Shared counters
    #[must_use]
    pub fn stats(&self) -> Arc<ProviderStats> {
        Arc::clone(&self.stats)
    }
}

/// Decrements the active count if an open is abandoned mid-delay
struct OpenGuard {
    stats: Arc<ProviderStats>,
    armed: bool,
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        if self.armed {
            self.stats.leave();
        }
    }
}

#[async_trait]
impl SessionProvider for ScriptedSessionProvider {
    async fn open(
        &self,
        target: &TargetDescriptor,
        timeout: Duration,
    ) -> SessionResult<Box<dyn RemoteSession>> {
        let script = self
            .scripts
            .get(&target.id)
            .unwrap_or(&self.default_script)
            .clone();

        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        self.stats.enter();
        let mut guard = OpenGuard {
            stats: Arc::clone(&self.stats),
            armed: true,
        };

        if script.open_delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(SessionError::timeout(format!(
                "Connect timed out after {}ms",
                timeout.as_millis()
            )));
        }
        tokio::time::sleep(script.open_delay).await;

        if let Some(error) = script.open_error.clone() {
            return Err(error);
        }

        guard.armed = false;
        Ok(Box::new(ScriptedSession {
            target_id: target.id.clone(),
            script,
            stats: Arc::clone(&self.stats),
            open: true,
        }))
    }
}

struct ScriptedSession {
    target_id: String,
    script: TargetScript,
    stats: Arc<ProviderStats>,
    open: bool,
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn execute(&mut self, command: &str, timeout: Duration) -> SessionResult<String> {
        self.stats.record(&self.target_id, command);
        let scripted = self.script.outcome_for(command);
        if scripted.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(SessionError::timeout(format!(
                "Command timed out after {}ms",
                timeout.as_millis()
            )));
        }
        tokio::time::sleep(scripted.delay).await;
        scripted.outcome
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
            self.stats.leave();
        }
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        if self.open {
            self.stats.leave();
        }
    }
}

/// Notification sink that keeps every intent it is given
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<NotificationIntent>>,
    fail_subjects_containing: Option<String>,
}

impl RecordingSink {
    /// Creates a sink that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects intents whose subject contains `needle`
    #[must_use]
    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail_subjects_containing: Some(needle.into()),
        }
    }

    /// Intents accepted so far
    #[must_use]
    pub fn delivered(&self) -> Vec<NotificationIntent> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), DeliveryError> {
        if let Some(needle) = &self.fail_subjects_containing
            && intent.subject.contains(needle.as_str())
        {
            return Err(DeliveryError::Transport(format!(
                "Scripted failure for '{}'",
                intent.subject
            )));
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(intent.clone());
        }
        Ok(())
    }
}
