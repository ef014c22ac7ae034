//! Command/response sessions over an unframed device shell.
//!
//! The shell has no framing and no end-of-response marker: every command
//! is written, the session sleeps for a settle interval, and whatever has
//! arrived by then is the answer. The trailing prompt is parsed only to
//! track the current [`Mode`], never to end a read early.
//!
//! I/O faults stop here. Collectors see `bool`, `Option` or a
//! [`CollectionFailure`], never a transport error.

mod mode;
mod response;

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use regex::bytes::Regex;
use secrecy::ExposeSecret;

pub use mode::Mode;
pub use response::CommandOutput;

use crate::channel::{OutputBuffer, trailing_prompt};
use crate::config::SessionPolicy;
use crate::error::{CollectionFailure, Result, TransportError};
use crate::transport::{Endpoint, Transport};

static PASSWORD_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*password:\s*$").expect("password regex is valid")
});

/// `[confirm]`, `[no]:` or `[yes/no]:` left waiting for an answer.
static CONFIRM_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\[confirm\]|\[(?:yes/no|yes|no)\]:?)\s*$").expect("confirm regex is valid")
});

/// Interrupt, leave config mode, re-enter privileged mode, fresh prompt.
const RESET_SEQUENCE: [&[u8]; 4] = [b"\x03", b"end\r\n", b"enable\r\n", b"\r\n"];

/// Blank lines that wake an idle console before the first reset.
const WAKE_SEQUENCE: [&[u8]; 2] = [b"\r\n", b"\r\n"];

/// An interactive shell on one device.
///
/// A session is owned by exactly one task at a time. Call [`Session::close`]
/// when done; dropping an open session aborts its transport and logs a
/// warning.
pub struct Session {
    device: String,
    transport: Option<Transport>,
    buffer: OutputBuffer,
    mode: Mode,
    policy: Arc<SessionPolicy>,
}

impl Session {
    /// Connect to `endpoint` and bring the shell to privileged mode.
    pub async fn open(
        device: impl Into<String>,
        endpoint: &Endpoint,
        policy: Arc<SessionPolicy>,
    ) -> Result<Self> {
        let device = device.into();
        let transport = Transport::connect(endpoint, policy.connect_timeout).await?;

        let mut session = Self {
            device,
            transport: Some(transport),
            buffer: OutputBuffer::default(),
            mode: Mode::Unknown,
            policy,
        };

        for keys in WAKE_SEQUENCE {
            session.send_raw(keys).await?;
            tokio::time::sleep(session.policy.reset_settle / 2).await;
        }
        if !session.reset().await {
            return Err(TransportError::Disconnected.into());
        }
        if session.mode == Mode::Unknown && !session.await_prompt().await {
            let timeout = session.policy.connect_timeout;
            warn!("{}: no prompt within {:?}", session.device, timeout);
            session.close().await;
            return Err(TransportError::Timeout(timeout).into());
        }

        debug!(
            "Opened session to {} at {} ({} mode)",
            session.device,
            endpoint.socket_addr(),
            session.mode
        );
        Ok(session)
    }

    /// Device name used in logs and problem reports.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Mode seen at the last trailing prompt.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Whether the transport pump is still running.
    pub fn is_alive(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_alive)
    }

    /// Force the shell back to privileged mode from any state.
    ///
    /// There is no command that reports the current mode, so every step is
    /// sent blind and its output drained. An enable password prompt is
    /// answered with the configured secret. Returns `false` only when the
    /// keystrokes could not be written.
    pub async fn reset(&mut self) -> bool {
        let pause = self.policy.reset_settle;

        for keys in RESET_SEQUENCE {
            if let Err(e) = self.send_raw(keys).await {
                warn!("{}: reset failed: {}", self.device, e);
                return false;
            }
            tokio::time::sleep(pause).await;
            self.pull();

            if self.buffer.search_tail(&PASSWORD_PROMPT).is_some() && !self.answer_password().await
            {
                return false;
            }
            self.discard();
        }

        if self.mode != Mode::Privileged {
            debug!("{}: reset left the shell in {} mode", self.device, self.mode);
        }
        true
    }

    /// Run a command and return what arrived within `settle`.
    ///
    /// Output shorter than the policy's `min_output_len` is a
    /// [`CollectionFailure::ShortOutput`].
    pub async fn execute(
        &mut self,
        command: &str,
        settle: Duration,
    ) -> std::result::Result<CommandOutput, CollectionFailure> {
        let min_len = self.policy.min_output_len;
        self.execute_expecting(command, settle, min_len).await
    }

    /// Like [`Session::execute`] with an explicit minimum raw length.
    ///
    /// Use this for commands whose legitimate answer can be nearly empty,
    /// such as a neighbor table with no neighbors.
    pub async fn execute_expecting(
        &mut self,
        command: &str,
        settle: Duration,
        min_len: usize,
    ) -> std::result::Result<CommandOutput, CollectionFailure> {
        self.discard();
        let start = Instant::now();

        debug!("{}: sending '{}'", self.device, command);
        if let Err(e) = self.send_line(command).await {
            return Err(CollectionFailure::Io {
                command: command.to_string(),
                reason: e.to_string(),
            });
        }

        tokio::time::sleep(settle).await;
        let raw = self.drain_text();
        trace!("{}: '{}' returned {} bytes", self.device, command, raw.len());

        if raw.len() < min_len {
            return Err(CollectionFailure::ShortOutput {
                command: command.to_string(),
                len: raw.len(),
                min: min_len,
            });
        }
        Ok(CommandOutput::from_raw(command, raw, start.elapsed()))
    }

    /// Fetch the full running configuration.
    ///
    /// Pagination is disabled first. Output is collected until the closing
    /// `end` line arrives or `running_config_timeout` expires.
    pub async fn running_config(&mut self) -> std::result::Result<String, CollectionFailure> {
        let pause = self.policy.reset_settle;
        self.execute_expecting("terminal length 0", pause, 0).await?;

        let command = "show running-config";
        self.discard();
        let start = Instant::now();
        debug!("{}: sending '{}'", self.device, command);
        if let Err(e) = self.send_line(command).await {
            return Err(CollectionFailure::Io {
                command: command.to_string(),
                reason: e.to_string(),
            });
        }

        tokio::time::sleep(self.policy.settle).await;
        let mut raw = self.drain_text();
        let deadline = start + self.policy.running_config_timeout;
        while !has_end_line(&raw) && Instant::now() < deadline {
            tokio::time::sleep(pause).await;
            raw.push_str(&self.drain_text());
        }

        if raw.len() < self.policy.min_output_len {
            return Err(CollectionFailure::ShortOutput {
                command: command.to_string(),
                len: raw.len(),
                min: self.policy.min_output_len,
            });
        }
        if !has_end_line(&raw) {
            warn!("{}: running-config incomplete after {:?}", self.device, start.elapsed());
        }
        Ok(CommandOutput::from_raw(command, raw, start.elapsed()).text)
    }

    /// Apply configuration lines.
    ///
    /// Resets, enters `configure terminal`, sends each line, leaves with
    /// `end` and persists when the policy asks for it. Lines starting with
    /// `#` are annotations for the operator and are never sent. Returns
    /// `false` if a line could not be written or the device rejected it.
    pub async fn execute_config<S: AsRef<str>>(&mut self, commands: &[S]) -> bool {
        if !self.reset().await {
            return false;
        }
        if !self.config_line("configure terminal").await {
            return false;
        }
        if !self.mode.is_config() {
            warn!("{}: did not enter configuration mode ({} mode)", self.device, self.mode);
            return false;
        }

        for command in commands {
            let line = command.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                debug!("{}: skipping annotation '{}'", self.device, line);
                continue;
            }
            if !self.config_line(line).await {
                self.config_line("end").await;
                return false;
            }
        }

        if !self.config_line("end").await {
            return false;
        }

        if self.policy.persist {
            let persist = self.policy.persist_command.clone();
            let settle = self.policy.settle;
            if let Err(e) = self.execute_expecting(&persist, settle, 0).await {
                warn!("{}: '{}' failed: {}", self.device, persist, e);
                return false;
            }
        }
        true
    }

    /// Bring the shell back to privileged mode and send `no debug all`.
    pub async fn disable_debugging(&mut self) -> bool {
        if !self.reset().await {
            return false;
        }
        let settle = self.policy.settle;
        match self.execute_expecting("no debug all", settle, 0).await {
            Ok(_) => true,
            Err(e) => {
                warn!("{}: could not disable debugging: {}", self.device, e);
                false
            }
        }
    }

    /// Run a privileged command that may stop at a confirmation prompt.
    ///
    /// If the output ends in `[confirm]` or `[no]:`, `answer` is sent.
    /// Returns `false` if a line could not be written or was rejected.
    pub async fn execute_confirmed(&mut self, command: &str, answer: &str) -> bool {
        let settle = self.policy.settle;
        let output = match self.execute_expecting(command, settle, 0).await {
            Ok(output) => output,
            Err(e) => {
                warn!("{}: {}", self.device, e);
                return false;
            }
        };
        if !self.accepted(command, &output) {
            return false;
        }
        if !CONFIRM_PROMPT.is_match(output.raw.as_bytes()) {
            debug!("{}: '{}' asked for no confirmation", self.device, command);
            return true;
        }

        debug!("{}: confirming '{}' with '{}'", self.device, command, answer);
        match self.execute_expecting(answer, settle, 0).await {
            Ok(output) => self.accepted(command, &output),
            Err(e) => {
                warn!("{}: {}", self.device, e);
                false
            }
        }
    }

    /// Leave config mode and shut the transport down.
    pub async fn close(mut self) {
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.send(b"end\r\n", self.policy.write_timeout).await {
                trace!("{}: could not send final 'end': {}", self.device, e);
            }
            transport.close(self.policy.close_timeout).await;
            debug!("Closed session to {}", self.device);
        }
    }

    async fn config_line(&mut self, line: &str) -> bool {
        let settle = self.policy.config_settle;
        match self.execute_expecting(line, settle, 0).await {
            Ok(output) => self.accepted(line, &output),
            Err(e) => {
                warn!("{}: {}", self.device, e);
                false
            }
        }
    }

    /// Nudge the console with blank lines until a prompt shows, for at
    /// most the connect timeout.
    async fn await_prompt(&mut self) -> bool {
        let deadline = Instant::now() + self.policy.connect_timeout;
        while self.mode == Mode::Unknown {
            if Instant::now() >= deadline || self.send_raw(b"\r\n").await.is_err() {
                return false;
            }
            tokio::time::sleep(self.policy.reset_settle).await;
            self.discard();
        }
        true
    }

    fn accepted(&self, line: &str, output: &CommandOutput) -> bool {
        let rejected = self
            .policy
            .failed_when_contains
            .iter()
            .find(|pattern| output.raw.contains(pattern.as_str()));
        match rejected {
            Some(pattern) => {
                warn!("{}: device rejected '{}' ({})", self.device, line, pattern);
                false
            }
            None => true,
        }
    }

    async fn answer_password(&mut self) -> bool {
        let secret = self
            .policy
            .enable_secret
            .as_ref()
            .map(|s| s.expose_secret().to_string());
        let answer = match secret {
            Some(secret) => format!("{}\r\n", secret),
            None => {
                warn!("{}: enable password requested but no secret configured", self.device);
                "\r\n".to_string()
            }
        };
        self.buffer.clear();
        if let Err(e) = self.send_raw(answer.as_bytes()).await {
            warn!("{}: could not answer enable prompt: {}", self.device, e);
            return false;
        }
        tokio::time::sleep(self.policy.reset_settle).await;
        self.pull();
        true
    }

    async fn send_line(&self, line: &str) -> std::result::Result<(), TransportError> {
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        self.send_raw(&bytes).await
    }

    async fn send_raw(&self, data: &[u8]) -> std::result::Result<(), TransportError> {
        let transport = self.transport.as_ref().ok_or(TransportError::Disconnected)?;
        transport.send(data, self.policy.write_timeout).await
    }

    /// Move whatever the pump delivered into the buffer.
    fn pull(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            let bytes = transport.drain();
            self.buffer.extend(&bytes);
        }
    }

    fn drain_text(&mut self) -> String {
        self.pull();
        let text = self.buffer.take_string();
        if let Some(prompt) = trailing_prompt(&text) {
            let mode = Mode::from_prompt(prompt);
            if mode != self.mode {
                trace!("{}: {} -> {} mode", self.device, self.mode, mode);
                self.mode = mode;
            }
        }
        text
    }

    fn discard(&mut self) {
        self.drain_text();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(transport) = self.transport.take() {
            warn!("Session to {} dropped without close", self.device);
            transport.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device)
            .field("mode", &self.mode)
            .field("open", &self.transport.is_some())
            .finish()
    }
}

fn has_end_line(text: &str) -> bool {
    text.lines().any(|line| line.trim_end() == "end")
}
