//! Output of one command.

use std::time::Duration;

/// What a command printed, and whether the platform considers it failed.
#[derive(Debug, Clone)]
pub struct Response {
    pub command: String,

    /// Output without the echoed command and the trailing prompt.
    pub result: String,

    /// Output exactly as read, escape sequences already removed.
    pub raw_result: String,

    /// Prompt the read stopped at.
    pub prompt: String,

    pub elapsed: Duration,

    /// The failure substring found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.result)
    }
}

/// Strip the command echo and the trailing prompt line from raw output.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let raw = raw.replace("\r\n", "\n");
    let output = raw
        .strip_prefix(command)
        .unwrap_or(&raw)
        .trim_start_matches(['\r', '\n']);

    match memchr::memrchr(b'\n', output.as_bytes()) {
        Some(pos) => output[..pos].trim_end_matches('\r').to_string(),
        None => String::new(),
    }
}

/// First failure pattern that appears in `output`.
pub(crate) fn detect_failure<'a>(output: &str, patterns: &'a [String]) -> Option<&'a str> {
    patterns
        .iter()
        .find(|p| output.contains(p.as_str()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "show version\r\nCisco IOS XE Software\r\nuptime is 3 weeks\r\nedge-rtr1#";
        assert_eq!(
            normalize_output(raw, "show version"),
            "Cisco IOS XE Software\nuptime is 3 weeks"
        );
    }

    #[test]
    fn test_normalize_prompt_only() {
        assert_eq!(normalize_output("terminal length 0\r\nedge-rtr1#", "terminal length 0"), "");
    }

    #[test]
    fn test_detect_failure() {
        let patterns = vec!["% Invalid input".to_string(), "% Incomplete command".to_string()];
        let output = "interface Gi0/1\n% Invalid input detected at '^' marker.";
        assert_eq!(detect_failure(output, &patterns), Some("% Invalid input"));
        assert_eq!(detect_failure("description uplink", &patterns), None);
    }

    #[test]
    fn test_failed_response() {
        let response = Response::new("foo", "", "", "r1#", Duration::ZERO).with_failure("% Error");
        assert!(!response.is_success());
    }
}
