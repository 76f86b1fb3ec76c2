//! Minimal CLI parsing for run mode overrides.

use std::env;

use crate::app_mode::RunMode;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub run_mode_override: Option<RunMode>,
    /// Organize one stored result by id, then exit
    pub organize_id: Option<String>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--once" => options.run_mode_override = Some(RunMode::Once),
                "--audit" => options.run_mode_override = Some(RunMode::Audit),
                "--daemon" => options.run_mode_override = Some(RunMode::Daemon),
                "--run-mode" => {
                    if let Some(value) = args.next() {
                        options.run_mode_override = RunMode::from_arg(&value);
                    }
                }
                "--organize" => options.organize_id = args.next(),
                _ if arg.starts_with("--run-mode=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.run_mode_override = RunMode::from_arg(value);
                    }
                }
                _ if arg.starts_with("--organize=") => {
                    options.organize_id = arg.split_once('=').map(|(_, v)| v.to_string());
                }
                _ => {}
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse(&["--once"]).run_mode_override, Some(RunMode::Once));
        assert_eq!(
            parse(&["--run-mode=audit"]).run_mode_override,
            Some(RunMode::Audit)
        );
        assert_eq!(
            parse(&["--organize", "abc123"]).organize_id.as_deref(),
            Some("abc123")
        );
        assert_eq!(parse(&["--verbose"]), CliOptions::default());
    }
}
