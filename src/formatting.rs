use std::fmt::Write as FmtWrite;
use std::process::ExitCode;

use slidepress_lib::{ConvertError, ErrorPayload};

/// Render a fatal error to stderr and return the appropriate exit code.
pub fn render_error(err: ConvertError) -> ExitCode {
    eprint!("{}", format_payload(&err.to_payload()));
    // Reserve exit code 2 for fatal errors; per-file failures use 1.
    ExitCode::from(2)
}

/// Exit code for a finished batch.
pub fn batch_exit_code(failed: usize) -> ExitCode {
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

pub fn format_payload(payload: &ErrorPayload) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Error: {}", payload.message);
    if let Some(remediation) = &payload.remediation {
        let _ = writeln!(out, "Hint: {remediation}");
    }
    out
}

/// One-line summary printed after a batch with failures.
pub fn format_summary(total: usize, failed: usize) -> String {
    let noun = if total == 1 { "file" } else { "files" };
    format!("{failed} of {total} {noun} failed to convert")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_includes_hint_when_present() {
        let text = format_payload(&ConvertError::OutputConflict.to_payload());
        assert!(text.starts_with("Error: Output path cannot be specified"));
        assert!(text.contains("Hint: "));
    }

    #[test]
    fn summary_pluralizes() {
        assert_eq!(format_summary(1, 1), "1 of 1 file failed to convert");
        assert_eq!(format_summary(3, 2), "2 of 3 files failed to convert");
    }
}
