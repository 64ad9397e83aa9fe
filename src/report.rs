use std::io::Write;
use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::error::LoxideError;
use crate::resolver::Warning;

/// Converts a byte span to a character span for ariadne
fn byte_to_char_span(source: &str, byte_span: &Range<usize>) -> Range<usize> {
    let start = source[..byte_span.start.min(source.len())].chars().count();
    let end = source[..byte_span.end.min(source.len())].chars().count();
    start..end
}

fn render<W: Write>(
    kind: ReportKind,
    headline: String,
    message: &str,
    color: Color,
    span: &Range<usize>,
    source: &str,
    filename: Option<&str>,
    mut writer: W,
) {
    let name = filename.unwrap_or("");
    let char_span = byte_to_char_span(source, span);
    Report::build(kind, (name, char_span.clone()))
        .with_message(headline)
        .with_label(
            Label::new((name, char_span))
                .with_message(message)
                .with_color(color),
        )
        .finish()
        .write((name, Source::from(source)), &mut writer)
        .ok();
}

/// Renders an error with a labeled source snippet
pub fn report_error<W: Write>(
    error: &LoxideError,
    source: &str,
    filename: Option<&str>,
    mut writer: W,
) {
    match error {
        LoxideError::Io(_) => {
            writeln!(writer, "{}", error).ok();
        }
        LoxideError::Scan { span, message }
        | LoxideError::Parse { span, message }
        | LoxideError::Resolution { span, message }
        | LoxideError::Runtime { span, message } => {
            render(
                ReportKind::Error,
                error.to_string(),
                message,
                Color::Red,
                span,
                source,
                filename,
                writer,
            );
        }
        LoxideError::Return(_) => {
            // Internal control flow, never reported to users
        }
    }
}

/// Renders a diagnostic warning; warnings never affect the exit code
pub fn report_warning<W: Write>(
    warning: &Warning,
    source: &str,
    filename: Option<&str>,
    writer: W,
) {
    render(
        ReportKind::Warning,
        "Warning".to_string(),
        &warning.message,
        Color::Yellow,
        &warning.span,
        source,
        filename,
        writer,
    );
}
