//! User-facing simba diagnostics.
//!
//! Demarshalls [libsimba diagnostics](libsimba::diagnostics) into a form pleasant for standard
//! output.

use libsimba::diagnostics::{Diagnostic, DiagnosticKind};

use annotate_snippets::{
    display_list::{DisplayList, FormatOptions},
    snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation},
};

/// Renders diagnostics over their program source.
pub fn emit_simba_diagnostics(
    file: Option<&str>,
    source: &str,
    diagnostics: &[Diagnostic],
    color: bool,
) -> String {
    // An EOF diagnostic may point one past the end; pad the source for it.
    let source = format!("{} ", source);

    let mut emitted = String::new();
    for diagnostic in diagnostics {
        let main_annotation_type = convert_diagnostic_kind(diagnostic.kind);
        let label = diagnostic.msg.clone().unwrap_or_default();
        let mut annotations = vec![SourceAnnotation {
            label: &label,
            annotation_type: main_annotation_type,
            range: clamp(diagnostic.span.into(), source.len()),
        }];
        for associated in diagnostic.associated_diagnostics.iter() {
            annotations.push(SourceAnnotation {
                label: &associated.msg,
                annotation_type: convert_diagnostic_kind(associated.kind),
                range: clamp(associated.span.into(), source.len()),
            });
        }

        let snippet = Snippet {
            title: Some(Annotation {
                label: Some(&diagnostic.title),
                id: None,
                annotation_type: main_annotation_type,
            }),
            footer: vec![],
            slices: vec![Slice {
                source: &source,
                line_start: 1,
                origin: file,
                fold: true,
                annotations,
            }],
            opt: FormatOptions {
                color,
                ..Default::default()
            },
        };
        emitted.push_str(&format!("{}\n\n", DisplayList::from(snippet)));
    }
    emitted
}

fn clamp((lo, hi): (usize, usize), len: usize) -> (usize, usize) {
    (lo.min(len), hi.min(len))
}

fn convert_diagnostic_kind(kind: DiagnosticKind) -> AnnotationType {
    match kind {
        DiagnosticKind::Error => AnnotationType::Error,
        DiagnosticKind::Note => AnnotationType::Note,
        DiagnosticKind::Help => AnnotationType::Help,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsimba::scan;

    #[test]
    fn renders_scan_diagnostic() {
        let program = "x @ y";
        let diagnostics = scan(program).diagnostics;
        assert_eq!(diagnostics.len(), 1);

        let rendered = emit_simba_diagnostics(Some("prog.mba"), program, &diagnostics, false);
        assert!(rendered.contains(r#"Invalid token "@""#), "{}", rendered);
        assert!(rendered.contains("prog.mba"), "{}", rendered);
    }

    #[test]
    fn renders_parse_diagnostic_at_eof() {
        let program = "x +";
        let scanned = scan(program);
        let (_, diagnostics) = libsimba::parse_program(scanned.tokens);
        assert!(!diagnostics.is_empty());

        let rendered = emit_simba_diagnostics(None, program, &diagnostics, false);
        assert!(rendered.contains("Expected an expression"), "{}", rendered);
    }
}
