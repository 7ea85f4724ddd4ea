//! HTML document generation
//!
//! Produces one self-contained document for a whole analysis run: a header
//! with a per-file index, then one annotated source section per file.
//! Adjacent spans sharing a color are coalesced before emission, which
//! shrinks the output without changing the colors a reader sees.

use crate::color::{PaletteConfig, Rgb, UNTOUCHED};
use crate::report::{FileReport, FileSpans, RenderedSpan};

/// Render the complete document for all file reports, in input order.
pub fn render_html_document(
    files: &[FileReport],
    palette: PaletteConfig,
    dropped_events: u64,
) -> String {
    let (background, foreground) = if palette.dark {
        ("black", "white")
    } else {
        ("white", "black")
    };
    let sections: String = files
        .iter()
        .enumerate()
        .map(|(index, file)| render_file_section(file, index, palette))
        .collect();

    format!(
        "<!doctype html>\n\
         <html>\n\
         <head>\n\
         <meta http-equiv='content-type' content='text/html;charset=utf-8'/>\n\
         <title>quickview report</title>\n\
         </head>\n\
         <body style='background-color:{background};color:{foreground}'>\n\
         {header}\
         {sections}\
         </body>\n\
         </html>\n",
        background = background,
        foreground = foreground,
        header = render_header(files, dropped_events),
        sections = sections,
    )
}

/// Document header: file index plus the dropped-event diagnostic, if any
fn render_header(files: &[FileReport], dropped_events: u64) -> String {
    let index: String = files
        .iter()
        .enumerate()
        .map(|(index, file)| {
            let note = match &file.spans {
                FileSpans::Unavailable => " (unavailable)",
                FileSpans::Rendered(_) if !file.is_quickened() => " (no quickened code)",
                FileSpans::Rendered(_) => "",
            };
            format!(
                "<li><a href='#file-{index}'>{path}</a>{note}</li>\n",
                index = index,
                path = html_escape(&file.path),
                note = note,
            )
        })
        .collect();
    let diagnostic = if dropped_events > 0 {
        format!(
            "<p><em>{} event(s) ignored: malformed or not attributable to a rendered file.</em></p>\n",
            dropped_events
        )
    } else {
        String::new()
    };
    format!(
        "<h1>quickview</h1>\n<ul>\n{index}</ul>\n{diagnostic}",
        index = index,
        diagnostic = diagnostic,
    )
}

fn render_file_section(file: &FileReport, index: usize, palette: PaletteConfig) -> String {
    let body = match &file.spans {
        FileSpans::Rendered(spans) => format!("<pre>{}</pre>\n", render_spans(spans, palette)),
        FileSpans::Unavailable => {
            "<p><em>Source text unavailable; this file was not rendered.</em></p>\n".to_string()
        }
    };
    format!(
        "<section id='file-{index}'>\n<h2>{path}</h2>\n{body}</section>\n",
        index = index,
        path = html_escape(&file.path),
        body = body,
    )
}

/// Emit a file's spans, merging adjacent same-colored runs into one unit.
///
/// The light theme tints the text's background; the dark theme tints the
/// text itself. Untouched runs are emitted bare so the default page colors
/// apply.
fn render_spans(spans: &[RenderedSpan], palette: PaletteConfig) -> String {
    let attribute = if palette.dark {
        "color"
    } else {
        "background-color"
    };
    let mut out = String::new();
    for (color, text) in coalesce(spans) {
        let escaped = html_escape(&text);
        if color == UNTOUCHED {
            out.push_str(&escaped);
        } else {
            out.push_str(&format!(
                "<span style='{}:{}'>{}</span>",
                attribute, color, escaped
            ));
        }
    }
    out
}

/// Collapse adjacent spans carrying an identical color into single runs
fn coalesce(spans: &[RenderedSpan]) -> Vec<(Rgb, String)> {
    let mut runs: Vec<(Rgb, String)> = Vec::new();
    for span in spans {
        match runs.last_mut() {
            Some((color, text)) if *color == span.color => text.push_str(&span.text),
            _ => runs.push((span.color, span.text.clone())),
        }
    }
    runs
}

/// Escape characters with special meaning in HTML
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Counts;

    fn span(start: usize, end: usize, color: Rgb, text: &str) -> RenderedSpan {
        RenderedSpan {
            start,
            end,
            counts: Counts::default(),
            color,
            text: text.to_string(),
        }
    }

    const GREEN: Rgb = Rgb {
        r: 0,
        g: 0xff,
        b: 0,
    };
    const RED: Rgb = Rgb {
        r: 0xff,
        g: 0,
        b: 0,
    };

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("if a < b & c > 'd': \"e\""),
            "if a &lt; b &amp; c &gt; &#39;d&#39;: &quot;e&quot;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_coalesce_merges_same_color_runs() {
        let spans = vec![
            span(0, 2, GREEN, "ab"),
            span(2, 4, GREEN, "cd"),
            span(4, 6, RED, "ef"),
            span(6, 8, GREEN, "gh"),
        ];
        let runs = coalesce(&spans);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], (GREEN, "abcd".to_string()));
        assert_eq!(runs[1], (RED, "ef".to_string()));
        assert_eq!(runs[2], (GREEN, "gh".to_string()));
    }

    #[test]
    fn test_untouched_runs_emitted_bare() {
        let spans = vec![span(0, 2, UNTOUCHED, "ab"), span(2, 4, GREEN, "c<d")];
        let light = render_spans(&spans, PaletteConfig::default());
        assert_eq!(
            light,
            "ab<span style='background-color:#00ff00'>c&lt;d</span>"
        );
        let dark = render_spans(
            &spans,
            PaletteConfig {
                alternate_hue: false,
                dark: true,
            },
        );
        assert_eq!(dark, "ab<span style='color:#00ff00'>c&lt;d</span>");
    }

    #[test]
    fn test_document_structure() {
        let files = vec![
            FileReport {
                path: "a&b.py".to_string(),
                spans: FileSpans::Rendered(vec![span(0, 4, GREEN, "x = ")]),
                dropped_events: 0,
            },
            FileReport {
                path: "gone.py".to_string(),
                spans: FileSpans::Unavailable,
                dropped_events: 0,
            },
        ];
        let html = render_html_document(&files, PaletteConfig::default(), 2);
        assert!(html.contains("<a href='#file-0'>a&amp;b.py</a>"));
        assert!(html.contains("<section id='file-1'>"));
        assert!(html.contains("Source text unavailable"));
        assert!(html.contains("2 event(s) ignored"));
        assert!(html.contains("background-color:white"));
    }
}
