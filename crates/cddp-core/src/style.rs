//! Style sidecar conversion and SLD post-processing.
//!
//! The desktop QML sidecar is converted to SLD by an external engine;
//! the resulting document is then adjusted for the store's all-lowercase
//! naming: a `Name` element whose text is exactly the source layer name
//! is lowercased, and every `PropertyName` element (a column reference)
//! is lowercased. Everything else — including every namespace prefix and
//! the default namespace — passes through untouched.

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::dataset::StyledDatasetRef;
use crate::error::CoreError;
use crate::ogr::{OgrRunner, ToolPaths};

/// Convert a dataset's QML sidecar to a store-ready SLD document.
pub async fn convert_style<R: OgrRunner>(
    runner: &R,
    tools: &ToolPaths,
    styled: &StyledDatasetRef,
) -> Result<String, CoreError> {
    let layer = &styled.dataset.layer;
    let args = vec![
        styled.dataset.container.display().to_string(),
        layer.clone(),
        styled.style_path.display().to_string(),
    ];
    let output = runner
        .run(&tools.qml2sld, &args)
        .await
        .map_err(|err| CoreError::Convert {
            layer: layer.clone(),
            message: err.to_string(),
        })?;
    if !output.success {
        return Err(CoreError::Convert {
            layer: layer.clone(),
            message: output.stderr_text(),
        });
    }
    let sld = String::from_utf8(output.stdout).map_err(|err| CoreError::Convert {
        layer: layer.clone(),
        message: format!("converter emitted non-UTF-8 output: {err}"),
    })?;
    debug!("converted style for {layer}");
    rewrite_sld(&sld, layer)
}

/// Lowercase layer-name and column references in an SLD document.
pub fn rewrite_sld(sld: &str, layer: &str) -> Result<String, CoreError> {
    let style_err = |err: &dyn std::fmt::Display| CoreError::Style {
        message: err.to_string(),
    };

    let mut reader = Reader::from_str(sld);
    let mut writer = Writer::new(Vec::new());
    let mut stack: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| style_err(&e))?;
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                stack.push(local_name(e.name().as_ref()));
                writer.write_event(Event::Start(e)).map_err(|e| style_err(&e))?;
            }
            Event::End(e) => {
                stack.pop();
                writer.write_event(Event::End(e)).map_err(|e| style_err(&e))?;
            }
            Event::Text(t) => {
                let rewritten = match stack.last().map(String::as_str) {
                    Some("Name") => {
                        let text = t.unescape().map_err(|e| style_err(&e))?;
                        if text == layer {
                            Some(text.to_lowercase())
                        } else {
                            None
                        }
                    }
                    Some("PropertyName") => {
                        Some(t.unescape().map_err(|e| style_err(&e))?.to_lowercase())
                    }
                    _ => None,
                };
                match rewritten {
                    Some(text) => writer
                        .write_event(Event::Text(BytesText::new(&text)))
                        .map_err(|e| style_err(&e))?,
                    None => writer.write_event(Event::Text(t)).map_err(|e| style_err(&e))?,
                }
            }
            other => writer.write_event(other).map_err(|e| style_err(&e))?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| style_err(&e))
}

fn local_name(qname: &[u8]) -> String {
    let name = qname
        .iter()
        .position(|&b| b == b':')
        .map_or(qname, |i| &qname[i + 1..]);
    String::from_utf8_lossy(name).into_owned()
}

// ── Tests ───────────────────────────────────────────────────────────
