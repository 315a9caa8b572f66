//! Embedded layer metadata extraction.
//!
//! File geodatabases carry an ESRI metadata XML document per layer,
//! retrieved through the container reader's `GetLayerMetadata`
//! pseudo-query. The abstract lives at `dataIdInfo/idAbs` and is itself
//! HTML, so it is markup-stripped before use; the title at
//! `dataIdInfo/idCitation/resTitle` is taken raw. Both are independently
//! optional.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::dataset::DatasetRef;
use crate::error::CoreError;
use crate::ogr::{OgrRunner, ToolPaths};

/// Title and abstract extracted from a layer's metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerMetadata {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
}

/// Retrieve a layer's embedded metadata XML, if any.
pub async fn layer_metadata_xml<R: OgrRunner>(
    runner: &R,
    tools: &ToolPaths,
    dataset: &DatasetRef,
) -> Result<Option<String>, CoreError> {
    let args = vec![
        "-ro".to_owned(),
        "-json".to_owned(),
        "-features".to_owned(),
        dataset.container.display().to_string(),
        "-sql".to_owned(),
        format!("GetLayerMetadata {}", dataset.layer),
    ];
    let output = runner
        .run(&tools.ogrinfo, &args)
        .await
        .map_err(|err| CoreError::Metadata {
            layer: dataset.layer.clone(),
            message: err.to_string(),
        })?;
    if !output.success {
        return Err(CoreError::Metadata {
            layer: dataset.layer.clone(),
            message: output.stderr_text(),
        });
    }
    debug!("metadata query completed for {}", dataset.layer);
    Ok(parse_metadata_output(&output.stdout))
}

/// Pull the metadata string out of the reader's JSON report.
///
/// The pseudo-query yields one feature whose single field is the XML
/// document; an empty or absent field means the layer has no metadata.
pub fn parse_metadata_output(stdout: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    let properties = value
        .pointer("/layers/0/features/0/properties")?
        .as_object()?;
    let text = properties.values().next()?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

/// Extract both optional fields from a metadata document.
pub fn extract_metadata(metadata: &str) -> LayerMetadata {
    LayerMetadata {
        title: extract_title(metadata),
        abstract_text: extract_abstract(metadata),
    }
}

/// Abstract text with markup stripped and whitespace trimmed.
pub fn extract_abstract(metadata: &str) -> Option<String> {
    let html = element_text(metadata, &["dataIdInfo", "idAbs"])?;
    let text = strip_markup(&html);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

/// Raw title text.
pub fn extract_title(metadata: &str) -> Option<String> {
    element_text(metadata, &["dataIdInfo", "idCitation", "resTitle"])
}

/// Text content of the first element at `path` below the document root.
fn element_text(xml: &str, path: &[&str]) -> Option<String> {
    // stack[0] is the document root, whatever its name.
    fn at_path(stack: &[String], path: &[&str]) -> bool {
        stack.len() == path.len() + 1
            && stack
                .iter()
                .skip(1)
                .map(String::as_str)
                .eq(path.iter().copied())
    }

    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut buffer = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                if at_path(&stack, path) {
                    // First match wins, present or empty.
                    return if buffer.is_empty() { None } else { Some(buffer) };
                }
                stack.pop();
            }
            Ok(Event::Text(ref t)) if at_path(&stack, path) => {
                buffer.push_str(&text_of(t));
            }
            Ok(Event::CData(ref t)) if at_path(&stack, path) => {
                buffer.push_str(&String::from_utf8_lossy(t));
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Drop every tag from an HTML/XML fragment, keeping the text.
fn strip_markup(fragment: &str) -> String {
    let mut reader = Reader::from_str(fragment);
    reader.config_mut().check_end_names = false;

    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(ref t)) => text.push_str(&text_of(t)),
            Ok(Event::CData(ref t)) => text.push_str(&String::from_utf8_lossy(t)),
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    text
}

fn text_of(t: &quick_xml::events::BytesText) -> String {
    t.unescape()
        .map_or_else(|_| String::from_utf8_lossy(t).into_owned(), |s| s.into_owned())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = "<metadata>\
        <dataIdInfo>\
            <idCitation><resTitle>Road Network</resTitle></idCitation>\
            <idAbs>&lt;p&gt;State-wide &lt;b&gt;road&lt;/b&gt; centrelines.&lt;/p&gt; </idAbs>\
        </dataIdInfo>\
    </metadata>";

    #[test]
    fn abstract_is_markup_stripped_and_trimmed() {
        assert_eq!(
            extract_abstract(METADATA).as_deref(),
            Some("State-wide road centrelines.")
        );
    }

    #[test]
    fn title_is_taken_raw() {
        assert_eq!(extract_title(METADATA).as_deref(), Some("Road Network"));
    }

    #[test]
    fn missing_abstract_path_yields_none_and_title_still_extracts() {
        let xml = "<metadata><dataIdInfo>\
            <idCitation><resTitle>Road Network</resTitle></idCitation>\
        </dataIdInfo></metadata>";
        assert_eq!(extract_abstract(xml), None);
        assert_eq!(extract_title(xml).as_deref(), Some("Road Network"));
    }

    #[test]
    fn nested_elements_elsewhere_do_not_match_the_path() {
        // idAbs must be a direct child of dataIdInfo under the root.
        let xml = "<metadata><other><dataIdInfo><idAbs>nope</idAbs></dataIdInfo></other></metadata>";
        assert_eq!(extract_abstract(xml), None);
    }

    #[test]
    fn whitespace_only_abstract_is_none() {
        let xml = "<metadata><dataIdInfo><idAbs>&lt;p&gt; &lt;/p&gt;</idAbs></dataIdInfo></metadata>";
        assert_eq!(extract_abstract(xml), None);
    }

    #[test]
    fn metadata_report_returns_the_first_field_of_the_first_feature() {
        let report = serde_json::json!({
            "layers": [{
                "name": "SELECT",
                "features": [{ "properties": { "GetLayerMetadata": "<metadata/>" } }]
            }]
        });
        let raw = serde_json::to_vec(&report).expect("serialize");
        assert_eq!(parse_metadata_output(&raw).as_deref(), Some("<metadata/>"));
    }

    #[test]
    fn empty_metadata_field_is_none() {
        let report = serde_json::json!({
            "layers": [{ "features": [{ "properties": { "GetLayerMetadata": "" } }] }]
        });
        let raw = serde_json::to_vec(&report).expect("serialize");
        assert_eq!(parse_metadata_output(&raw), None);
    }

    #[test]
    fn report_without_features_is_none() {
        let report = serde_json::json!({ "layers": [] });
        let raw = serde_json::to_vec(&report).expect("serialize");
        assert_eq!(parse_metadata_output(&raw), None);
    }
}
