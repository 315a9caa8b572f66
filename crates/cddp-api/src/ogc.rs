//! Read-only client for the map-server's OGC service endpoints.
//!
//! Used by the health-check job only: WMS GetMap over a layer's full
//! extent, and WMTS GetCapabilities/GetTile for the most zoomed-in tile
//! of each published layer. A check passes when the response content type
//! is the requested image type; anything else (an XML ServiceException,
//! an HTML error page) is a failure needing no further diagnosis.

use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::LayerExtent;

/// Image media type requested by and expected from every check.
pub const IMAGE_FORMAT: &str = "image/jpeg";

/// One WMTS layer with the parameters for its most zoomed-in tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmtsTileRef {
    /// Full layer identifier (`workspace:name`).
    pub identifier: String,
    pub tile_matrix_set: String,
    pub tile_matrix: String,
    pub max_tile_row: String,
    pub max_tile_col: String,
}

impl WmtsTileRef {
    /// Layer name without the workspace prefix.
    pub fn short_name(&self) -> &str {
        self.identifier
            .rsplit(':')
            .next()
            .unwrap_or(&self.identifier)
    }
}

/// Async client for the WMS and WMTS endpoints (unauthenticated).
pub struct OgcClient {
    http: reqwest::Client,
    base: Url,
}

impl OgcClient {
    pub fn new(base: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base,
        })
    }

    fn service_url(&self, path: &str) -> Result<Url, Error> {
        let root = self.base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{root}/geoserver/{path}"))?)
    }

    /// Request the full extent of a layer via WMS GetMap; returns whether
    /// the response carried the expected image content type.
    pub async fn wms_extent_ok(
        &self,
        workspace: &str,
        layer: &str,
        extent: &LayerExtent,
    ) -> Result<bool, Error> {
        let url = self.service_url(&format!("{workspace}/wms"))?;
        let layers = format!("{workspace}:{layer}");
        let bbox = format!(
            "{},{},{},{}",
            extent.bbox.minx, extent.bbox.miny, extent.bbox.maxx, extent.bbox.maxy
        );
        debug!("GET {url} GetMap {layers}");
        let resp = self
            .http
            .get(url)
            .query(&[
                ("request", "GetMap"),
                ("service", "WMS"),
                ("version", "1.1.0"),
                ("layers", layers.as_str()),
                ("bbox", bbox.as_str()),
                ("format", IMAGE_FORMAT),
                ("width", "256"),
                ("height", "256"),
                ("srs", extent.srs.as_str()),
            ])
            .send()
            .await?;
        Ok(is_image(&resp))
    }

    /// Fetch and parse the WMTS capabilities document.
    pub async fn wmts_layers(&self) -> Result<Vec<WmtsTileRef>, Error> {
        let url = self.service_url("gwc/service/wmts")?;
        debug!("GET {url} GetCapabilities");
        let resp = self
            .http
            .get(url)
            .query(&[("request", "getcapabilities")])
            .send()
            .await?;
        let body = resp.text().await?;
        parse_wmts_capabilities(&body)
    }

    /// Request one tile for a layer; returns whether the response carried
    /// the expected image content type.
    pub async fn wmts_tile_ok(&self, tile: &WmtsTileRef) -> Result<bool, Error> {
        let url = self.service_url("gwc/service/wmts")?;
        debug!("GET {url} GetTile {}", tile.identifier);
        let resp = self
            .http
            .get(url)
            .query(&[
                ("layer", tile.identifier.as_str()),
                ("style", ""),
                ("tilematrixset", tile.tile_matrix_set.as_str()),
                ("Service", "WMTS"),
                ("Request", "GetTile"),
                ("Version", "1.0.0"),
                ("Format", IMAGE_FORMAT),
                ("TileMatrix", tile.tile_matrix.as_str()),
                ("TileRow", tile.max_tile_row.as_str()),
                ("TileCol", tile.max_tile_col.as_str()),
            ])
            .send()
            .await?;
        Ok(is_image(&resp))
    }
}

fn is_image(resp: &reqwest::Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct == IMAGE_FORMAT)
}

// ── Capabilities parsing ────────────────────────────────────────────

/// One `<TileMatrixLimits>` block while it is being collected.
#[derive(Default)]
struct Limits {
    tile_matrix: Option<String>,
    max_tile_row: Option<String>,
    max_tile_col: Option<String>,
}

/// Parse the layers out of a WMTS capabilities document.
///
/// Per layer: the identifier, the first `TileMatrixSetLink`'s matrix set,
/// and the *last* `TileMatrixLimits` of that link — the most zoomed-in
/// level, which exercises the layer's style at full detail. Layers
/// missing any of those parts are skipped.
pub fn parse_wmts_capabilities(xml: &str) -> Result<Vec<WmtsTileRef>, Error> {
    let mut reader = Reader::from_str(xml);
    let mut layers = Vec::new();

    let mut stack: Vec<String> = Vec::new();
    let mut identifier: Option<String> = None;
    let mut tile_matrix_set: Option<String> = None;
    let mut limits: Vec<Limits> = Vec::new();
    let mut current_limits: Option<Limits> = None;
    let mut in_layer = false;
    let mut in_first_link = false;
    let mut link_seen = false;

    loop {
        match reader
            .read_event()
            .map_err(|e| Error::Capabilities(e.to_string()))?
        {
            Event::Start(ref e) => {
                let local = local_name(e.name().as_ref());
                match local.as_str() {
                    "Layer" => {
                        in_layer = true;
                        identifier = None;
                        tile_matrix_set = None;
                        limits.clear();
                        link_seen = false;
                    }
                    "TileMatrixSetLink" if in_layer && !link_seen => in_first_link = true,
                    "TileMatrixLimits" if in_first_link => current_limits = Some(Limits::default()),
                    _ => {}
                }
                stack.push(local);
            }
            Event::End(ref e) => {
                let local = local_name(e.name().as_ref());
                stack.pop();
                match local.as_str() {
                    "Layer" => {
                        in_layer = false;
                        if let (Some(id), Some(tms), Some(last)) =
                            (identifier.take(), tile_matrix_set.take(), limits.pop())
                        {
                            if let (Some(tm), Some(row), Some(col)) =
                                (last.tile_matrix, last.max_tile_row, last.max_tile_col)
                            {
                                layers.push(WmtsTileRef {
                                    identifier: id,
                                    tile_matrix_set: tms,
                                    tile_matrix: tm,
                                    max_tile_row: row,
                                    max_tile_col: col,
                                });
                            }
                        }
                    }
                    "TileMatrixSetLink" if in_first_link => {
                        in_first_link = false;
                        link_seen = true;
                    }
                    "TileMatrixLimits" => {
                        if let Some(l) = current_limits.take() {
                            limits.push(l);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                let Some(element) = stack.last() else {
                    continue;
                };
                let text = t
                    .unescape()
                    .map_err(|e| Error::Capabilities(e.to_string()))?
                    .trim()
                    .to_owned();
                if text.is_empty() {
                    continue;
                }
                match element.as_str() {
                    "Identifier" if in_layer && stack.len() >= 2 => {
                        // Only the layer's own identifier, not nested ones.
                        if identifier.is_none() && stack[stack.len() - 2] == "Layer" {
                            identifier = Some(text);
                        }
                    }
                    "TileMatrixSet" if in_first_link => {
                        if tile_matrix_set.is_none() {
                            tile_matrix_set = Some(text);
                        }
                    }
                    "TileMatrix" => {
                        if let Some(ref mut l) = current_limits {
                            l.tile_matrix = Some(text);
                        }
                    }
                    "MaxTileRow" => {
                        if let Some(ref mut l) = current_limits {
                            l.max_tile_row = Some(text);
                        }
                    }
                    "MaxTileCol" => {
                        if let Some(ref mut l) = current_limits {
                            l.max_tile_col = Some(text);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(layers)
}

fn local_name(qname: &[u8]) -> String {
    let name = qname
        .iter()
        .position(|&b| b == b':')
        .map_or(qname, |i| &qname[i + 1..]);
    String::from_utf8_lossy(name).into_owned()
}

// ── Tests ───────────────────────────────────────────────────────────
