// Hand-crafted async client for the GeoServer REST configuration API.
//
// Base path: /geoserver/rest/
// Auth: HTTP Basic on every request.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::{
    AvailableFeatureTypes, BoundingBox, LayerExtent, LayersResponse, ResourcePatch, StyleOutcome,
};

/// Media type GeoServer expects for SLD style bodies.
const SLD_CONTENT_TYPE: &str = "application/vnd.ogc.se+xml";

/// Async client for the GeoServer REST API.
///
/// Holds the server root URL (scheme + host, no `/geoserver` suffix) and
/// the Basic-auth credentials applied to every request.
pub struct GeoserverClient {
    http: reqwest::Client,
    base: Url,
    username: String,
    password: SecretString,
    /// Upgrade `http://` resource hrefs returned by the server to
    /// `https://` before following them.
    https_upgrade: bool,
}

impl GeoserverClient {
    // ── Constructors ────────────────────────────────────────────────

    pub fn new(
        base: Url,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base,
            username: username.into(),
            password,
            https_upgrade: true,
        })
    }

    /// Disable the `http` -> `https` href upgrade (plain-HTTP test servers).
    pub fn with_https_upgrade(mut self, enabled: bool) -> Self {
        self.https_upgrade = enabled;
        self
    }

    // ── URL builders ────────────────────────────────────────────────

    fn rest_url(&self, path: &str) -> Result<Url, Error> {
        let root = self.base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{root}/geoserver/rest/{path}"))?)
    }

    fn style_href(&self, workspace: &str, style: &str) -> Result<Url, Error> {
        self.rest_url(&format!("workspaces/{workspace}/styles/{style}.json"))
    }

    /// Upgrade a server-reported href to the secure scheme.
    fn upgrade_href(&self, href: &str) -> Result<Url, Error> {
        let mut url: Url = href.parse()?;
        if self.https_upgrade && url.scheme() == "http" {
            // Infallible for http -> https.
            let _ = url.set_scheme("https");
        }
        Ok(url)
    }

    // ── HTTP helpers ────────────────────────────────────────────────

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.username, Some(self.password.expose_secret()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self
            .authed(self.http.get(url))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    async fn put_json(&self, url: Url, body: &Value) -> Result<(), Error> {
        debug!("PUT {url}");
        let resp = self.authed(self.http.put(url)).json(body).send().await?;
        Self::handle_empty(resp).await
    }

    // ── Response handling ───────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::status_error(status, resp).await)
        }
    }

    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, resp).await)
        }
    }

    async fn status_error(status: StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Feature types ───────────────────────────────────────────────

    /// List tables in a datastore that are not yet published as layers.
    pub async fn available_featuretypes(
        &self,
        workspace: &str,
        datastore: &str,
    ) -> Result<Vec<String>, Error> {
        let url = self.rest_url(&format!(
            "workspaces/{workspace}/datastores/{datastore}/featuretypes"
        ))?;
        debug!("GET {url} list=available");
        let resp = self
            .authed(self.http.get(url))
            .header(ACCEPT, "application/json")
            .query(&[("list", "available")])
            .send()
            .await?;
        let body: AvailableFeatureTypes = Self::handle_response(resp).await?;
        Ok(body.into_names())
    }

    /// Publish a datastore table as a layer.
    pub async fn publish_featuretype(
        &self,
        workspace: &str,
        datastore: &str,
        name: &str,
    ) -> Result<(), Error> {
        let url = self.rest_url(&format!(
            "workspaces/{workspace}/datastores/{datastore}/featuretypes"
        ))?;
        debug!("POST {url}");
        let resp = self
            .authed(self.http.post(url))
            .json(&json!({ "featureType": { "name": name } }))
            .send()
            .await?;
        Self::handle_empty(resp).await
    }

    // ── Layers ──────────────────────────────────────────────────────

    /// Snapshot of published layers: lower-cased name -> REST href.
    pub async fn published_layers(
        &self,
        workspace: &str,
    ) -> Result<std::collections::HashMap<String, Url>, Error> {
        let url = self.rest_url(&format!("workspaces/{workspace}/layers"))?;
        let body: LayersResponse = self.get_json(url).await?;

        let mut index = std::collections::HashMap::new();
        for layer in body.into_refs() {
            index.insert(layer.name.to_lowercase(), layer.href.parse()?);
        }
        Ok(index)
    }

    async fn layer_doc(&self, workspace: &str, layer: &str) -> Result<(Url, Value), Error> {
        let url = self.rest_url(&format!("workspaces/{workspace}/layers/{layer}"))?;
        let doc: Value = self.get_json(url.clone()).await?;
        Ok((url, doc))
    }

    /// Extract and upgrade the resource href from a layer document.
    fn resource_href(&self, layer_doc: &Value) -> Result<Url, Error> {
        let href = layer_doc
            .pointer("/layer/resource/href")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Document {
                message: "layer document has no resource href".into(),
            })?;
        self.upgrade_href(href)
    }

    // ── Resources ───────────────────────────────────────────────────

    /// Fetch a layer's resource document via its published href.
    async fn resource_doc(&self, layer_href: &Url) -> Result<(Url, Value), Error> {
        let layer_doc: Value = self.get_json(layer_href.clone()).await?;
        let resource_href = self.resource_href(&layer_doc)?;
        let doc: Value = self.get_json(resource_href.clone()).await?;
        Ok((resource_href, doc))
    }

    /// Merge a partial update into a layer's resource record and PUT it
    /// back whole (the server has no true PATCH for resources).
    pub async fn update_resource(
        &self,
        layer_href: &Url,
        patch: &ResourcePatch,
    ) -> Result<(), Error> {
        let (resource_href, mut doc) = self.resource_doc(layer_href).await?;

        let feature_type = doc
            .get_mut("featureType")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::Document {
                message: "resource document has no featureType object".into(),
            })?;
        if let Some(ref title) = patch.title {
            feature_type.insert("title".into(), json!(title));
        }
        if let Some(ref abstract_text) = patch.r#abstract {
            feature_type.insert("abstract".into(), json!(abstract_text));
        }

        self.put_json(resource_href, &doc).await
    }

    /// Native bounding box and projection of a published layer.
    pub async fn layer_extent(&self, workspace: &str, layer: &str) -> Result<LayerExtent, Error> {
        let (_, layer_doc) = self.layer_doc(workspace, layer).await?;
        let resource_href = self.resource_href(&layer_doc)?;
        let doc: Value = self.get_json(resource_href).await?;

        let bbox_value = doc
            .pointer("/featureType/nativeBoundingBox")
            .cloned()
            .ok_or_else(|| Error::Document {
                message: "resource document has no nativeBoundingBox".into(),
            })?;
        let bbox: BoundingBox =
            serde_json::from_value(bbox_value).map_err(|e| Error::Document {
                message: format!("malformed nativeBoundingBox: {e}"),
            })?;
        let srs = doc
            .pointer("/featureType/srs")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Document {
                message: "resource document has no srs".into(),
            })?
            .to_owned();

        Ok(LayerExtent { bbox, srs })
    }

    // ── Styles ──────────────────────────────────────────────────────

    /// Whether a style of this name already exists in the workspace.
    async fn style_exists(&self, workspace: &str, style: &str) -> Result<bool, Error> {
        let url = self.style_href(workspace, style)?;
        debug!("GET {url}");
        let resp = self
            .authed(self.http.get(url))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if status.is_success() {
            return Ok(true);
        }
        Err(Self::status_error(status, resp).await)
    }

    /// Create or replace a workspace style from an SLD document.
    ///
    /// Create is a POST to the styles collection (201 on success); replace
    /// is a PUT to the named style (200 on success). A non-success status
    /// from either is reported as `Unchanged` rather than raised, so the
    /// caller can skip default-style binding without aborting the layer.
    pub async fn upsert_style(
        &self,
        workspace: &str,
        style: &str,
        sld: &str,
    ) -> Result<StyleOutcome, Error> {
        if self.style_exists(workspace, style).await? {
            let url = self.rest_url(&format!("workspaces/{workspace}/styles/{style}"))?;
            debug!("PUT {url}");
            let resp = self
                .authed(self.http.put(url))
                .header(CONTENT_TYPE, SLD_CONTENT_TYPE)
                .header(ACCEPT, "application/json")
                .body(sld.to_owned())
                .send()
                .await?;
            return Ok(if resp.status() == StatusCode::OK {
                StyleOutcome::Updated
            } else {
                StyleOutcome::Unchanged
            });
        }

        let url = self.rest_url(&format!("workspaces/{workspace}/styles"))?;
        debug!("POST {url}");
        let resp = self
            .authed(self.http.post(url))
            .header(CONTENT_TYPE, SLD_CONTENT_TYPE)
            .header(ACCEPT, "application/json")
            .body(sld.to_owned())
            .send()
            .await?;
        Ok(if resp.status() == StatusCode::CREATED {
            StyleOutcome::Created
        } else {
            StyleOutcome::Unchanged
        })
    }

    /// Bind the style of the same name as the layer's default style.
    pub async fn set_default_style(&self, workspace: &str, layer: &str) -> Result<(), Error> {
        let (layer_url, mut doc) = self.layer_doc(workspace, layer).await?;

        let style_href = self.style_href(workspace, layer)?;
        let layer_obj = doc
            .get_mut("layer")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::Document {
                message: "layer document has no layer object".into(),
            })?;
        layer_obj.insert(
            "defaultStyle".into(),
            json!({ "name": layer, "href": style_href.as_str() }),
        );

        self.put_json(layer_url, &doc).await
    }
}
