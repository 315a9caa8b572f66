// Integration tests for `GeoserverClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cddp_api::types::StyleOutcome;
use cddp_api::{GeoserverClient, ResourcePatch, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, GeoserverClient) {
    let server = MockServer::start().await;
    let base: Url = server.uri().parse().expect("mock server uri");
    let client = GeoserverClient::new(
        base,
        "admin",
        SecretString::from("geoserver".to_owned()),
        &TransportConfig::default(),
    )
    .expect("client")
    .with_https_upgrade(false);
    (server, client)
}

// ── Feature types ───────────────────────────────────────────────────

#[tokio::test]
async fn test_available_featuretypes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes",
        ))
        .and(query_param("list", "available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": { "string": ["roads", "rivers"] }
        })))
        .mount(&server)
        .await;

    let names = client
        .available_featuretypes("public", "cddp")
        .await
        .expect("list");
    assert_eq!(names, vec!["roads", "rivers"]);
}

#[tokio::test]
async fn test_available_featuretypes_single_entry_collapses() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": { "string": "roads" }
        })))
        .mount(&server)
        .await;

    let names = client
        .available_featuretypes("public", "cddp")
        .await
        .expect("list");
    assert_eq!(names, vec!["roads"]);
}

#[tokio::test]
async fn test_available_featuretypes_empty_list() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": "" })))
        .mount(&server)
        .await;

    let names = client
        .available_featuretypes("public", "cddp")
        .await
        .expect("list");
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_publish_featuretype_posts_name() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes",
        ))
        .and(body_json(json!({ "featureType": { "name": "roads" } })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client
        .publish_featuretype("public", "cddp", "roads")
        .await
        .expect("publish");
}

#[tokio::test]
async fn test_publish_featuretype_failure_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes",
        ))
        .respond_with(ResponseTemplate::new(500).set_body_string("db connection refused"))
        .mount(&server)
        .await;

    let err = client
        .publish_featuretype("public", "cddp", "roads")
        .await
        .expect_err("should fail");
    assert!(matches!(err, cddp_api::Error::Api { status: 500, .. }));
}

// ── Layers ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_published_layers_index_is_lowercased() {
    let (server, client) = setup().await;

    let href = format!(
        "{}/geoserver/rest/workspaces/public/layers/roads.json",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/layers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "layers": { "layer": [ { "name": "Roads", "href": href } ] }
        })))
        .mount(&server)
        .await;

    let index = client.published_layers("public").await.expect("index");
    assert_eq!(index.len(), 1);
    assert!(index.contains_key("roads"));
    assert!(!index.contains_key("Roads"));
}

#[tokio::test]
async fn test_published_layers_empty_workspace() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/layers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "layers": "" })))
        .mount(&server)
        .await;

    let index = client.published_layers("public").await.expect("index");
    assert!(index.is_empty());
}

// ── Resources ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_resource_merges_patch_and_puts_whole_document() {
    let (server, client) = setup().await;

    let layer_href = format!(
        "{}/geoserver/rest/workspaces/public/layers/roads.json",
        server.uri()
    );
    let resource_href = format!(
        "{}/geoserver/rest/workspaces/public/datastores/cddp/featuretypes/roads.json",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/layers/roads.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "layer": { "name": "roads", "resource": { "href": resource_href } }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes/roads.json",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "featureType": { "name": "roads", "title": "old title", "enabled": true }
        })))
        .mount(&server)
        .await;

    // The untouched fields must survive the merge.
    Mock::given(method("PUT"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes/roads.json",
        ))
        .and(body_json(json!({
            "featureType": { "name": "roads", "title": "Road Network", "enabled": true }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let href: Url = layer_href.parse().expect("href");
    client
        .update_resource(&href, &ResourcePatch::title("Road Network"))
        .await
        .expect("update");
}

#[tokio::test]
async fn test_layer_extent_reads_bbox_and_srs() {
    let (server, client) = setup().await;

    let resource_href = format!(
        "{}/geoserver/rest/workspaces/public/datastores/cddp/featuretypes/roads.json",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/layers/roads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "layer": { "resource": { "href": resource_href } }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/geoserver/rest/workspaces/public/datastores/cddp/featuretypes/roads.json",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "featureType": {
                "nativeBoundingBox": { "minx": 112.5, "miny": -35.2, "maxx": 129.0, "maxy": -13.5 },
                "srs": "EPSG:4326"
            }
        })))
        .mount(&server)
        .await;

    let extent = client.layer_extent("public", "roads").await.expect("extent");
    assert_eq!(extent.srs, "EPSG:4326");
    assert!((extent.bbox.minx - 112.5).abs() < f64::EPSILON);
    assert!((extent.bbox.maxy - -13.5).abs() < f64::EPSILON);
}

// ── Styles ──────────────────────────────────────────────────────────

const SLD: &str = r#"<StyledLayerDescriptor xmlns="http://www.opengis.net/sld"/>"#;

#[tokio::test]
async fn test_upsert_style_creates_when_absent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/styles/roads.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/geoserver/rest/workspaces/public/styles"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client
        .upsert_style("public", "roads", SLD)
        .await
        .expect("upsert");
    assert_eq!(outcome, StyleOutcome::Created);
}

#[tokio::test]
async fn test_upsert_style_updates_when_present() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/styles/roads.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "style": { "name": "roads" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/geoserver/rest/workspaces/public/styles/roads"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client
        .upsert_style("public", "roads", SLD)
        .await
        .expect("upsert");
    assert_eq!(outcome, StyleOutcome::Updated);
}

#[tokio::test]
async fn test_upsert_style_reports_unchanged_on_rejection() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/styles/roads.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "style": { "name": "roads" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/geoserver/rest/workspaces/public/styles/roads"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid SLD"))
        .mount(&server)
        .await;

    let outcome = client
        .upsert_style("public", "roads", SLD)
        .await
        .expect("upsert");
    assert_eq!(outcome, StyleOutcome::Unchanged);
}

#[tokio::test]
async fn test_set_default_style_puts_layer_document() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/geoserver/rest/workspaces/public/layers/roads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "layer": { "name": "roads", "type": "VECTOR" }
        })))
        .mount(&server)
        .await;

    let style_href = format!(
        "{}/geoserver/rest/workspaces/public/styles/roads.json",
        server.uri()
    );
    Mock::given(method("PUT"))
        .and(path("/geoserver/rest/workspaces/public/layers/roads"))
        .and(body_json(json!({
            "layer": {
                "name": "roads",
                "type": "VECTOR",
                "defaultStyle": { "name": "roads", "href": style_href }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_default_style("public", "roads")
        .await
        .expect("bind style");
}
