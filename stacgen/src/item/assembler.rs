//! Item assembly.
//!
//! Steps run in a fixed order and the first failure aborts the item:
//!
//! ```text
//! Initialized -> AssetsAdded -> RasterMetadataAdded -> ProviderMetadataAdded -> Complete
//! ```
//!
//! `ProviderMetadataAdded` is skipped for jobs without a provider.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::error::AssemblyError;
use super::merge::merge;
use super::model::{Asset, CatalogItem, Geometry};
use crate::asset::{classify, filename_of, is_preview_key, strip_query, MediaType};
use crate::config::{ConfigFile, RasterSettings};
use crate::http::AsyncHttpClient;
use crate::job::JobMessage;
use crate::parser::{MetadataParser, ParseInput, ParserRegistry};
use crate::raster::{raster_media_type, BackendCapabilities, CogValidator, RasterInfo};
use crate::resolver::{is_http, AssetResolver};

/// Assembly progress of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssemblyState {
    Initialized,
    AssetsAdded,
    RasterMetadataAdded,
    ProviderMetadataAdded,
    Complete,
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "initialized",
            Self::AssetsAdded => "assets-added",
            Self::RasterMetadataAdded => "raster-metadata-added",
            Self::ProviderMetadataAdded => "provider-metadata-added",
            Self::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// One item under construction.
struct Assembly<'a> {
    job: &'a JobMessage,
    parser: Option<Arc<dyn MetadataParser>>,
    item: CatalogItem,
    state: AssemblyState,
}

impl Assembly<'_> {
    fn advance(&mut self, next: AssemblyState) {
        debug!(item_id = %self.item.id, from = %self.state, to = %next, "Assembly step");
        self.state = next;
    }

    fn asset_key(&self, reference: &str) -> String {
        let filename = filename_of(reference);
        self.parser
            .as_deref()
            .and_then(|p| p.as_asset_key_mapper())
            .map(|mapper| mapper.asset_key(filename))
            .unwrap_or_else(|| filename.to_string())
    }
}

/// Raster-derived metadata and media type, read off the async runtime.
struct RasterRead {
    info: RasterInfo,
    media_type: MediaType,
}

/// Builds catalog items from job messages.
pub struct ItemAssembler<C> {
    client: C,
    registry: Arc<ParserRegistry>,
    resolver: AssetResolver,
    validator: Option<CogValidator>,
    raster: RasterSettings,
    default_license: String,
}

impl<C: AsyncHttpClient> ItemAssembler<C> {
    /// Creates an assembler.
    ///
    /// # Errors
    ///
    /// [`AssemblyError::Tooling`] when COG checking is enabled and the raster
    /// backend cannot introspect file layout.
    pub fn new(
        client: C,
        registry: Arc<ParserRegistry>,
        resolver: AssetResolver,
        config: &ConfigFile,
    ) -> Result<Self, AssemblyError> {
        let validator = if config.raster.check_cog {
            Some(CogValidator::new(BackendCapabilities::builtin())?)
        } else {
            None
        };

        Ok(Self {
            client,
            registry,
            resolver,
            validator,
            raster: config.raster.clone(),
            default_license: config.catalog.default_license.clone(),
        })
    }

    /// Replaces the COG validator.
    pub fn with_validator(mut self, validator: Option<CogValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Builds the item for one job.
    pub async fn assemble(&self, job: &JobMessage) -> Result<CatalogItem, AssemblyError> {
        job.validate()?;

        let parser = match job.provider.as_deref() {
            Some(provider) => Some(self.registry.get_parser(provider)?),
            None => None,
        };

        let mut assembly = Assembly {
            job,
            parser,
            item: CatalogItem::new(),
            state: AssemblyState::Initialized,
        };
        info!(
            item_id = %assembly.item.id,
            files = job.files.len(),
            provider = ?job.provider,
            "Assembling item"
        );

        self.add_assets(&mut assembly);
        assembly.advance(AssemblyState::AssetsAdded);

        self.add_raster_metadata(&mut assembly).await?;
        assembly.advance(AssemblyState::RasterMetadataAdded);

        if assembly.parser.is_some() {
            self.add_provider_metadata(&mut assembly).await?;
            assembly.advance(AssemblyState::ProviderMetadataAdded);
        }

        assembly.item.reconcile_footprint();
        assembly.advance(AssemblyState::Complete);

        info!(
            item_id = %assembly.item.id,
            assets = assembly.item.assets.len(),
            has_footprint = assembly.item.bbox.is_some(),
            "Item assembled"
        );
        Ok(assembly.item)
    }

    /// Sidecar (non-raster) assets.
    fn add_assets(&self, assembly: &mut Assembly<'_>) {
        let job = assembly.job;
        for reference in &job.files {
            let classification = classify(reference);
            if classification.is_tiled_raster {
                continue;
            }

            let key = assembly.asset_key(reference);
            let mut asset = Asset::new(reference.clone(), classification.media_type.as_str());
            if is_preview_key(&key) {
                asset = asset
                    .with_role("overview")
                    .with_field("rel", Value::String("preview".to_string()));
            } else {
                asset = asset.with_role("metadata");
            }

            if assembly.item.assets.insert(key.clone(), asset).is_some() {
                warn!(key = %key, reference = %reference, "Duplicate asset key, keeping last");
            }
        }
    }

    /// Raster assets plus geometry, projection and band metadata.
    ///
    /// Every raster overwrites the item-level metadata of the previous one,
    /// so the last readable raster determines footprint and properties.
    async fn add_raster_metadata(&self, assembly: &mut Assembly<'_>) -> Result<(), AssemblyError> {
        let job = assembly.job;
        let rasters: Vec<&String> = job
            .files
            .iter()
            .filter(|f| classify(f).is_tiled_raster)
            .collect();
        let mut processed = 0usize;

        for reference in &rasters {
            let path = match self.resolver.resolve_local_path(reference) {
                Ok(path) => path,
                Err(e) => {
                    warn!(reference = %reference, error = %e, "Skipping unresolvable raster");
                    continue;
                }
            };

            let read = match self.read_raster(path.clone()).await {
                Ok(read) => read,
                Err(reason) => {
                    warn!(path = %path.display(), error = %reason, "Skipping unreadable raster");
                    continue;
                }
            };

            self.apply_raster(assembly, reference, read);
            processed += 1;
        }

        if !rasters.is_empty() && processed == 0 {
            return Err(AssemblyError::NoRastersFound {
                references: rasters.len(),
            });
        }
        Ok(())
    }

    async fn read_raster(&self, path: PathBuf) -> Result<RasterRead, String> {
        let validator = self.validator.clone();
        let settings = self.raster.clone();

        tokio::task::spawn_blocking(move || {
            let info = RasterInfo::read(&path).map_err(|e| e.to_string())?;
            let media_type = raster_media_type(&path, validator.as_ref(), &settings);
            Ok(RasterRead { info, media_type })
        })
        .await
        .map_err(|e| format!("raster read task failed: {}", e))?
    }

    fn apply_raster(&self, assembly: &mut Assembly<'_>, reference: &str, read: RasterRead) {
        let RasterRead { info, media_type } = read;
        let item = &mut assembly.item;

        item.properties = info.properties();
        item.properties.insert(
            "license".to_string(),
            Value::String(
                info.copyright
                    .clone()
                    .unwrap_or_else(|| self.default_license.clone()),
            ),
        );
        if let Some(datetime) = info.datetime {
            item.datetime = datetime;
        }
        item.bbox = info.bbox().map(|b| b.to_vec());
        item.geometry = item.bbox.as_deref().and_then(Geometry::from_bbox);
        item.extensions = info.extensions().into_iter().collect();

        let key = assembly.asset_key(reference);
        let mut asset = Asset::new(strip_query(reference), media_type.as_str()).with_role("data");
        asset.extra_fields = info.asset_fields();
        debug!(key = %key, media_type = media_type.as_str(), "Added raster asset");
        if assembly.item.assets.insert(key.clone(), asset).is_some() {
            warn!(key = %key, reference = %reference, "Raster asset replaces an asset with the same key");
        }
    }

    /// Parses provider metadata and merges it over the item.
    async fn add_provider_metadata(&self, assembly: &mut Assembly<'_>) -> Result<(), AssemblyError> {
        let Some(parser) = assembly.parser.clone() else {
            return Ok(());
        };

        let job = assembly.job;
        let metadata = self.job_metadata(job).await?;
        let sidecar = match parser
            .as_sidecar_source()
            .and_then(|source| source.sidecar(&job.files))
        {
            Some(reference) => self.fetch_sidecar(reference).await,
            None => None,
        };

        let fragment = parser.parse(&ParseInput {
            metadata: &metadata,
            files: &job.files,
            sidecar: sidecar.as_deref(),
        })?;
        debug!(parser = parser.name(), keys = fragment.len(), "Parsed provider metadata");

        let item = &assembly.item;
        let mut extensions = item.extensions.clone();
        if let Some(Value::Array(extra)) = fragment.get("stac_extensions") {
            extensions.extend(extra.iter().filter_map(Value::as_str).map(str::to_string));
        }

        let mut merged = merge(&item.to_document(), &Value::Object(fragment));
        // Fragments list the extensions they add, not the full set, so this
        // key is a union rather than an override.
        if let Value::Object(doc) = &mut merged {
            doc.insert(
                "stac_extensions".to_string(),
                Value::Array(extensions.into_iter().map(Value::String).collect()),
            );
        }

        assembly.item = CatalogItem::from_document(merged)?;
        Ok(())
    }

    /// Inline metadata, or the document at `metadata_url`.
    async fn job_metadata(&self, job: &JobMessage) -> Result<Map<String, Value>, AssemblyError> {
        if let Some(metadata) = &job.metadata {
            return Ok(metadata.clone());
        }
        let Some(url) = &job.metadata_url else {
            return Ok(Map::new());
        };

        let body = self
            .client
            .get(url)
            .await
            .map_err(|source| AssemblyError::MetadataFetch {
                url: url.clone(),
                source,
            })?;

        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(AssemblyError::InvalidMetadata {
                url: url.clone(),
                reason: format!("found {}", json_kind(&other)),
            }),
            Err(e) => Err(AssemblyError::InvalidMetadata {
                url: url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Reads a sidecar from its mount, falling back to HTTP.
    async fn fetch_sidecar(&self, reference: &str) -> Option<Vec<u8>> {
        if let Ok(path) = self.resolver.resolve_local_path(reference) {
            match read_local(&path).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => debug!(path = %path.display(), error = %e, "Sidecar not readable locally"),
            }
        }

        if !is_http(reference) {
            warn!(reference = %reference, "Sidecar not found");
            return None;
        }
        match self.client.get(reference).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(reference = %reference, error = %e, "Failed to fetch sidecar");
                None
            }
        }
    }
}

async fn read_local(path: &Path) -> std::io::Result<Vec<u8>> {
    tokio::fs::read(path).await
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::http::HttpError;
    use crate::parser::{ParserError, VIEW_EXTENSION};
    use crate::raster::fixture::TiffFixture;
    use crate::raster::introspect::{PROJECTION_EXTENSION, RASTER_EXTENSION};
    use serde_json::json;
    use tempfile::TempDir;

    fn assembler(client: MockHttpClient) -> ItemAssembler<MockHttpClient> {
        ItemAssembler::new(
            client,
            Arc::new(ParserRegistry::with_builtin()),
            AssetResolver::passthrough(),
            &ConfigFile::default(),
        )
        .unwrap()
    }

    fn write_raster(dir: &TempDir, name: &str, fixture: &TiffFixture) -> String {
        let path = dir.path().join(name);
        fixture.write_to(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_single_raster_item() {
        let temp = TempDir::new().unwrap();
        let raster = write_raster(&temp, "scene.tif", &TiffFixture::georeferenced(64, 32, 32633));

        let item = assembler(MockHttpClient::new())
            .assemble(&JobMessage::with_files([raster.clone()]))
            .await
            .unwrap();

        assert_eq!(item.assets.len(), 1);
        let asset = &item.assets["scene.tif"];
        assert_eq!(asset.href, raster);
        assert_eq!(asset.media_type.as_deref(), Some(MediaType::GeoTiff.as_str()));
        assert!(asset.roles.contains("data"));
        assert!(asset.extra_fields.contains_key("raster:bands"));

        assert_eq!(
            item.bbox,
            Some(vec![500_000.0, 4_599_680.0, 500_640.0, 4_600_000.0])
        );
        assert!(item.geometry.is_some());
        assert_eq!(item.properties["license"], "proprietary");
        assert_eq!(item.properties["proj:epsg"], 32633);
        assert_eq!(item.properties["gsd"], 10.0);
        assert!(item.extensions.contains(PROJECTION_EXTENSION));
        assert!(item.extensions.contains(RASTER_EXTENSION));
    }

    #[tokio::test]
    async fn test_sidecar_only_item() {
        let item = assembler(MockHttpClient::new())
            .assemble(&JobMessage::with_files(["https://x/docs/readme.md"]))
            .await
            .unwrap();

        assert_eq!(item.assets.len(), 1);
        let asset = &item.assets["readme.md"];
        assert_eq!(asset.media_type.as_deref(), Some("text/plain"));
        assert!(asset.roles.contains("metadata"));
        assert!(item.bbox.is_none());
        assert!(item.geometry.is_none());
    }

    #[tokio::test]
    async fn test_preview_asset_role() {
        let item = assembler(MockHttpClient::new())
            .assemble(&JobMessage::with_files(["https://x/rendered_preview.png"]))
            .await
            .unwrap();

        let asset = &item.assets["rendered_preview.png"];
        assert!(asset.roles.contains("overview"));
        assert_eq!(asset.extra_fields["rel"], "preview");

        let mut job = JobMessage::with_files(["https://x/0001/20JUL13-BROWSE.JPG"]);
        job.provider = Some("maxar".to_string());
        job.metadata = Some(Map::new());
        let item = assembler(MockHttpClient::new()).assemble(&job).await.unwrap();

        let asset = &item.assets["rendered_preview"];
        assert!(asset.roles.contains("overview"));
        assert_eq!(asset.extra_fields["rel"], "preview");
    }

    #[tokio::test]
    async fn test_last_raster_wins() {
        let temp = TempDir::new().unwrap();
        let first = write_raster(&temp, "a.tif", &TiffFixture::georeferenced(10, 10, 32633));
        let mut fixture = TiffFixture::georeferenced(10, 10, 32634);
        fixture.copyright = Some("CC-BY-4.0".to_string());
        fixture.datetime = Some("2021:06:01 10:30:00".to_string());
        let second = write_raster(&temp, "b.tif", &fixture);

        let item = assembler(MockHttpClient::new())
            .assemble(&JobMessage::with_files([first, second]))
            .await
            .unwrap();

        assert_eq!(item.assets.len(), 2);
        assert_eq!(item.properties["proj:epsg"], 32634);
        assert_eq!(item.properties["license"], "CC-BY-4.0");
        assert_eq!(item.datetime.to_rfc3339(), "2021-06-01T10:30:00+00:00");
    }

    #[tokio::test]
    async fn test_raster_key_collision_keeps_last() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("a")).unwrap();
        std::fs::create_dir(temp.path().join("b")).unwrap();
        let first = write_raster(&temp, "a/scene.tif", &TiffFixture::georeferenced(10, 10, 32633));
        let second = write_raster(&temp, "b/scene.tif", &TiffFixture::georeferenced(10, 10, 32634));

        let item = assembler(MockHttpClient::new())
            .assemble(&JobMessage::with_files([first, second.clone()]))
            .await
            .unwrap();

        assert_eq!(item.assets.len(), 1);
        assert_eq!(item.assets["scene.tif"].href, second);
        assert!(item.assets["scene.tif"].roles.contains("data"));
    }

    #[tokio::test]
    async fn test_unreadable_rasters_are_skipped() {
        let temp = TempDir::new().unwrap();
        let good = write_raster(&temp, "good.tif", &TiffFixture::georeferenced(10, 10, 32633));
        let missing = temp.path().join("missing.tif").to_string_lossy().into_owned();

        let item = assembler(MockHttpClient::new())
            .assemble(&JobMessage::with_files([missing, good]))
            .await
            .unwrap();
        assert_eq!(item.assets.len(), 1);
        assert!(item.assets.contains_key("good.tif"));
    }

    #[tokio::test]
    async fn test_no_rasters_found() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.tif");
        std::fs::write(&bogus, b"not a tiff").unwrap();

        let err = assembler(MockHttpClient::new())
            .assemble(&JobMessage::with_files([bogus.to_string_lossy().into_owned()]))
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::NoRastersFound { references: 1 }));
    }

    #[tokio::test]
    async fn test_cog_media_type_when_checking() {
        let temp = TempDir::new().unwrap();
        let raster = write_raster(&temp, "cog.tif", &TiffFixture::georeferenced(10, 10, 32633));
        let mut config = ConfigFile::default();
        config.raster.check_cog = true;

        let assembler = ItemAssembler::new(
            MockHttpClient::new(),
            Arc::new(ParserRegistry::with_builtin()),
            AssetResolver::passthrough(),
            &config,
        )
        .unwrap();
        let item = assembler
            .assemble(&JobMessage::with_files([raster]))
            .await
            .unwrap();

        assert_eq!(
            item.assets["cog.tif"].media_type.as_deref(),
            Some(MediaType::CloudOptimizedGeoTiff.as_str())
        );
    }

    #[tokio::test]
    async fn test_example_provider_sets_id() {
        let mut job = JobMessage::with_files(["notes.txt"]);
        job.provider = Some("Example".to_string());
        job.metadata = Some(serde_json::from_value(json!({"ID": "scene-7"})).unwrap());

        let item = assembler(MockHttpClient::new()).assemble(&job).await.unwrap();
        assert_eq!(item.id, "scene-7");
        assert_eq!(item.assets.len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let mut job = JobMessage::with_files(["notes.txt"]);
        job.provider = Some("acme".to_string());
        job.metadata = Some(Map::new());

        let err = assembler(MockHttpClient::new()).assemble(&job).await.unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Parser(ParserError::UnsupportedProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_metadata_url_is_fetched() {
        let client = MockHttpClient::new().with_get("https://x/meta.json", r#"{"ID": "remote"}"#);
        let mut job = JobMessage::with_files(Vec::<String>::new());
        job.provider = Some("example".to_string());
        job.metadata_url = Some("https://x/meta.json".to_string());

        let item = assembler(client).assemble(&job).await.unwrap();
        assert_eq!(item.id, "remote");
    }

    #[tokio::test]
    async fn test_metadata_url_errors() {
        let mut job = JobMessage::with_files(Vec::<String>::new());
        job.provider = Some("example".to_string());
        job.metadata_url = Some("https://x/meta.json".to_string());

        let err = assembler(MockHttpClient::new()).assemble(&job).await.unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::MetadataFetch {
                source: HttpError::Status { status: 404, .. },
                ..
            }
        ));

        let client = MockHttpClient::new().with_get("https://x/meta.json", "[1, 2]");
        let err = assembler(client).assemble(&job).await.unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidMetadata { .. }));
    }

    #[tokio::test]
    async fn test_sidecar_fetched_over_http_and_merged() {
        let temp = TempDir::new().unwrap();
        let raster = write_raster(&temp, "scene.tif", &TiffFixture::georeferenced(10, 10, 32633));
        let sidecar = json!({"properties": {"gsd": 3.0, "cloud_cover": 0.1}});
        let client = MockHttpClient::new()
            .with_get("https://x/scene_metadata.json", sidecar.to_string());

        let mut job = JobMessage::with_files([raster, "https://x/scene_metadata.json".to_string()]);
        job.provider = Some("planet".to_string());
        job.metadata = Some(Map::new());

        let item = assembler(client).assemble(&job).await.unwrap();

        assert_eq!(item.properties["gsd"], 3.0);
        assert_eq!(item.properties["eo:cloud_cover"], 0.1);
        assert_eq!(item.properties["proj:epsg"], 32633);
        assert!(item.extensions.contains(VIEW_EXTENSION));
        assert!(item.extensions.contains(PROJECTION_EXTENSION));
        assert!(item.assets.contains_key("metadata"));
        assert!(item.bbox.is_some());
    }

    #[tokio::test]
    async fn test_local_sidecar_is_preferred() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("DeliveryMetadata.xml");
        std::fs::write(
            &path,
            r#"<DeliveryMetadata xmlns="http://xsd.digitalglobe.com/xsd/dm">
                 <product><cloudCover>0.25</cloudCover></product>
               </DeliveryMetadata>"#,
        )
        .unwrap();
        let client = MockHttpClient::new();

        let mut job = JobMessage::with_files([path.to_string_lossy().into_owned()]);
        job.provider = Some("maxar".to_string());
        job.metadata = Some(Map::new());

        let assembler = assembler(client);
        let item = assembler.assemble(&job).await.unwrap();
        assert_eq!(item.properties["eo:cloud_cover"], 0.25);
        assert_eq!(assembler.client().count("GET"), 0);
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(AssemblyState::Initialized < AssemblyState::AssetsAdded);
        assert!(AssemblyState::ProviderMetadataAdded < AssemblyState::Complete);
        assert_eq!(AssemblyState::RasterMetadataAdded.to_string(), "raster-metadata-added");
    }
}
