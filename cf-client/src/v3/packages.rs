use super::{Links, Metadata, PageRequest, ToOneRelationship, V3};
use crate::error::{ClientError, Result, missing, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::{ListResponse, request_all_v3};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::FileOptions;

const PACKAGES: &str = "packages";
const UPLOAD_FILE_NAME: &str = "application.zip";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    Bits,
    Docker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageState {
    AwaitingUpload,
    ProcessingUpload,
    Ready,
    Failed,
    Copying,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    #[serde(rename = "type")]
    pub checksum_type: String,
    pub value: Option<String>,
}

/// Type specific package data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Docker image reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRelationships {
    pub app: ToOneRelationship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub guid: String,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    pub state: PackageState,
    #[serde(default)]
    pub data: PackageData,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreatePackageRequest {
    #[serde(rename = "type")]
    pub package_type: PackageType,
    pub relationships: PackageRelationships,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PackageData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl CreatePackageRequest {
    pub fn bits(application_id: impl Into<String>) -> Self {
        Self {
            relationships: PackageRelationships {
                app: ToOneRelationship::new(application_id),
            },
            ..Default::default()
        }
    }

    pub fn docker(application_id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            package_type: PackageType::Docker,
            data: Some(PackageData {
                image: Some(image.into()),
                ..Default::default()
            }),
            ..Self::bits(application_id)
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.relationships.app.guid() {
            Some(guid) => require_non_empty(guid, "application id")?,
            None => return Err(missing("application id")),
        }
        if self.package_type == PackageType::Docker {
            let image = self.data.as_ref().and_then(|data| data.image.as_ref());
            if image.is_none() {
                return Err(missing("docker image"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPackagesRequest {
    pub package_ids: Vec<String>,
    pub application_ids: Vec<String>,
    pub space_ids: Vec<String>,
    pub organization_ids: Vec<String>,
    pub states: Vec<String>,
    pub types: Vec<String>,
    pub page: PageRequest,
}

impl ListPackagesRequest {
    fn params(&self, page: Option<u32>) -> Params {
        let params = Params::new()
            .query_list("guids", &self.package_ids)
            .query_list("app_guids", &self.application_ids)
            .query_list("space_guids", &self.space_ids)
            .query_list("organization_guids", &self.organization_ids)
            .query_list("states", &self.states)
            .query_list("types", &self.types);
        self.page.apply(params, page)
    }
}

/// Staging request, sent as a build of the package
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StagePackageRequest {
    #[serde(skip)]
    pub package_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_memory_in_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_disk_in_mb: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl StagePackageRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.package_id, "package id")
    }
}

#[derive(Serialize)]
struct BuildBody<'a> {
    package: super::RelationshipData,
    #[serde(flatten)]
    request: &'a StagePackageRequest,
}

/// A staging build of a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub guid: String,
    pub state: String,
    pub error: Option<String>,
    pub staging_memory_in_mb: Option<u32>,
    pub staging_disk_in_mb: Option<u32>,
    pub lifecycle: Option<serde_json::Value>,
    pub package: Option<super::RelationshipData>,
    pub droplet: Option<super::RelationshipData>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPackageRequest {
    pub package_id: String,
    /// A zip file, or a directory that is zipped before upload
    pub bits: PathBuf,
}

impl UploadPackageRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.package_id, "package id")?;
        if self.bits.as_os_str().is_empty() {
            return Err(missing("bits"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Packages {
    ops: Operations,
}

impl Packages {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn create(&self, request: &CreatePackageRequest) -> Result<Package> {
        request.validate()?;
        self.ops.post(&[V3, PACKAGES], Params::new(), request).await
    }

    /// Copies the bits of `source_package_id` into a new package of `application_id`
    pub async fn copy(&self, source_package_id: &str, application_id: &str) -> Result<Package> {
        require_non_empty(source_package_id, "source package id")?;
        require_non_empty(application_id, "application id")?;
        let body = serde_json::json!({
            "relationships": PackageRelationships {
                app: ToOneRelationship::new(application_id),
            }
        });
        self.ops
            .post(
                &[V3, PACKAGES],
                Params::new().query("source_guid", source_package_id),
                &body,
            )
            .await
    }

    pub async fn get(&self, package_id: &str) -> Result<Package> {
        require_non_empty(package_id, "package id")?;
        self.ops.get(&[V3, PACKAGES, package_id], Params::new()).await
    }

    pub async fn list(&self, request: &ListPackagesRequest) -> Result<ListResponse<Package>> {
        self.ops.get(&[V3, PACKAGES], request.params(None)).await
    }

    pub async fn list_all(&self, request: &ListPackagesRequest) -> Result<Vec<Package>> {
        request_all_v3(|page| self.ops.get(&[V3, PACKAGES], request.params(Some(page)))).await
    }

    /// Returns the id of the deletion job
    pub async fn delete(&self, package_id: &str) -> Result<Option<String>> {
        require_non_empty(package_id, "package id")?;
        Ok(self
            .ops
            .delete(&[V3, PACKAGES, package_id], Params::new())
            .await?
            .job_id())
    }

    /// Uploads the bits as a multipart `bits` part named `application.zip`
    pub async fn upload(&self, request: &UploadPackageRequest) -> Result<Package> {
        request.validate()?;
        let bits = read_bits(request.bits.clone()).await?;
        tracing::debug!(
            "Uploading {} bytes to package {}",
            bits.len(),
            request.package_id
        );

        let part = reqwest::multipart::Part::bytes(bits)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("application/zip")?;
        let form = reqwest::multipart::Form::new().part("bits", part);

        self.ops
            .post_multipart(
                &[V3, PACKAGES, request.package_id.as_str(), "upload"],
                Params::new(),
                form,
            )
            .await
    }

    pub async fn download(&self, package_id: &str) -> Result<Bytes> {
        require_non_empty(package_id, "package id")?;
        self.ops
            .get_bytes(&[V3, PACKAGES, package_id, "download"], Params::new())
            .await
    }

    /// Stages the package by creating a build for it
    pub async fn stage(&self, request: &StagePackageRequest) -> Result<Build> {
        request.validate()?;
        let body = BuildBody {
            package: super::RelationshipData {
                guid: request.package_id.clone(),
            },
            request,
        };
        self.ops.post(&[V3, "builds"], Params::new(), &body).await
    }
}

async fn read_bits(path: PathBuf) -> Result<Vec<u8>> {
    if tokio::fs::metadata(&path).await?.is_dir() {
        tokio::task::spawn_blocking(move || zip_directory(&path))
            .await
            .map_err(|e| ClientError::Io(std::io::Error::other(e)))?
    } else {
        Ok(tokio::fs::read(&path).await?)
    }
}

/// Zips the contents of `root`, entries relative to it, keeping unix modes
fn zip_directory(root: &Path) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let options = file_options(&entry)?;
        if entry.file_type().is_dir() {
            writer
                .add_directory(format!("{name}/"), options)
                .map_err(std::io::Error::from)?;
        } else {
            writer
                .start_file(name, options)
                .map_err(std::io::Error::from)?;
            std::io::copy(&mut File::open(entry.path())?, &mut writer)?;
        }
    }

    let mut cursor = writer.finish().map_err(std::io::Error::from)?;
    cursor.flush()?;
    Ok(cursor.into_inner())
}

#[cfg(unix)]
fn file_options(entry: &walkdir::DirEntry) -> Result<FileOptions> {
    use std::os::unix::fs::PermissionsExt;
    let mode = entry.metadata().map_err(std::io::Error::from)?.permissions().mode();
    Ok(FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(mode))
}

#[cfg(not(unix))]
fn file_options(_entry: &walkdir::DirEntry) -> Result<FileOptions> {
    Ok(FileOptions::default().compression_method(zip::CompressionMethod::Deflated))
}
