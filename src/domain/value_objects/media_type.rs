use serde::{Deserialize, Serialize};

pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_V1: &str =
    "application/vnd.docker.distribution.manifest.v1+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_V1_SIGNED: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

pub const MEDIA_TYPE_DOCKER_CONFIG: &str = "application/vnd.docker.container.image.v1+json";
pub const MEDIA_TYPE_OCI_CONFIG: &str = "application/vnd.oci.image.config.v1+json";

pub const MEDIA_TYPE_DOCKER_LAYER: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";
pub const MEDIA_TYPE_DOCKER_FOREIGN_LAYER: &str =
    "application/vnd.docker.image.rootfs.foreign.diff.tar.gzip";

const MANIFEST_MEDIA_TYPES: &[&str] = &[
    MEDIA_TYPE_DOCKER_MANIFEST,
    MEDIA_TYPE_DOCKER_MANIFEST_LIST,
    MEDIA_TYPE_DOCKER_MANIFEST_V1,
    MEDIA_TYPE_DOCKER_MANIFEST_V1_SIGNED,
    MEDIA_TYPE_OCI_MANIFEST,
    MEDIA_TYPE_OCI_INDEX,
];

const FOREIGN_LAYER_MEDIA_TYPES: &[&str] = &[
    MEDIA_TYPE_DOCKER_FOREIGN_LAYER,
    "application/vnd.oci.image.layer.nondistributable.v1.tar",
    "application/vnd.oci.image.layer.nondistributable.v1.tar+gzip",
    "application/vnd.oci.image.layer.nondistributable.v1.tar+zstd",
];

/// Semantic category of a blob derived from its content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    Manifest,
    Config,
    Layer,
}

impl BlobKind {
    /// Classify a content type. Unknown types are treated as layers.
    pub fn classify(content_type: &str) -> Self {
        let media_type = essence(content_type);
        if MANIFEST_MEDIA_TYPES.contains(&media_type) {
            BlobKind::Manifest
        } else if media_type == MEDIA_TYPE_DOCKER_CONFIG
            || media_type == MEDIA_TYPE_OCI_CONFIG
            || media_type.ends_with(".config.v1+json")
        {
            BlobKind::Config
        } else {
            BlobKind::Layer
        }
    }
}

impl std::fmt::Display for BlobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobKind::Manifest => write!(f, "manifest"),
            BlobKind::Config => write!(f, "config"),
            BlobKind::Layer => write!(f, "layer"),
        }
    }
}

/// Foreign layers live outside the registry storage
pub fn is_foreign_layer(content_type: &str) -> bool {
    FOREIGN_LAYER_MEDIA_TYPES.contains(&essence(content_type))
}

/// Strip media type parameters (`; charset=...`)
fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}
