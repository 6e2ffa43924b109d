//! Thumbnail pipeline: conditional-request check, fetch, decode, downscale,
//! re-encode. Every failure degrades to a bundled placeholder served with the
//! same cache headers, so a broken image never breaks a directory view.

use crate::{
    config::AppConfig,
    services::store_client::{StoreClient, StoreError},
};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use image::{ImageError, ImageReader, Limits, codecs::jpeg::JpegEncoder};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

/// Neither side of a thumbnail exceeds this many pixels.
pub const THUMB_MAX_DIM: u32 = 320;
pub const JPEG_QUALITY: u8 = 80;
pub const THUMB_MIME: &str = "image/jpeg";
pub const PLACEHOLDER_MIME: &str = "image/svg+xml";

const MAX_SOURCE_BYTES: u64 = 64 * 1024 * 1024;
const MAX_SOURCE_DIM: u32 = 16_384;
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

static PLACEHOLDER: &[u8] = include_bytes!("../../assets/thumb_placeholder.svg");

/// Why a request ended up with the placeholder.
#[derive(Debug, Error)]
pub enum ThumbnailDegraded {
    #[error("fetch failed: {0}")]
    Fetch(#[from] StoreError),
    #[error("reading source failed: {0}")]
    Read(#[source] object_store::Error),
    #[error("source is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("decode failed: {0}")]
    Decode(#[from] ImageError),
    #[error("thumbnail worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Stage at which a thumbnail request finished.
#[derive(Debug)]
pub enum ThumbnailOutcome {
    /// The client's validator matched; the store was not contacted.
    Hit,
    /// The object could not be fetched.
    FetchFailed(ThumbnailDegraded),
    /// The bytes were fetched but are not a usable image.
    DecodeFailed(ThumbnailDegraded),
    /// A JPEG thumbnail was produced.
    Rendered(Bytes),
}

/// What the caller observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailReply {
    CachedUnchanged,
    Image { bytes: Bytes, mime: &'static str },
    Placeholder { bytes: Bytes, mime: &'static str },
}

/// A reply plus the cache headers every variant carries.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub etag: String,
    pub cache_control: String,
    pub reply: ThumbnailReply,
}

impl ThumbnailOutcome {
    pub fn into_reply(self) -> ThumbnailReply {
        match self {
            ThumbnailOutcome::Hit => ThumbnailReply::CachedUnchanged,
            ThumbnailOutcome::Rendered(bytes) => ThumbnailReply::Image {
                bytes,
                mime: THUMB_MIME,
            },
            ThumbnailOutcome::FetchFailed(_) | ThumbnailOutcome::DecodeFailed(_) => {
                ThumbnailReply::Placeholder {
                    bytes: Bytes::from_static(PLACEHOLDER),
                    mime: PLACEHOLDER_MIME,
                }
            }
        }
    }
}

/// Weak entity tag derived from the key only.
///
/// It does not change when the object does; a replaced image keeps its old
/// thumbnail until `max-age` runs out.
pub fn validator(key: &str) -> String {
    format!("W/\"{:x}\"", md5::compute(key.as_bytes()))
}

/// Weak comparison of an `If-None-Match` header against `validator`.
pub fn if_none_match_hits(header: &str, validator: &str) -> bool {
    let opaque = |tag: &str| tag.strip_prefix("W/").unwrap_or(tag).to_owned();
    let ours = opaque(validator);
    header
        .split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || opaque(tag) == ours)
}

/// Produce the thumbnail response for `key`. Never fails.
pub async fn thumbnail(
    store: &StoreClient,
    config: &AppConfig,
    bucket: &str,
    key: &str,
    if_none_match: Option<&str>,
) -> Thumbnail {
    let etag = validator(key);
    let outcome = generate(store, bucket, key, &etag, if_none_match).await;

    match &outcome {
        ThumbnailOutcome::Hit => debug!(key, "thumbnail validator matched"),
        ThumbnailOutcome::Rendered(bytes) => debug!(key, size = bytes.len(), "thumbnail rendered"),
        ThumbnailOutcome::FetchFailed(err) => {
            warn!(key, error = %err, "thumbnail source unavailable, serving placeholder")
        }
        ThumbnailOutcome::DecodeFailed(err) => {
            warn!(key, error = %err, "thumbnail decode failed, serving placeholder")
        }
    }

    Thumbnail {
        etag,
        cache_control: format!("public, max-age={}", config.thumb_max_age.as_secs()),
        reply: outcome.into_reply(),
    }
}

/// Run the pipeline and report the stage it ended at.
pub async fn generate(
    store: &StoreClient,
    bucket: &str,
    key: &str,
    etag: &str,
    if_none_match: Option<&str>,
) -> ThumbnailOutcome {
    if if_none_match.is_some_and(|header| if_none_match_hits(header, etag)) {
        return ThumbnailOutcome::Hit;
    }

    let source = match fetch_source(store, bucket, key, MAX_SOURCE_BYTES).await {
        Ok(source) => source,
        Err(err) => return degraded(err),
    };

    match tokio::task::spawn_blocking(move || render(&source)).await {
        Ok(Ok(jpeg)) => ThumbnailOutcome::Rendered(Bytes::from(jpeg)),
        Ok(Err(err)) => degraded(err.into()),
        Err(err) => degraded(err.into()),
    }
}

/// Store-side failures count as fetch failures; everything about the bytes
/// themselves counts as a decode failure.
fn degraded(err: ThumbnailDegraded) -> ThumbnailOutcome {
    match err {
        ThumbnailDegraded::Fetch(_) | ThumbnailDegraded::Read(_) => ThumbnailOutcome::FetchFailed(err),
        _ => ThumbnailOutcome::DecodeFailed(err),
    }
}

/// Read the whole object, refusing anything over `limit` bytes.
async fn fetch_source(
    store: &StoreClient,
    bucket: &str,
    key: &str,
    limit: u64,
) -> Result<Bytes, ThumbnailDegraded> {
    let object = store.get(bucket, key).await?;
    let too_large = |size| ThumbnailDegraded::TooLarge { size, limit };
    if object.info.size > limit {
        return Err(too_large(object.info.size));
    }

    let mut buf = BytesMut::with_capacity(object.info.size as usize);
    let mut stream = object.stream;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ThumbnailDegraded::Read)?;
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(too_large((buf.len() + chunk.len()) as u64));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIM);
    limits.max_image_height = Some(MAX_SOURCE_DIM);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decode, flatten to RGB, shrink to fit `THUMB_MAX_DIM` and encode as JPEG.
fn render(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    reader.limits(decode_limits());
    let img = reader.decode()?;

    let img = if img.width() > THUMB_MAX_DIM || img.height() > THUMB_MAX_DIM {
        img.thumbnail(THUMB_MAX_DIM, THUMB_MAX_DIM)
    } else {
        img
    };
    let rgb = img.to_rgb8();

    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::fixtures::png;
    use super::*;
    use crate::{config::test_config, services::store_client::testing::*};
    use image::GenericImageView;

    fn dims(jpeg: &[u8]) -> (u32, u32) {
        image::load_from_memory(jpeg).unwrap().dimensions()
    }

    #[test]
    fn validator_is_deterministic_weak_md5_of_key() {
        assert_eq!(validator("a.png"), validator("a.png"));
        assert_ne!(validator("a.png"), validator("b.png"));
        assert_eq!(
            validator(""),
            "W/\"d41d8cd98f00b204e9800998ecf8427e\""
        );
    }

    #[test]
    fn if_none_match_uses_weak_comparison() {
        let tag = validator("a.png");
        let strong = tag.trim_start_matches("W/").to_string();
        assert!(if_none_match_hits(&tag, &tag));
        assert!(if_none_match_hits(&strong, &tag));
        assert!(if_none_match_hits(&format!("\"other\", {tag}"), &tag));
        assert!(if_none_match_hits("*", &tag));
        assert!(!if_none_match_hits("W/\"other\"", &tag));
    }

    #[test]
    fn render_downscales_preserving_aspect_ratio() {
        let jpeg = render(&png(640, 480)).unwrap();
        assert_eq!(dims(&jpeg), (320, 240));

        let tall = render(&png(100, 1000)).unwrap();
        assert_eq!(dims(&tall), (32, 320));
    }

    #[test]
    fn render_never_upscales() {
        let jpeg = render(&png(100, 50)).unwrap();
        assert_eq!(dims(&jpeg), (100, 50));
    }

    #[test]
    fn render_rejects_garbage_and_oversized_dimensions() {
        assert!(render(b"definitely not an image").is_err());
        assert!(render(&png(MAX_SOURCE_DIM + 1, 1)).is_err());
    }

    #[tokio::test]
    async fn matching_validator_short_circuits_before_store() {
        // The object does not exist: any store access would degrade instead.
        let client = client(memory_store(), false);
        let etag = validator("gone.png");
        let outcome = generate(&client, BUCKET, "gone.png", &etag, Some(etag.as_str())).await;
        assert!(matches!(outcome, ThumbnailOutcome::Hit));
    }

    #[tokio::test]
    async fn each_failure_stage_is_distinguishable() {
        let store = memory_store();
        put(&store, "corrupt.jpg", "not a jpeg").await;
        put(&store, "photo.png", png(800, 600)).await;
        let client = client(store, false);
        let etag = validator("x");

        let missing = generate(&client, BUCKET, "missing.jpg", &etag, None).await;
        assert!(matches!(
            missing,
            ThumbnailOutcome::FetchFailed(ThumbnailDegraded::Fetch(_))
        ));

        let corrupt = generate(&client, BUCKET, "corrupt.jpg", &etag, None).await;
        assert!(matches!(
            corrupt,
            ThumbnailOutcome::DecodeFailed(ThumbnailDegraded::Decode(_))
        ));

        let stale = generate(&client, BUCKET, "photo.png", &etag, Some("W/\"stale\"")).await;
        let ThumbnailOutcome::Rendered(jpeg) = stale else {
            panic!("expected a rendered thumbnail, got {stale:?}");
        };
        assert_eq!(dims(&jpeg), (320, 240));
    }

    #[tokio::test]
    async fn oversized_source_is_refused_before_decoding() {
        let store = memory_store();
        put(&store, "huge.png", png(40, 40)).await;
        let client = client(store, false);

        let err = fetch_source(&client, BUCKET, "huge.png", 16).await.unwrap_err();
        let ThumbnailDegraded::TooLarge { size, limit } = err else {
            panic!("expected TooLarge, got {err:?}");
        };
        assert!(size > 16);
        assert_eq!(limit, 16);
        assert!(matches!(
            degraded(ThumbnailDegraded::TooLarge { size, limit }),
            ThumbnailOutcome::DecodeFailed(ThumbnailDegraded::TooLarge { .. })
        ));

        let fits = fetch_source(&client, BUCKET, "huge.png", MAX_SOURCE_BYTES).await.unwrap();
        assert_eq!(fits.len() as u64, size);
    }

    #[tokio::test]
    async fn placeholder_carries_same_cache_headers_as_image() {
        let store = memory_store();
        put(&store, "photo.png", png(64, 64)).await;
        let client = client(store, false);
        let cfg = test_config(BUCKET);

        let real = thumbnail(&client, &cfg, BUCKET, "photo.png", None).await;
        let fallback = thumbnail(&client, &cfg, BUCKET, "missing.png", None).await;

        assert!(matches!(real.reply, ThumbnailReply::Image { mime: THUMB_MIME, .. }));
        assert_eq!(
            fallback.reply,
            ThumbnailReply::Placeholder {
                bytes: Bytes::from_static(PLACEHOLDER),
                mime: PLACEHOLDER_MIME,
            }
        );
        assert_eq!(real.cache_control, "public, max-age=3600");
        assert_eq!(real.cache_control, fallback.cache_control);
        assert_eq!(real.etag, validator("photo.png"));
        assert_eq!(fallback.etag, validator("missing.png"));
    }
}
