use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use mime_guess::mime::{self, Mime};
use std::path::{Path, PathBuf};
use tokio::fs;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info, warn};

use crate::bridge::{self, HelperKind, Helpers};
use crate::error::{ExploreError, Result};
use crate::listing::{EntryKind, PathQuery};
use crate::paths;
use crate::SharedState;

// -------------------------------------------
// Classification
// -------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Image,
    Audio,
    Video,
    Pdf,
    Document,
    CustomStream,
    DesktopOpen,
    Text,
}

/// How a category reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    InlineBinary,
    InlineText,
    /// Helper output is returned as the body.
    Convert(HelperKind),
    /// Helper runs detached; the client only gets an acknowledgement.
    Launch(HelperKind),
}

/// Checked top to bottom, so an extension listed twice belongs to the
/// first category naming it.
const CATEGORIES: &[(Category, Delivery, &[&str])] = &[
    (
        Category::Image,
        Delivery::InlineBinary,
        &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"],
    ),
    (
        Category::Audio,
        Delivery::InlineBinary,
        &["mp3", "wav", "ogg", "aac", "flac", "m4a"],
    ),
    (
        Category::Video,
        Delivery::InlineBinary,
        &["mp4", "webm", "ogg", "avi", "mkv"],
    ),
    (Category::Pdf, Delivery::InlineBinary, &["pdf"]),
    (
        Category::Document,
        Delivery::Convert(HelperKind::Converter),
        &["doc", "docx"],
    ),
    (
        Category::CustomStream,
        Delivery::Launch(HelperKind::Streamer),
        &["dex", "sxi", "sxa", "sxv"],
    ),
    (
        Category::DesktopOpen,
        Delivery::Launch(HelperKind::Opener),
        &["ppt", "pptx", "xls", "xlsx", "tgz", "tar", "zip", "gz"],
    ),
];

pub fn classify(path: &Path) -> (Category, Delivery) {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    CATEGORIES
        .iter()
        .find(|(_, _, exts)| exts.contains(&ext.as_str()))
        .map(|(category, delivery, _)| (*category, *delivery))
        .unwrap_or((Category::Text, Delivery::InlineText))
}

fn binary_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

/// Text types keep their guessed type; everything else is plain text.
fn text_content_type(path: &Path) -> String {
    match mime_guess::from_path(path).first() {
        Some(m) if m.type_() == mime::TEXT => format!("{}; charset=utf-8", m.essence_str()),
        _ => "text/plain; charset=utf-8".to_string(),
    }
}

// -------------------------------------------
// Dispatch
// -------------------------------------------

#[derive(Debug)]
pub enum Payload {
    /// Streamed from disk; ranges and conditional requests are honoured.
    File(PathBuf),
    Text(String),
    Acknowledged,
}

#[derive(Debug)]
pub struct Served {
    pub category: Category,
    pub content_type: String,
    pub payload: Payload,
}

impl Served {
    /// `request` is only consulted for file payloads (`Range`, `If-*`).
    pub async fn into_response(self, ack_status: StatusCode, request: Request) -> Response {
        let mime = self
            .content_type
            .parse::<Mime>()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let ct = [(header::CONTENT_TYPE, self.content_type)];

        match self.payload {
            Payload::File(path) => match ServeFile::new_with_mime(&path, &mime)
                .oneshot(request)
                .await
            {
                Ok(resp) => resp.map(Body::new),
                Err(never) => match never {},
            },
            Payload::Text(text) => (StatusCode::OK, ct, text).into_response(),
            Payload::Acknowledged => (ack_status, ct, "Streaming...").into_response(),
        }
    }
}

/// Reads, converts or hands off the file at `requested`.
pub async fn serve(root: &Path, requested: &str, helpers: &Helpers) -> Result<Served> {
    let path = paths::resolve(root, requested)?;
    let stat = paths::resolve_symlink(&path).await?;
    if stat.kind == EntryKind::Directory || !stat.is_file {
        return Err(ExploreError::UnsupportedMedia(paths::client_form(requested)?));
    }

    let (category, delivery) = classify(&path);
    let read_err = |e| ExploreError::from_io(requested, e);

    let served = match delivery {
        Delivery::InlineBinary => Served {
            category,
            content_type: binary_content_type(&path),
            payload: Payload::File(stat.real_path.clone()),
        },
        Delivery::InlineText => {
            let raw = fs::read(&stat.real_path).await.map_err(read_err)?;
            Served {
                category,
                content_type: text_content_type(&path),
                payload: Payload::Text(String::from_utf8_lossy(&raw).into_owned()),
            }
        }
        Delivery::Convert(kind) => {
            let html = bridge::run(helpers.template(kind), &stat.real_path).await?;
            Served {
                category,
                content_type: "text/html; charset=utf-8".to_string(),
                payload: Payload::Text(html),
            }
        }
        Delivery::Launch(kind) => {
            let template = helpers.template(kind).clone();
            info!("launching `{}` for {}", template, stat.real_path.display());
            bridge::launch_detached(template, stat.real_path.clone());
            Served {
                category,
                content_type: "text/plain; charset=utf-8".to_string(),
                payload: Payload::Acknowledged,
            }
        }
    };

    Ok(served)
}

// -------------------------------------------
// Handler
// -------------------------------------------

/// GET /api/file?path=
pub async fn get_file(
    State(state): State<SharedState>,
    Query(q): Query<PathQuery>,
    request: Request,
) -> Response {
    let requested = q.path.unwrap_or_default();
    match serve(&state.root, &requested, &state.helpers).await {
        Ok(served) => {
            debug!("serving {:?} as {:?}", requested, served.category);
            served.into_response(state.ack_status, request).await
        }
        Err(e) => {
            warn!("serving {:?} failed: {}", requested, e);
            e.into_text_response()
        }
    }
}
